//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the registration application here:
//! a `roles` table and a `users` table linked by a nullable foreign key.

pub mod role;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::role::Entity as Role;
    pub use super::user::Entity as User;
}
