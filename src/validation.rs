use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use tracing::{debug, trace};
use validator::Validate;

use crate::config::RegistrationProfile;
use crate::handlers::register::RegistrationForm;
use model::entities::user;

pub const NAME_REQUIRED_MESSAGE: &str = "Please tell us your name.";
pub const PRONTUARIO_FORMAT_MESSAGE: &str =
    "the identifier must have 3 letters followed by 7 numbers.";
pub const PRONTUARIO_TAKEN_MESSAGE: &str = "this identifier is already registered.";

/// An error attached to a single form field, rendered inline next to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

/// The identifier is exactly 3 ASCII letters followed by 7 ASCII digits.
pub fn is_valid_prontuario(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 10 {
        return false;
    }
    bytes[..3].iter().all(|b| b.is_ascii_alphabetic())
        && bytes[3..].iter().all(|b| b.is_ascii_digit())
}

/// Check a submission against the active profile's field rules.
///
/// Returns the field errors to render; an empty list means the submission may
/// proceed to the duplicate lookup. No database access happens here.
pub fn validate_submission(
    profile: RegistrationProfile,
    form: &RegistrationForm,
) -> Vec<FieldError> {
    trace!("Validating submission for profile {:?}", profile);
    let mut errors = Vec::new();

    if form.validate().is_err() || form.name.trim().is_empty() {
        errors.push(FieldError::new("name", NAME_REQUIRED_MESSAGE));
    }

    if profile.collects_prontuario() {
        let value = form.prontuario.as_deref().map(str::trim).unwrap_or_default();
        if !is_valid_prontuario(value) {
            errors.push(FieldError::new("prontuario", PRONTUARIO_FORMAT_MESSAGE));
        }
    }

    if !errors.is_empty() {
        debug!("Submission rejected with {} field error(s)", errors.len());
    }
    errors
}

/// Pre-insert duplicate lookup by identifier.
pub async fn find_by_prontuario(
    db: &DatabaseConnection,
    value: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Prontuario.eq(value))
        .one(db)
        .await
}

/// Pre-insert duplicate lookup by username.
pub async fn find_by_username(
    db: &DatabaseConnection,
    value: &str,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::Username.eq(value))
        .one(db)
        .await
}
