use anyhow::Result;
use moka::future::Cache;
use sea_orm::Database;
use std::time::Duration;
use tracing::{info, warn};

use crate::notify::{MailSettings, Mailer};
use crate::schemas::AppState;

/// Which unique key drives the duplicate check for a profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniqueKey {
    Username,
    Prontuario,
}

/// Which fields the registration form collects.
///
/// The four historical variants of this application differed only in the
/// collected fields; a single handler serves all of them based on this
/// setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationProfile {
    /// Name field only.
    NameOnly,
    /// Name plus a role choice.
    NameRole,
    /// Name, role choice, and an optional extra notification recipient.
    NameRoleNotify,
    /// Name plus a validated "prontuario" identifier and an optional extra
    /// notification recipient. The identifier is the unique key.
    Prontuario,
}

impl RegistrationProfile {
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::NameOnly),
            "name-role" => Some(Self::NameRole),
            "name-role-notify" => Some(Self::NameRoleNotify),
            "prontuario" => Some(Self::Prontuario),
            _ => None,
        }
    }

    pub fn collects_role(self) -> bool {
        matches!(self, Self::NameRole | Self::NameRoleNotify)
    }

    pub fn collects_prontuario(self) -> bool {
        matches!(self, Self::Prontuario)
    }

    pub fn collects_copy_to(self) -> bool {
        matches!(self, Self::NameRoleNotify | Self::Prontuario)
    }

    pub fn unique_key(self) -> UniqueKey {
        if self.collects_prontuario() {
            UniqueKey::Prontuario
        } else {
            UniqueKey::Username
        }
    }
}

/// Application configuration, read once at startup and carried in `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Key used to sign session cookies.
    pub secret_key: String,
    pub database_url: String,
    pub bind_address: String,
    pub profile: RegistrationProfile,
    pub mail: MailSettings,
}

impl AppConfig {
    /// Load configuration from the environment (and a `.env` file if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let secret_key = std::env::var("SECRET_KEY").unwrap_or_else(|_| {
            warn!("SECRET_KEY not set, using a development default");
            "dev-secret-key".to_string()
        });
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://cadastro.db?mode=rwc".to_string());
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let profile = match std::env::var("REGISTRATION_PROFILE") {
            Ok(value) => RegistrationProfile::from_env_value(&value).unwrap_or_else(|| {
                warn!(
                    "Unknown REGISTRATION_PROFILE '{}', falling back to 'prontuario'",
                    value
                );
                RegistrationProfile::Prontuario
            }),
            Err(_) => RegistrationProfile::Prontuario,
        };

        let mail = MailSettings {
            api_key: std::env::var("MAILGUN_API_KEY").ok(),
            domain: std::env::var("MAILGUN_DOMAIN").ok(),
            api_base: std::env::var("MAILGUN_API_BASE")
                .unwrap_or_else(|_| "https://api.mailgun.net/v3".to_string()),
            sender: std::env::var("MAIL_SENDER")
                .unwrap_or_else(|_| "Cadastro <noreply@localhost>".to_string()),
            admin: std::env::var("ADMIN_EMAIL").ok(),
        };

        Self {
            secret_key,
            database_url,
            bind_address,
            profile,
            mail,
        }
    }
}

/// Initialize application configuration and state from the environment.
pub async fn initialize_app_state() -> Result<AppState> {
    let config = AppConfig::from_env();
    initialize_app_state_with_config(config).await
}

/// Build application state from an already-loaded configuration.
pub async fn initialize_app_state_with_config(config: AppConfig) -> Result<AppState> {
    // Connect to database
    info!("Connecting to database: {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;

    // Session payloads are short-lived by design; the TTL is the session
    // lifetime.
    let sessions = Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(30 * 60))
        .build();

    let mailer = Mailer::new(config.mail.clone());

    Ok(AppState {
        db,
        sessions,
        mailer,
        config,
    })
}
