use chrono::Utc;
use tracing::{error, info, warn};

/// Outcome of a notification dispatch attempt.
///
/// Delivery is advisory: callers observe the outcome but never fail a
/// registration because of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The provider accepted the message.
    Sent,
    /// Delivery is not configured (or there is nobody to notify); no network
    /// call was made.
    Skipped,
    /// The attempt was made and failed; the error has been logged.
    Failed,
}

/// Provider settings for outbound mail, all environment-sourced.
#[derive(Clone, Debug)]
pub struct MailSettings {
    pub api_key: Option<String>,
    pub domain: Option<String>,
    /// Provider API root; overridable so tests can point at a local listener.
    pub api_base: String,
    pub sender: String,
    pub admin: Option<String>,
}

const SUBJECT_PREFIX: &str = "[Cadastro]";

/// Fire-and-forget mail dispatcher backed by the provider's HTTP API.
#[derive(Clone, Debug)]
pub struct Mailer {
    client: reqwest::Client,
    settings: MailSettings,
}

impl Mailer {
    pub fn new(settings: MailSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    /// The configured administrator address, if any.
    pub fn admin_recipient(&self) -> Option<String> {
        self.settings.admin.clone()
    }

    /// Attempt one delivery to `to`. At-most-once, no retry, no queueing.
    ///
    /// Never returns an error: every failure mode is logged and collapsed
    /// into the returned outcome so the registration path stays unaffected.
    pub async fn send(&self, to: &[String], subject: &str, body: &str) -> DispatchOutcome {
        let (api_key, domain) = match (&self.settings.api_key, &self.settings.domain) {
            (Some(api_key), Some(domain)) => (api_key, domain),
            _ => {
                warn!("Mail delivery not configured (API key or domain missing), skipping notification");
                return DispatchOutcome::Skipped;
            }
        };

        if to.is_empty() {
            warn!("No notification recipients, skipping notification");
            return DispatchOutcome::Skipped;
        }

        let url = format!(
            "{}/{}/messages",
            self.settings.api_base.trim_end_matches('/'),
            domain
        );
        let subject = format!("{} {}", SUBJECT_PREFIX, subject);
        let to_line = to.join(", ");

        info!("Sending notification '{}' to {}", subject, to_line);

        let result = self
            .client
            .post(&url)
            .basic_auth("api", Some(api_key))
            .form(&[
                ("from", self.settings.sender.as_str()),
                ("to", to_line.as_str()),
                ("subject", subject.as_str()),
                ("text", body),
            ])
            .send()
            .await;

        match result {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                info!("Notification delivered at {}", Utc::now());
                DispatchOutcome::Sent
            }
            Ok(response) => {
                error!(
                    "Notification rejected by provider with status {}",
                    response.status()
                );
                DispatchOutcome::Failed
            }
            Err(e) => {
                error!("Notification delivery failed: {}", e);
                DispatchOutcome::Failed
            }
        }
    }
}
