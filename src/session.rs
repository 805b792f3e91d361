use axum::http::HeaderMap;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const SESSION_COOKIE_NAME: &str = "cadastro_session";

/// Session lifetime in seconds; must not outlive the server-side store's TTL.
const SESSION_MAX_AGE: u32 = 30 * 60;

/// Per-visitor state surfaced on the next rendered page.
///
/// Stored server-side; the cookie only carries the session id.
#[derive(Clone, Debug, Default)]
pub struct SessionData {
    /// The last submitted name, redisplayed in the greeting.
    pub name: Option<String>,
    /// Whether the last submission matched an already-registered user.
    pub known: bool,
}

/// The signed session cookie. The value on the wire is `<id>.<signature>`
/// where the signature binds the id to the configured secret key; cookies
/// with a bad signature are treated as absent.
#[derive(Clone, Debug)]
pub struct SessionCookie {
    pub session_id: String,
}

impl SessionCookie {
    pub fn new(session_id: String) -> Self {
        Self { session_id }
    }

    /// Mint a cookie with a fresh random session id.
    pub fn issue() -> Self {
        let mut bytes = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut bytes);
        let session_id = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        Self { session_id }
    }

    pub fn from_headers(headers: &HeaderMap, secret: &str) -> Option<Self> {
        let cookie_header = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;

        // Parse cookie header for our session cookie
        for cookie in cookie_header.split(';') {
            let cookie = cookie.trim();
            if let Some(value) = cookie
                .strip_prefix(SESSION_COOKIE_NAME)
                .and_then(|s| s.strip_prefix('='))
            {
                let (session_id, signature) = value.split_once('.')?;
                if signature != sign(secret, session_id) {
                    return None;
                }
                return Some(Self {
                    session_id: session_id.to_string(),
                });
            }
        }
        None
    }

    pub fn to_cookie_header(&self, secret: &str) -> String {
        format!(
            "{}={}.{}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            SESSION_COOKIE_NAME,
            self.session_id,
            sign(secret, &self.session_id),
            SESSION_MAX_AGE
        )
    }
}

fn sign(secret: &str, session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(session_id.as_bytes());
    format!("{:x}", hasher.finalize())
}
