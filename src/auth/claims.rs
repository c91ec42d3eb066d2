/// JWT Claims structure
///
/// The signed payload of both access and refresh tokens. A token carries
/// exactly one [`TokenKind`]; the `jti` makes two tokens minted for the same
/// subject in the same second distinct.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Token kind, serialized as `type`
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Unique token ID
    pub jti: String,
}

impl Claims {
    /// Claims for `subject` valid for `lifetime_seconds` from now.
    /// A negative lifetime yields already-expired claims.
    pub fn new(subject: &str, kind: TokenKind, lifetime_seconds: i64, issuer: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: subject.to_string(),
            kind,
            iat: now,
            exp: now + lifetime_seconds,
            iss: issuer.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Parse the subject as a user ID. An unparseable subject names no user.
    pub fn user_id(&self) -> Result<Uuid, ApiError> {
        Uuid::parse_str(&self.sub).map_err(|_| ApiError::new(ErrorKind::UserNotFound))
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    /// Same rule as token verification with zero leeway: a token is still
    /// valid during the second named by `exp`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp < now
    }
}
