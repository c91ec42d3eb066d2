/// Token Service
///
/// Stateless creation and verification of signed, expiring tokens. The
/// service holds configuration only (keys, TTLs, issuer); it never touches
/// the user store.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use crate::auth::claims::{Claims, TokenKind};
use crate::configuration::JwtSettings;
use crate::error::{ApiError, ErrorKind};

/// Access and refresh token minted together for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenService {
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&settings.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            issuer: settings.issuer.clone(),
            access_ttl_seconds: settings.access_token_ttl_seconds(),
            refresh_ttl_seconds: settings.refresh_token_ttl_seconds(),
        }
    }

    /// Lifetime of a token of `kind`, in seconds.
    pub fn ttl_seconds(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_seconds,
            TokenKind::Refresh => self.refresh_ttl_seconds,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign a token of `kind` for `subject`, expiring after the kind's TTL.
    pub fn generate_token(&self, subject: &str, kind: TokenKind) -> Result<String, ApiError> {
        let claims = Claims::new(subject, kind, self.ttl_seconds(kind), &self.issuer);
        self.sign(&claims)
    }

    /// Sign arbitrary claims with the server secret.
    pub fn sign(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Token generation failed: {}", e)))
    }

    /// Verify signature, issuer and expiry and return the claims.
    ///
    /// Every failure maps to the same `InvalidOrExpiredToken` error; the
    /// actual reason is only logged.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(reason = %e, "JWT validation failed");
                ApiError::new(ErrorKind::InvalidOrExpiredToken)
            })
    }

    /// One access and one refresh token for `subject`.
    pub fn generate_auth_tokens(&self, subject: &str) -> Result<TokenPair, ApiError> {
        Ok(TokenPair {
            access_token: self.generate_token(subject, TokenKind::Access)?,
            refresh_token: self.generate_token(subject, TokenKind::Refresh)?,
        })
    }
}
