/// Session establishment: registration and login.
///
/// Both issue a fresh token pair and make its refresh token the single
/// stored one for the user, replacing whatever was stored before.

use uuid::Uuid;

use crate::auth::jwt::{TokenPair, TokenService};
use crate::auth::password::{
    hash_password_blocking, verify_password_blocking, verify_password_for_missing_user,
};
use crate::domain::{NewUser, Role, UserProfile, UserRecord};
use crate::error::{ApiError, ErrorKind};
use crate::store::UserStore;

pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Sanitized identity plus the tokens issued for it.
#[derive(Debug)]
pub struct AuthSession {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// Create a user and open a session for it.
///
/// # Errors
/// - `ValidationFailed`: password does not meet the complexity rules
/// - `Conflict`: email already registered
/// - `StorageUnavailable` / `InternalError`: store failures
pub async fn register(
    store: &dyn UserStore,
    tokens: &TokenService,
    registration: Registration,
) -> Result<AuthSession, ApiError> {
    let password_hash = hash_password_blocking(registration.password).await?;
    let user = store
        .create(NewUser {
            name: registration.name,
            email: registration.email,
            password_hash,
            role: registration.role,
        })
        .await?;

    let session = issue_session(store, tokens, user.id)
        .await?
        .ok_or_else(|| ApiError::internal(format!("user {} vanished after create", user.id)))?;
    tracing::info!(user_id = %session.user.id, "User registered");
    Ok(session)
}

/// Authenticate by email and password.
///
/// An unknown email, a wrong password and any failure while looking the user
/// up or comparing the password all produce the same `InvalidCredentials`
/// error.
pub async fn login(
    store: &dyn UserStore,
    tokens: &TokenService,
    credentials: Credentials,
) -> Result<AuthSession, ApiError> {
    let user = match authenticate_credentials(store, credentials).await {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!(reason = %err, "Login rejected");
            return Err(ApiError::new(ErrorKind::InvalidCredentials));
        }
    };

    // Removed between the password check and the token write.
    let session = issue_session(store, tokens, user.id).await?.ok_or_else(|| {
        tracing::warn!(user_id = %user.id, "Login rejected: user no longer exists");
        ApiError::new(ErrorKind::InvalidCredentials)
    })?;
    tracing::info!(user_id = %session.user.id, "User logged in");
    Ok(session)
}

async fn authenticate_credentials(
    store: &dyn UserStore,
    credentials: Credentials,
) -> Result<UserRecord, ApiError> {
    let user = match store.find_by_email(&credentials.email).await? {
        Some(user) => user,
        None => {
            verify_password_for_missing_user(credentials.password).await;
            return Err(ApiError::new(ErrorKind::InvalidCredentials).with_cause("unknown email"));
        }
    };

    if !verify_password_blocking(credentials.password, user.password_hash.clone()).await? {
        return Err(ApiError::new(ErrorKind::InvalidCredentials).with_cause("password mismatch"));
    }

    Ok(user)
}

/// Issue a pair and write only its refresh token. The profile is read back
/// afterwards so it reflects concurrent profile changes. `None` if the user
/// is gone.
async fn issue_session(
    store: &dyn UserStore,
    tokens: &TokenService,
    user_id: Uuid,
) -> Result<Option<AuthSession>, ApiError> {
    let pair = tokens.generate_auth_tokens(&user_id.to_string())?;
    if !store.set_refresh_token(user_id, &pair.refresh_token).await? {
        return Ok(None);
    }

    Ok(store.find_by_id(user_id).await?.map(|user| AuthSession {
        user: user.profile(),
        tokens: pair,
    }))
}
