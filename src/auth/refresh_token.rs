/// Refresh Token Rotation
///
/// The stored refresh token is the only server-side state the auth core
/// owns. Each successful refresh replaces it, so a token that has already
/// been rotated out is rejected even before it expires.

use sha2::{Digest, Sha256};

use crate::auth::claims::TokenKind;
use crate::auth::jwt::{TokenPair, TokenService};
use crate::error::{ApiError, ErrorKind};
use crate::store::UserStore;

/// Compare a presented token with the stored one without an early exit.
///
/// Both sides are reduced to SHA-256 digests first so the comparison always
/// runs over 32 bytes, whatever the input lengths.
pub fn tokens_match(presented: &str, stored: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let stored = Sha256::digest(stored.as_bytes());

    presented
        .iter()
        .zip(stored.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Exchange a valid, current refresh token for a fresh pair.
///
/// # Errors
/// - `InvalidOrExpiredToken`: bad signature, malformed or expired
/// - `InvalidTokenType`: an access token was presented
/// - `InvalidRefreshToken`: unknown user, nothing stored, or any internal failure
/// - `RefreshTokenMismatch`: the token is not the one currently stored
pub async fn refresh_tokens(
    store: &dyn UserStore,
    tokens: &TokenService,
    presented: &str,
) -> Result<TokenPair, ApiError> {
    rotate(store, tokens, presented).await.map_err(|err| match err.kind() {
        ErrorKind::InvalidOrExpiredToken
        | ErrorKind::InvalidTokenType
        | ErrorKind::InvalidRefreshToken
        | ErrorKind::RefreshTokenMismatch => err,
        _ => {
            tracing::warn!(error = %err, cause = err.cause().unwrap_or(""), "Token refresh failed");
            ApiError::new(ErrorKind::InvalidRefreshToken)
        }
    })
}

async fn rotate(
    store: &dyn UserStore,
    tokens: &TokenService,
    presented: &str,
) -> Result<TokenPair, ApiError> {
    let claims = tokens.verify_token(presented)?;
    if claims.kind != TokenKind::Refresh {
        return Err(ApiError::new(ErrorKind::InvalidTokenType));
    }

    let user_id = claims
        .user_id()
        .map_err(|_| ApiError::new(ErrorKind::InvalidRefreshToken))?;
    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::new(ErrorKind::InvalidRefreshToken))?;
    let stored = user
        .refresh_token
        .as_deref()
        .ok_or_else(|| ApiError::new(ErrorKind::InvalidRefreshToken))?;

    if !tokens_match(presented, stored) {
        tracing::warn!(user_id = %user_id, "Superseded refresh token presented");
        return Err(ApiError::new(ErrorKind::RefreshTokenMismatch));
    }

    let pair = tokens.generate_auth_tokens(&claims.sub)?;

    // A concurrent refresh may have rotated the token since it was read.
    if !store
        .swap_refresh_token(user_id, presented, &pair.refresh_token)
        .await?
    {
        tracing::warn!(user_id = %user_id, "Refresh token rotated concurrently");
        return Err(ApiError::new(ErrorKind::RefreshTokenMismatch));
    }

    tracing::info!(user_id = %user_id, "Refresh token rotated");
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Claims;
    use crate::configuration::JwtSettings;
    use crate::domain::{NewUser, ProfileChanges, Role, UserRecord};
    use crate::store::InMemoryUserStore;

    fn token_service() -> TokenService {
        TokenService::new(&JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry_minutes: 30,
            refresh_token_expiry_days: 30,
            issuer: "test".to_string(),
        })
    }

    async fn user_with_pair(store: &InMemoryUserStore, tokens: &TokenService) -> (UserRecord, TokenPair) {
        let user = store
            .create(NewUser {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let pair = tokens.generate_auth_tokens(&user.id.to_string()).unwrap();
        store.set_refresh_token(user.id, &pair.refresh_token).await.unwrap();
        (user, pair)
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "abcd"));
        assert!(!tokens_match("", "abc"));
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_stores_new_token() {
        let store = InMemoryUserStore::new();
        let tokens = token_service();
        let (user, first) = user_with_pair(&store, &tokens).await;

        let second = refresh_tokens(&store, &tokens, &first.refresh_token).await.unwrap();

        assert_ne!(second.refresh_token, first.refresh_token);
        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(second.refresh_token.as_str()));
    }

    #[tokio::test]
    async fn test_stale_token_is_a_mismatch() {
        let store = InMemoryUserStore::new();
        let tokens = token_service();
        let (_, first) = user_with_pair(&store, &tokens).await;

        refresh_tokens(&store, &tokens, &first.refresh_token).await.unwrap();
        let err = refresh_tokens(&store, &tokens, &first.refresh_token).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RefreshTokenMismatch);
    }

    #[tokio::test]
    async fn test_profile_update_during_rotation_keeps_new_token() {
        let store = InMemoryUserStore::new();
        let tokens = token_service();
        let (user, first) = user_with_pair(&store, &tokens).await;

        let demote = ProfileChanges {
            name: Some("Alicia".to_string()),
            role: Some(Role::User),
            ..Default::default()
        };
        let (updated, rotated) = tokio::join!(
            store.update_profile(user.id, demote),
            refresh_tokens(&store, &tokens, &first.refresh_token),
        );
        let second = rotated.unwrap();
        assert!(updated.unwrap().is_some());

        // A later profile write must not bring the old token back either.
        store
            .update_profile(
                user.id,
                ProfileChanges {
                    password_hash: Some("rehashed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stale = refresh_tokens(&store, &tokens, &first.refresh_token).await.unwrap_err();
        assert_eq!(stale.kind(), ErrorKind::RefreshTokenMismatch);
        assert!(refresh_tokens(&store, &tokens, &second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_access_token_is_wrong_type() {
        let store = InMemoryUserStore::new();
        let tokens = token_service();
        let (_, pair) = user_with_pair(&store, &tokens).await;

        let err = refresh_tokens(&store, &tokens, &pair.access_token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTokenType);
    }

    #[tokio::test]
    async fn test_unknown_user_is_invalid_refresh_token() {
        let store = InMemoryUserStore::new();
        let tokens = token_service();
        let orphan = tokens
            .generate_token(&uuid::Uuid::new_v4().to_string(), TokenKind::Refresh)
            .unwrap();

        let err = refresh_tokens(&store, &tokens, &orphan).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRefreshToken);
    }

    #[tokio::test]
    async fn test_user_without_stored_token_is_invalid_refresh_token() {
        let store = InMemoryUserStore::new();
        let tokens = token_service();
        let (mut user, pair) = user_with_pair(&store, &tokens).await;
        user.refresh_token = None;
        store.save(&user).await.unwrap();

        let err = refresh_tokens(&store, &tokens, &pair.refresh_token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRefreshToken);
    }

    #[tokio::test]
    async fn test_expired_refresh_token() {
        let store = InMemoryUserStore::new();
        let tokens = token_service();
        let (user, _) = user_with_pair(&store, &tokens).await;
        let expired = tokens
            .sign(&Claims::new(&user.id.to_string(), TokenKind::Refresh, -1, "test"))
            .unwrap();

        let err = refresh_tokens(&store, &tokens, &expired).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOrExpiredToken);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_with_same_token_succeeds_once() {
        let store = InMemoryUserStore::new();
        let tokens = token_service();
        let (_, pair) = user_with_pair(&store, &tokens).await;

        let (first, second) = tokio::join!(
            refresh_tokens(&store, &tokens, &pair.refresh_token),
            refresh_tokens(&store, &tokens, &pair.refresh_token),
        );

        let successes = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        let failure = first.err().or(second.err()).unwrap();
        assert_eq!(failure.kind(), ErrorKind::RefreshTokenMismatch);
    }
}
