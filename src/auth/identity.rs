/// The identity attached to a request once authentication succeeds.

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::domain::{Role, UserProfile};
use crate::error::{ApiError, ErrorKind};

/// Sanitized profile of the authenticated caller.
///
/// Inserted into request extensions by [`crate::middleware::Authenticate`].
/// Used as an extractor, it fails with `AuthRequired` on routes the
/// middleware does not cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub profile: UserProfile,
}

impl AuthenticatedUser {
    pub fn role(&self) -> Role {
        self.profile.role
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or_else(|| ApiError::new(ErrorKind::AuthRequired)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use chrono::Utc;
    use uuid::Uuid;

    fn identity() -> AuthenticatedUser {
        AuthenticatedUser {
            profile: UserProfile {
                id: Uuid::new_v4(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                role: Role::Admin,
                is_email_verified: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    #[actix_web::test]
    async fn test_extracts_identity_from_extensions() {
        let user = identity();
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(user.clone());

        let extracted = AuthenticatedUser::extract(&req).await.unwrap();
        assert_eq!(extracted, user);
        assert_eq!(extracted.role(), Role::Admin);
    }

    #[actix_web::test]
    async fn test_missing_identity_is_auth_required() {
        let req = TestRequest::default().to_http_request();

        let err = AuthenticatedUser::extract(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthRequired);
    }
}
