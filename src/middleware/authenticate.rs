/// Authentication Middleware
///
/// Resolves the caller from the `accessToken` cookie or an
/// `Authorization: Bearer` header and attaches an [`AuthenticatedUser`] to
/// the request. Any failure short-circuits with the corresponding error
/// response; the wrapped service is not called.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::{AuthenticatedUser, TokenKind, TokenService, ACCESS_TOKEN_COOKIE};
use crate::error::{ApiError, ErrorKind};
use crate::store::UserStore;

const BEARER: &str = "Bearer";

/// Pick the presented access token.
///
/// A non-empty cookie wins over the header. A `Bearer` header with nothing
/// after the scheme is `TokenMissing`; no usable credential at all is
/// `AuthRequired`.
pub fn extract_token(cookie: Option<&str>, authorization: Option<&str>) -> Result<String, ApiError> {
    if let Some(token) = cookie.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }

    let header = authorization
        .map(str::trim)
        .ok_or_else(|| ApiError::new(ErrorKind::AuthRequired))?;
    let rest = header
        .strip_prefix(BEARER)
        .ok_or_else(|| ApiError::new(ErrorKind::AuthRequired))?;

    if rest.trim().is_empty() {
        return Err(ApiError::new(ErrorKind::TokenMissing));
    }
    // "BearerXYZ" is some other scheme.
    if !rest.starts_with(' ') {
        return Err(ApiError::new(ErrorKind::AuthRequired));
    }
    Ok(rest.trim().to_string())
}

/// Verify `token` and resolve the user it names.
pub async fn authenticate(
    tokens: &TokenService,
    store: &dyn UserStore,
    token: &str,
) -> Result<AuthenticatedUser, ApiError> {
    let claims = tokens.verify_token(token)?;
    if claims.kind != TokenKind::Access {
        return Err(ApiError::new(ErrorKind::InvalidTokenType));
    }

    let user_id = claims.user_id()?;
    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::new(ErrorKind::UserNotFound))?;

    Ok(AuthenticatedUser {
        profile: user.profile(),
    })
}

pub struct Authenticate {
    tokens: Arc<TokenService>,
    store: Arc<dyn UserStore>,
}

impl Authenticate {
    pub fn new(tokens: Arc<TokenService>, store: Arc<dyn UserStore>) -> Self {
        Self { tokens, store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authenticate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticateMiddleware<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthenticateMiddleware {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
            store: self.store.clone(),
        }))
    }
}

pub struct AuthenticateMiddleware<S> {
    service: Rc<S>,
    tokens: Arc<TokenService>,
    store: Arc<dyn UserStore>,
}

impl<S, B> Service<ServiceRequest> for AuthenticateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let cookie = req.cookie(ACCESS_TOKEN_COOKIE);
        let presented = extract_token(
            cookie.as_ref().map(|c| c.value()),
            req.headers().get(AUTHORIZATION).and_then(|h| h.to_str().ok()),
        );

        let service = self.service.clone();
        let tokens = self.tokens.clone();
        let store = self.store.clone();

        Box::pin(async move {
            let outcome = match presented {
                Ok(token) => authenticate(&tokens, store.as_ref(), &token).await,
                Err(err) => Err(err),
            };

            match outcome {
                Ok(identity) => {
                    tracing::debug!(user_id = %identity.profile.id, "Request authenticated");
                    req.extensions_mut().insert(identity);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(err) => {
                    tracing::debug!(path = req.path(), reason = %err, "Authentication rejected");
                    Ok(req.error_response(err).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::configuration::JwtSettings;
    use crate::domain::{NewUser, Role};
    use crate::store::InMemoryUserStore;
    use actix_web::{test as actix_test, web, App, HttpResponse};

    fn token_service() -> TokenService {
        TokenService::new(&JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry_minutes: 30,
            refresh_token_expiry_days: 30,
            issuer: "test".to_string(),
        })
    }

    #[test]
    fn test_cookie_is_preferred_over_header() {
        let token = extract_token(Some("from-cookie"), Some("Bearer from-header")).unwrap();
        assert_eq!(token, "from-cookie");
    }

    #[test]
    fn test_header_is_used_without_cookie() {
        assert_eq!(extract_token(None, Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(extract_token(Some(""), Some("Bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_missing_credentials() {
        let cases = [
            (None, ErrorKind::AuthRequired),
            (Some("Basic dXNlcjpwYXNz"), ErrorKind::AuthRequired),
            (Some("BearerXYZ"), ErrorKind::AuthRequired),
            (Some("Bearer "), ErrorKind::TokenMissing),
            (Some("Bearer"), ErrorKind::TokenMissing),
        ];

        for (header, kind) in cases {
            let err = extract_token(None, header).unwrap_err();
            assert_eq!(err.kind(), kind, "header {:?}", header);
        }
    }

    #[actix_web::test]
    async fn test_authenticate_resolves_user() {
        let store = InMemoryUserStore::new();
        let tokens = token_service();
        let user = store
            .create(NewUser {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let access = tokens.generate_token(&user.id.to_string(), TokenKind::Access).unwrap();

        let identity = authenticate(&tokens, &store, &access).await.unwrap();
        assert_eq!(identity.profile.id, user.id);
    }

    #[actix_web::test]
    async fn test_authenticate_failures() {
        let store = InMemoryUserStore::new();
        let tokens = token_service();
        let subject = uuid::Uuid::new_v4().to_string();

        let refresh = tokens.generate_token(&subject, TokenKind::Refresh).unwrap();
        let unknown = tokens.generate_token(&subject, TokenKind::Access).unwrap();
        let expired = tokens
            .sign(&Claims::new(&subject, TokenKind::Access, -1, "test"))
            .unwrap();

        let cases = [
            (refresh, ErrorKind::InvalidTokenType),
            (unknown, ErrorKind::UserNotFound),
            (expired, ErrorKind::InvalidOrExpiredToken),
        ];
        for (token, kind) in cases {
            let err = authenticate(&tokens, &store, &token).await.unwrap_err();
            assert_eq!(err.kind(), kind);
        }
    }

    #[actix_web::test]
    async fn test_middleware_attaches_identity() {
        let store = Arc::new(InMemoryUserStore::new());
        let tokens = Arc::new(token_service());
        let user = store
            .create(NewUser {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let access = tokens.generate_token(&user.id.to_string(), TokenKind::Access).unwrap();

        let app = actix_test::init_service(
            App::new()
                .wrap(Authenticate::new(tokens.clone(), store.clone()))
                .route(
                    "/me",
                    web::get().to(|identity: AuthenticatedUser| async move {
                        HttpResponse::Ok().body(identity.profile.email)
                    }),
                ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header((AUTHORIZATION, format!("Bearer {}", access)))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(actix_test::read_body(res).await, "alice@example.com");

        let req = actix_test::TestRequest::get().uri("/me").to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status().as_u16(), 401);
    }
}
