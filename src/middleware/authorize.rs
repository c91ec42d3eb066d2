/// Authorization Middleware
///
/// A role check over the identity attached by
/// [`crate::middleware::Authenticate`]. It must run after authentication.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::AuthenticatedUser;
use crate::domain::Role;
use crate::error::{ApiError, ErrorKind};

/// No identity fails with `AuthRequired`. An empty `allowed` list admits any
/// authenticated caller; otherwise the caller's role must be listed.
pub fn authorize(identity: Option<&AuthenticatedUser>, allowed: &[Role]) -> Result<(), ApiError> {
    let identity = identity.ok_or_else(|| ApiError::new(ErrorKind::AuthRequired))?;
    if !allowed.is_empty() && !allowed.contains(&identity.role()) {
        return Err(ApiError::new(ErrorKind::Forbidden));
    }
    Ok(())
}

pub struct RequireRole {
    allowed: Rc<[Role]>,
}

impl RequireRole {
    pub fn new(allowed: impl Into<Vec<Role>>) -> Self {
        Self {
            allowed: allowed.into().into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleMiddleware<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequireRoleMiddleware {
            service: Rc::new(service),
            allowed: self.allowed.clone(),
        }))
    }
}

pub struct RequireRoleMiddleware<S> {
    service: Rc<S>,
    allowed: Rc<[Role]>,
}

impl<S, B> Service<ServiceRequest> for RequireRoleMiddleware<S>
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
        let decision = authorize(req.extensions().get::<AuthenticatedUser>(), &self.allowed);

        if let Err(err) = decision {
            tracing::warn!(path = req.path(), reason = %err, "Authorization rejected");
            return Box::pin(async move { Ok(req.error_response(err).map_into_right_body()) });
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await.map(ServiceResponse::map_into_left_body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserProfile;
    use actix_web::test as actix_test;
    use chrono::Utc;
    use uuid::Uuid;

    fn identity(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            profile: UserProfile {
                id: Uuid::new_v4(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                role,
                is_email_verified: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_empty_role_list_admits_everyone() {
        assert!(authorize(Some(&identity(Role::User)), &[]).is_ok());
        assert!(authorize(Some(&identity(Role::Admin)), &[]).is_ok());
    }

    #[test]
    fn test_admin_only() {
        let err = authorize(Some(&identity(Role::User)), &[Role::Admin]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(authorize(Some(&identity(Role::Admin)), &[Role::Admin]).is_ok());
    }

    #[test]
    fn test_no_identity_is_auth_required() {
        for allowed in [vec![], vec![Role::Admin]] {
            let err = authorize(None, &allowed).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::AuthRequired);
        }
    }

    #[actix_web::test]
    async fn test_middleware_rejects_without_calling_handler() {
        let middleware = RequireRole::new([Role::Admin])
            .new_transform(actix_test::ok_service())
            .await
            .unwrap();

        let cases = [
            (Some(Role::User), 403),
            (Some(Role::Admin), 200),
            (None, 401),
        ];
        for (role, status) in cases {
            let req = actix_test::TestRequest::get().uri("/admin").to_srv_request();
            if let Some(role) = role {
                req.extensions_mut().insert(identity(role));
            }
            let res = middleware.call(req).await.unwrap();
            assert_eq!(res.status().as_u16(), status, "role {:?}", role);
        }
    }
}
