/// Error rendering middleware.
///
/// Wraps the whole application. Any response carrying an error, whether an
/// [`ApiError`] raised by a handler or middleware or a foreign actix error
/// (payload limits, routing, content type), is re-rendered in the uniform
/// error shape for the configured [`Environment`]. So is the bare 405 actix
/// answers with when a resource has no route for the method.

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    http::StatusCode,
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::configuration::Environment;
use crate::error::{ApiError, ErrorKind};

/// Map any actix error onto the uniform shape.
pub fn to_api_error(err: &Error) -> ApiError {
    match err.as_error::<ApiError>() {
        Some(api_error) => api_error.clone(),
        None => ApiError::from_foreign(err.as_response_error().status_code(), err.to_string()),
    }
}

pub struct ErrorResponder {
    environment: Environment,
}

impl ErrorResponder {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ErrorResponder
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ErrorResponderMiddleware<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(ErrorResponderMiddleware {
            service: Rc::new(service),
            environment: self.environment,
        }))
    }
}

pub struct ErrorResponderMiddleware<S> {
    service: Rc<S>,
    environment: Environment,
}

impl<S, B> Service<ServiceRequest> for ErrorResponderMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let environment = self.environment;
        // Only the path is copied; a second handle on the request would break
        // the router's exclusive access to it.
        let path = req.path().to_string();

        Box::pin(async move {
            match service.call(req).await {
                Ok(res) => {
                    let api_error = match res.response().error() {
                        Some(err) => to_api_error(err),
                        None if res.status() == StatusCode::METHOD_NOT_ALLOWED => {
                            ApiError::new(ErrorKind::MethodNotAllowed)
                        }
                        None => return Ok(res.map_into_left_body()),
                    };
                    let rendered = api_error.render(environment, &path);
                    Ok(res.into_response(rendered).map_into_right_body())
                }
                Err(err) => {
                    let api_error = to_api_error(&err);
                    let rendered = api_error.render(environment, &path);
                    Err(InternalError::from_response(api_error, rendered).into())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, GENERIC_ERROR_MESSAGE};
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};
    use serde_json::Value;

    async fn failing(kind: web::Path<String>) -> Result<HttpResponse, Error> {
        match kind.as_str() {
            "forbidden" => Err(ApiError::new(ErrorKind::Forbidden).into()),
            "internal" => Err(ApiError::internal("pool exhausted").into()),
            "foreign-client" => Err(actix_web::error::ErrorPayloadTooLarge("payload too big")),
            _ => Err(actix_web::error::ErrorBadGateway("upstream exploded")),
        }
    }

    async fn call(environment: Environment, kind: &str) -> (StatusCode, Value) {
        let app = test::init_service(
            App::new()
                .wrap(ErrorResponder::new(environment))
                .route("/fail/{kind}", web::get().to(failing)),
        )
        .await;
        let req = test::TestRequest::get().uri(&format!("/fail/{}", kind)).to_request();
        let res = test::call_service(&app, req).await;
        let status = res.status();
        (status, test::read_body_json(res).await)
    }

    #[actix_web::test]
    async fn test_operational_error_keeps_message_in_production() {
        let (status, body) = call(Environment::Production, "forbidden").await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Forbidden: Insufficient permissions");
        assert!(body.get("error").is_none());
    }

    #[actix_web::test]
    async fn test_non_operational_error_is_hidden_in_production() {
        let (status, body) = call(Environment::Production, "internal").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);
        assert!(!body.to_string().contains("pool exhausted"));
    }

    #[actix_web::test]
    async fn test_full_detail_outside_production() {
        let (status, body) = call(Environment::Development, "internal").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["isOperational"], false);
        assert_eq!(body["error"]["cause"], "pool exhausted");
    }

    #[actix_web::test]
    async fn test_foreign_errors_are_normalized() {
        let (status, body) = call(Environment::Development, "foreign-client").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["message"], "payload too big");
        assert_eq!(body["error"]["isOperational"], false);

        let (status, body) = call(Environment::Production, "foreign-server").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);
    }

    #[actix_web::test]
    async fn test_successful_responses_pass_through() {
        let app = test::init_service(
            App::new()
                .wrap(ErrorResponder::new(Environment::Production))
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let res = test::call_service(&app, test::TestRequest::get().uri("/ok").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_wrong_method_gets_uniform_body() {
        let app = test::init_service(
            App::new()
                .wrap(ErrorResponder::new(Environment::Production))
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let req = test::TestRequest::post().uri("/ok").to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Method not allowed");
    }

    #[actix_web::test]
    async fn test_errors_from_inner_middleware_are_rendered() {
        let app = test::init_service(
            App::new()
                .wrap_fn(|_req, _srv| async {
                    Err::<ServiceResponse, _>(actix_web::error::ErrorBadGateway("upstream exploded"))
                })
                .wrap(ErrorResponder::new(Environment::Production))
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let req = test::TestRequest::get().uri("/ok").to_request();
        let err = match app.call(req).await {
            Ok(_) => panic!("inner middleware error was swallowed"),
            Err(err) => err,
        };

        let res = err.error_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = actix_web::body::to_bytes(res.into_body()).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], GENERIC_ERROR_MESSAGE);
        assert!(!body.to_string().contains("upstream exploded"));
    }
}
