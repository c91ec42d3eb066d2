/// Request Validation Gate
///
/// Extractors that parse one request part (path params, query string or
/// JSON body) into a schema type, canonicalize it and validate it. A part
/// that fails fails the request with a single `ValidationFailed` error
/// listing all of that part's field violations.
///
/// Transport problems unrelated to the schema (payload too large, wrong
/// content type, malformed JSON) keep their actix error.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::{ready, Ready};
use std::ops::Deref;
use validator::{Validate, ValidationErrors};

use crate::error::ApiError;

/// A validated request schema.
///
/// `canonicalize` runs before validation; the handler receives its output.
pub trait RequestSchema: DeserializeOwned + Validate {
    fn canonicalize(self) -> Self {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPart {
    Params,
    Query,
    Body,
}

impl RequestPart {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestPart::Params => "params",
            RequestPart::Query => "query",
            RequestPart::Body => "body",
        }
    }
}

impl fmt::Display for RequestPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `"body.email - must be a valid email, body.name - ..."`, ordered by field.
pub fn format_violations(part: RequestPart, errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors
        .field_errors()
        .into_iter()
        .map(|(field, violations)| (field.to_string(), violations))
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .iter()
        .flat_map(|(field, violations)| {
            violations.iter().map(move |violation| {
                let message = violation
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("is invalid ({})", violation.code));
                format!("{}.{} - {}", part, field, message)
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Canonicalize and validate a parsed part.
pub fn validate_part<T: RequestSchema>(part: RequestPart, value: T) -> Result<T, ApiError> {
    let value = value.canonicalize();
    value
        .validate()
        .map_err(|errors| ApiError::validation(format_violations(part, &errors)))?;
    Ok(value)
}

fn shape_error(part: RequestPart, err: impl fmt::Display) -> ApiError {
    ApiError::validation(format!("{} - {}", part, err))
}

macro_rules! validated_extractor {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name<T>(pub T);

        impl<T> $name<T> {
            pub fn into_inner(self) -> T {
                self.0
            }
        }

        impl<T> Deref for $name<T> {
            type Target = T;

            fn deref(&self) -> &T {
                &self.0
            }
        }
    };
}

validated_extractor!(ValidatedJson);
validated_extractor!(ValidatedQuery);
validated_extractor!(ValidatedPath);

impl<T: RequestSchema + 'static> FromRequest for ValidatedJson<T> {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let raw = web::Json::<serde_json::Value>::from_request(req, payload);

        Box::pin(async move {
            let web::Json(raw) = raw.await?;
            let parsed: T = serde_json::from_value(raw).map_err(|e| shape_error(RequestPart::Body, e))?;
            Ok(ValidatedJson(validate_part(RequestPart::Body, parsed)?))
        })
    }
}

impl<T: RequestSchema> FromRequest for ValidatedQuery<T> {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = web::Query::<T>::from_query(req.query_string())
            .map_err(|e| shape_error(RequestPart::Query, e))
            .and_then(|parsed| validate_part(RequestPart::Query, parsed.into_inner()))
            .map(ValidatedQuery);
        ready(result)
    }
}

impl<T: RequestSchema> FromRequest for ValidatedPath<T> {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = req
            .match_info()
            .load::<T>()
            .map_err(|e| shape_error(RequestPart::Params, e))
            .and_then(|parsed| validate_part(RequestPart::Params, parsed))
            .map(ValidatedPath);
        ready(result)
    }
}
