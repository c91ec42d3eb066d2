use actix_web::{HttpRequest, HttpResponse};
use serde::Serialize;

use crate::error::ApiError;

mod auth;
mod users;

pub use auth::{login, logout, profile, refresh, register, LoginRequest, RegisterRequest};
pub use users::{
    create_user, delete_user, get_user, update_user, CreateUserRequest, UpdateUserRequest, UserPath,
};

/// `{"status": "success", "data": ...}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    status: &'static str,
    data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

/// GET /health_check
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().finish()
}

/// Fallback for unmatched paths.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    Err(ApiError::not_found(req.path()))
}
