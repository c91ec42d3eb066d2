/// User administration routes. Mounted behind authentication and the
/// `admin` role.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::Envelope;
use crate::auth::{hash_password_blocking, AuthenticatedUser};
use crate::domain::{NewUser, ProfileChanges, Role, UserRecord};
use crate::error::{ApiError, ErrorKind};
use crate::startup::AppState;
use crate::store::UserStore;
use crate::validation::{RequestSchema, ValidatedJson, ValidatedPath};
use crate::validators::{canonical_email, validate_display_name, validate_password_complexity};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 3, max = 100, message = "must be between 3 and 100 characters"),
        custom(function = "validate_display_name")
    )]
    pub name: String,
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(custom(function = "validate_password_complexity"))]
    pub password: String,
    pub role: Option<Role>,
}

impl RequestSchema for CreateUserRequest {
    fn canonicalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = canonical_email(&self.email);
        self
    }
}

/// Partial update. Fields not listed here are rejected.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 3, max = 100, message = "must be between 3 and 100 characters"),
        custom(function = "validate_display_name")
    )]
    pub name: Option<String>,
    #[validate(email(message = "must be a valid email"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_password_complexity"))]
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_email_verified: Option<bool>,
}

impl RequestSchema for UpdateUserRequest {
    fn canonicalize(mut self) -> Self {
        self.name = self.name.map(|name| name.trim().to_string());
        self.email = self.email.as_deref().map(canonical_email);
        self
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserPath {
    pub user_id: Uuid,
}

impl RequestSchema for UserPath {}

fn user_not_found() -> ApiError {
    ApiError::new(ErrorKind::NotFound).with_message("User not found")
}

async fn load_user(store: &dyn UserStore, id: Uuid) -> Result<UserRecord, ApiError> {
    store.find_by_id(id).await?.ok_or_else(user_not_found)
}

/// POST /api/v1/users
pub async fn create_user(
    admin: AuthenticatedUser,
    ValidatedJson(form): ValidatedJson<CreateUserRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let password_hash = hash_password_blocking(form.password).await?;
    let user = state
        .store
        .create(NewUser {
            name: form.name,
            email: form.email,
            password_hash,
            role: form.role.unwrap_or_default(),
        })
        .await?;

    tracing::info!(admin_id = %admin.profile.id, user_id = %user.id, role = %user.role, "User created");
    Ok(HttpResponse::Created().json(Envelope::new(user.profile())))
}

/// GET /api/v1/users/{user_id}
pub async fn get_user(
    ValidatedPath(path): ValidatedPath<UserPath>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let user = load_user(state.store.as_ref(), path.user_id).await?;
    Ok(HttpResponse::Ok().json(Envelope::new(user.profile())))
}

/// PATCH /api/v1/users/{user_id}
///
/// # Errors
/// - 404: unknown user
/// - 409: the new email belongs to another user
pub async fn update_user(
    admin: AuthenticatedUser,
    ValidatedPath(path): ValidatedPath<UserPath>,
    ValidatedJson(changes): ValidatedJson<UpdateUserRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let password_hash = match changes.password {
        Some(password) => Some(hash_password_blocking(password).await?),
        None => None,
    };

    let user = state
        .store
        .update_profile(
            path.user_id,
            ProfileChanges {
                name: changes.name,
                email: changes.email,
                password_hash,
                role: changes.role,
                is_email_verified: changes.is_email_verified,
            },
        )
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(admin_id = %admin.profile.id, user_id = %user.id, "User updated");
    Ok(HttpResponse::Ok().json(Envelope::new(user.profile())))
}

/// DELETE /api/v1/users/{user_id}
pub async fn delete_user(
    admin: AuthenticatedUser,
    ValidatedPath(path): ValidatedPath<UserPath>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    if !state.store.delete(path.user_id).await? {
        return Err(user_not_found());
    }

    tracing::info!(admin_id = %admin.profile.id, user_id = %path.user_id, "User deleted");
    Ok(HttpResponse::NoContent().finish())
}
