/// Authentication Routes
///
/// Registration, login, logout, token refresh and the caller's profile.

use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Envelope;
use crate::auth::{
    self, removal_cookies, session_cookies, AuthSession, AuthenticatedUser, Credentials,
    Registration, REFRESH_TOKEN_COOKIE,
};
use crate::domain::{Role, UserProfile};
use crate::error::{ApiError, ErrorKind};
use crate::startup::AppState;
use crate::validation::{RequestSchema, ValidatedJson};
use crate::validators::{canonical_email, validate_display_name, validate_password_complexity};

/// User registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 100, message = "must be between 3 and 100 characters"),
        custom(function = "validate_display_name")
    )]
    pub name: String,
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(custom(function = "validate_password_complexity"))]
    pub password: String,
}

impl RequestSchema for RegisterRequest {
    fn canonicalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = canonical_email(&self.email);
        self
    }
}

/// User login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 8, max = 50, message = "must be between 8 and 50 characters"))]
    pub password: String,
}

impl RequestSchema for LoginRequest {
    fn canonicalize(mut self) -> Self {
        self.email = canonical_email(&self.email);
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionData<'a> {
    user: &'a UserProfile,
    access_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData<'a> {
    access_token: &'a str,
}

fn session_response(mut builder: HttpResponseBuilder, state: &AppState, session: &AuthSession) -> HttpResponse {
    for cookie in session_cookies(&session.tokens, &state.tokens, state.cookie_secure) {
        builder.cookie(cookie);
    }
    builder.json(Envelope::new(SessionData {
        user: &session.user,
        access_token: &session.tokens.access_token,
    }))
}

/// POST /api/v1/auth/register
///
/// Public registration always creates a `user`; admins are created through
/// `/api/v1/users`.
///
/// # Errors
/// - 400: validation failed
/// - 409: email already registered
pub async fn register(
    ValidatedJson(form): ValidatedJson<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let session = auth::register(
        state.store.as_ref(),
        &state.tokens,
        Registration {
            name: form.name,
            email: form.email,
            password: form.password,
            role: Role::User,
        },
    )
    .await?;

    Ok(session_response(HttpResponse::Created(), &state, &session))
}

/// POST /api/v1/auth/login
///
/// Unknown email and wrong password produce the same 401.
pub async fn login(
    ValidatedJson(form): ValidatedJson<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let session = auth::login(
        state.store.as_ref(),
        &state.tokens,
        Credentials {
            email: form.email,
            password: form.password,
        },
    )
    .await?;

    Ok(session_response(HttpResponse::Ok(), &state, &session))
}

/// POST /api/v1/auth/logout
///
/// Clears both cookies. The stored refresh token is left in place and is
/// replaced at the next login.
pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    for cookie in removal_cookies(state.cookie_secure) {
        builder.cookie(cookie);
    }
    builder.json(serde_json::json!({
        "status": "success",
        "message": "Logged out successfully"
    }))
}

/// POST /api/v1/auth/refresh
///
/// Rotates the refresh token presented in the `refreshToken` cookie.
pub async fn refresh(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let presented = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::new(ErrorKind::InvalidRefreshToken))?;

    let pair = auth::refresh_tokens(state.store.as_ref(), &state.tokens, &presented).await?;

    let mut builder = HttpResponse::Ok();
    for cookie in session_cookies(&pair, &state.tokens, state.cookie_secure) {
        builder.cookie(cookie);
    }
    Ok(builder.json(Envelope::new(RefreshData {
        access_token: &pair.access_token,
    })))
}

/// GET /api/v1/auth/profile
pub async fn profile(identity: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(Envelope::new(identity.profile))
}
