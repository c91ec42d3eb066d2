/// Session cookies.
///
/// Both tokens are also delivered as `HttpOnly`, `SameSite=Strict` cookies
/// whose lifetime matches the token TTL.

use actix_web::cookie::{time::Duration, Cookie, SameSite};

use crate::auth::claims::TokenKind;
use crate::auth::jwt::{TokenPair, TokenService};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

pub fn cookie_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Access => ACCESS_TOKEN_COOKIE,
        TokenKind::Refresh => REFRESH_TOKEN_COOKIE,
    }
}

fn base_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .finish()
}

pub fn token_cookie(kind: TokenKind, token: &str, ttl_seconds: i64, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(cookie_name(kind), token.to_string(), secure);
    cookie.set_max_age(Duration::seconds(ttl_seconds));
    cookie
}

/// Cookies for both tokens of `pair`.
pub fn session_cookies(
    pair: &TokenPair,
    tokens: &TokenService,
    secure: bool,
) -> [Cookie<'static>; 2] {
    [
        token_cookie(
            TokenKind::Access,
            &pair.access_token,
            tokens.ttl_seconds(TokenKind::Access),
            secure,
        ),
        token_cookie(
            TokenKind::Refresh,
            &pair.refresh_token,
            tokens.ttl_seconds(TokenKind::Refresh),
            secure,
        ),
    ]
}

/// Expired, empty cookies that make the client drop both tokens.
pub fn removal_cookies(secure: bool) -> [Cookie<'static>; 2] {
    [TokenKind::Access, TokenKind::Refresh].map(|kind| {
        let mut cookie = base_cookie(cookie_name(kind), String::new(), secure);
        cookie.set_max_age(Duration::ZERO);
        cookie
    })
}
