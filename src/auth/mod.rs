/// Authentication module
///
/// Token issuing and verification, password hashing, refresh token rotation
/// and session establishment.

mod claims;
mod cookies;
mod identity;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::{Claims, TokenKind};
pub use cookies::{
    removal_cookies, session_cookies, token_cookie, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
pub use identity::AuthenticatedUser;
pub use jwt::{TokenPair, TokenService};
pub use password::{hash_password, hash_password_blocking, verify_password, verify_password_blocking};
pub use refresh_token::{refresh_tokens, tokens_match};
pub use session::{login, register, AuthSession, Credentials, Registration};
