/// Middleware module
///
/// Authentication, role authorization and uniform error rendering.

mod authenticate;
mod authorize;
mod error_responder;

pub use authenticate::{authenticate, extract_token, Authenticate};
pub use authorize::{authorize, RequireRole};
pub use error_responder::{to_api_error, ErrorResponder};
