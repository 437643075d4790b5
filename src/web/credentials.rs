//! Credentials carried in headers.

use crate::error::{Violation, ViolationKind};
use crate::secret::Secret;

use super::IntakeRequest;

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// The scheme name is matched case-insensitively. The token comes back
/// wrapped in [`Secret`] so it cannot be logged by accident.
///
/// # Errors
///
/// - `MissingCredentials` if there is no `Authorization` header
/// - `InvalidCredentials` if the scheme is not `Bearer` or the token is empty
///
/// Both map to HTTP 401.
///
/// # Examples
///
/// ```
/// use transport_policy::web::{bearer_token, IntakeRequest};
///
/// let req = IntakeRequest::new("req-1", "GET").with_header("Authorization", "Bearer abc.def");
/// let token = bearer_token(&req).unwrap();
/// assert_eq!(token.expose_secret(), "abc.def");
///
/// let req = IntakeRequest::new("req-2", "GET").with_header("Authorization", "Basic Zm9vOmJhcg==");
/// assert_eq!(bearer_token(&req).unwrap_err().status_code(), 401);
/// ```
pub fn bearer_token(request: &IntakeRequest) -> Result<Secret<String>, Violation> {
    let header = request.header("Authorization").ok_or_else(|| {
        Violation::new(
            ViolationKind::MissingCredentials,
            "Authorization header required",
        )
    })?;
    parse_bearer(header)
}

/// Parses the value of an `Authorization` header.
///
/// # Errors
///
/// Returns `InvalidCredentials` if the value is not `Bearer <token>` with a
/// non-empty token.
pub fn parse_bearer(header: &str) -> Result<Secret<String>, Violation> {
    let invalid = || {
        Violation::new(
            ViolationKind::InvalidCredentials,
            "use 'Authorization: Bearer <token>'",
        )
    };

    let (scheme, token) = header.trim().split_once(' ').ok_or_else(invalid)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(invalid());
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(invalid());
    }
    Ok(Secret::new(token.to_string()))
}
