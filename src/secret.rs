use std::fmt;

/// Holds a credential taken from a request so it cannot be printed by accident.
///
/// Bearer tokens and passwords extracted by the web layer are returned as
/// `Secret<String>`. `Debug` and `Display` always print `[REDACTED]`; the
/// value is only reachable through [`expose_secret`](Self::expose_secret).
///
/// # Examples
///
/// ```
/// use transport_policy::Secret;
///
/// let token = Secret::new("eyJhbGciOiJIUzI1NiJ9".to_string());
///
/// assert_eq!(format!("{:?}", token), "[REDACTED]");
/// assert_eq!(format!("auth with {}", token), "auth with [REDACTED]");
/// assert_eq!(token.expose_secret(), "eyJhbGciOiJIUzI1NiJ9");
/// ```
// No Clone, Deref, AsRef or Serialize: each would hand the raw value to code
// that never asked for it explicitly.
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a sensitive value.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Returns the raw value. Do not log the result.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }
}

impl<T: PartialEq> Secret<T> {
    /// Compares with a candidate without exposing either side.
    pub fn matches(&self, candidate: &T) -> bool {
        self.inner == *candidate
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
