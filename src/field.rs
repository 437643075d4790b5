use std::fmt;

/// Where in the request a field was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldLocation {
    /// URL query string; ends up in access logs, history and `Referer`
    QueryString,
    /// Request header
    Header,
    /// Request body
    Body,
}

impl FieldLocation {
    /// Name used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldLocation::QueryString => "query",
            FieldLocation::Header => "header",
            FieldLocation::Body => "body",
        }
    }
}

impl fmt::Display for FieldLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named value taken from a request, tagged with its location.
///
/// The `Debug` output reports the value's length only, so a field can be
/// logged or shown in a test failure without printing what it holds.
///
/// # Examples
///
/// ```
/// use transport_policy::{FieldLocation, RequestField};
///
/// let field = RequestField::new("password", FieldLocation::Body, "secret123");
/// let debug = format!("{:?}", field);
///
/// assert!(debug.contains("password"));
/// assert!(!debug.contains("secret123"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct RequestField {
    /// Field name as sent by the client
    pub name: String,
    /// Where the field arrived
    pub location: FieldLocation,
    /// Raw value
    pub value: String,
}

impl RequestField {
    /// Creates a field.
    pub fn new(name: impl Into<String>, location: FieldLocation, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location,
            value: value.into(),
        }
    }
}

impl fmt::Debug for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestField")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("value_len", &self.value.len())
            .finish()
    }
}

impl<N, V> From<(N, FieldLocation, V)> for RequestField
where
    N: Into<String>,
    V: Into<String>,
{
    fn from((name, location, value): (N, FieldLocation, V)) -> Self {
        Self::new(name, location, value)
    }
}
