//! Framework-neutral request intake.

use std::fmt;

use serde_json::Value;

use crate::error::{Violation, ViolationKind};
use crate::field::{FieldLocation, RequestField};

use super::RequestSource;

/// URL scheme the request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    /// Plain HTTP
    #[default]
    Http,
    /// HTTP over TLS
    Https,
}

/// A request as seen by the policy layer: method, transport and every field
/// tagged with where it arrived.
///
/// Framework integrations build one of these from their native request type
/// and hand it to [`TransportPolicyGuard::evaluate_request`](crate::TransportPolicyGuard::evaluate_request).
/// Repeated keys are kept in arrival order.
///
/// `Debug` prints field names only.
///
/// # Examples
///
/// ```
/// use transport_policy::web::IntakeRequest;
/// use transport_policy::FieldLocation;
///
/// let req = IntakeRequest::new("req-1", "GET")
///     .with_path("/login")
///     .with_query_string("username=admin&password=secret%21");
///
/// assert_eq!(req.query_param("password"), Some("secret!"));
///
/// let fields = req.fields();
/// assert_eq!(fields.len(), 2);
/// assert!(fields.iter().all(|f| f.location == FieldLocation::QueryString));
/// ```
#[derive(Clone)]
pub struct IntakeRequest {
    request_id: String,
    method: String,
    scheme: Scheme,
    host: Option<String>,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Vec<(String, String)>,
}

impl IntakeRequest {
    /// Creates an empty plain-HTTP request for `/`.
    pub fn new(request_id: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            method: method.into(),
            scheme: Scheme::Http,
            host: None,
            path: "/".to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Sets the scheme.
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Sets the `Host` the request was addressed to.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the request path, without the query string.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Parses a raw `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored. Keys and values are percent-decoded and `+`
    /// becomes a space.
    pub fn with_query_string(mut self, raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        self.query.extend(
            url::form_urlencoded::parse(raw.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
        self
    }

    /// Adds a query parameter.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a body field.
    pub fn with_body_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.push((key.into(), value.into()));
        self
    }

    /// Adds the members of a JSON object body as body fields.
    ///
    /// Strings are taken as-is, `null` becomes an empty string, and numbers,
    /// booleans, arrays and nested objects keep their compact JSON text under
    /// the top-level key.
    ///
    /// # Errors
    ///
    /// Returns a `MalformedBody` violation if `text` is not JSON or not an
    /// object.
    pub fn with_json_body(mut self, text: &str) -> Result<Self, Violation> {
        let value: Value = serde_json::from_str(text).map_err(|_| {
            Violation::new(ViolationKind::MalformedBody, "request body is not valid JSON")
        })?;
        let Value::Object(map) = value else {
            return Err(Violation::new(
                ViolationKind::MalformedBody,
                "request body must be a JSON object",
            ));
        };
        for (key, value) in map {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            self.body.push((key, text));
        }
        Ok(self)
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the method as received.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Returns the path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the first query parameter named `key`.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        find(&self.query, |k| k == key)
    }

    /// Returns the first header named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        find(&self.headers, |k| k.eq_ignore_ascii_case(name))
    }

    /// Returns the first body field named `key`.
    pub fn body_field(&self, key: &str) -> Option<&str> {
        find(&self.body, |k| k == key)
    }

    /// Returns the number of body fields.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Every field, tagged: query string first, then headers, then body.
    pub fn fields(&self) -> Vec<RequestField> {
        let tag = |pairs: &[(String, String)], location: FieldLocation| {
            pairs
                .iter()
                .map(move |(k, v)| RequestField::new(k.as_str(), location, v.as_str()))
                .collect::<Vec<_>>()
        };
        let mut out = tag(&self.query, FieldLocation::QueryString);
        out.extend(tag(&self.headers, FieldLocation::Header));
        out.extend(tag(&self.body, FieldLocation::Body));
        out
    }
}

fn find<'a>(pairs: &'a [(String, String)], mut pred: impl FnMut(&str) -> bool) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| pred(k))
        .map(|(_, v)| v.as_str())
}

impl fmt::Debug for IntakeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |pairs: &[(String, String)]| {
            pairs.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>()
        };
        f.debug_struct("IntakeRequest")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("scheme", &self.scheme)
            .field("path", &self.path)
            .field("query", &names(&self.query))
            .field("headers", &names(&self.headers))
            .field("body", &names(&self.body))
            .finish()
    }
}

impl RequestSource for IntakeRequest {
    fn request_id(&self) -> &str {
        &self.request_id
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn fields(&self) -> Vec<RequestField> {
        IntakeRequest::fields(self)
    }

    fn is_secure(&self) -> bool {
        self.scheme == Scheme::Https
            || self
                .header("X-Forwarded-Proto")
                .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
    }

    /// `https://{host}{path}`. The query string is dropped so a leaked
    /// secret is not echoed back in the `Location` header.
    fn https_location(&self) -> Option<String> {
        let host = self.host.as_deref().or_else(|| self.header("Host"))?;
        Some(format!("https://{}{}", host, self.path))
    }
}
