//! Extraction boundary between web frameworks and the transport policy.

use crate::field::RequestField;

/// What the guard needs to know about a request.
///
/// Framework integrations implement this for their own request type (or
/// convert into [`IntakeRequest`](super::IntakeRequest), which already
/// implements it). Implementations must tag every field with the location
/// it actually arrived in; the guard trusts that tagging.
///
/// # Examples
///
/// ```
/// use transport_policy::web::RequestSource;
/// use transport_policy::{FieldLocation, OperationKind, RequestField, RuleRegistry, TransportPolicyGuard};
///
/// struct MyFrameworkRequest {
///     query: Vec<(String, String)>,
/// }
///
/// impl RequestSource for MyFrameworkRequest {
///     fn request_id(&self) -> &str {
///         "req-1"
///     }
///     fn method(&self) -> &str {
///         "GET"
///     }
///     fn fields(&self) -> Vec<RequestField> {
///         self.query
///             .iter()
///             .map(|(k, v)| RequestField::new(k.as_str(), FieldLocation::QueryString, v.as_str()))
///             .collect()
///     }
///     fn is_secure(&self) -> bool {
///         true
///     }
/// }
///
/// let guard = TransportPolicyGuard::new(RuleRegistry::builtin());
/// let req = MyFrameworkRequest {
///     query: vec![("token".to_string(), "abc".to_string())],
/// };
/// assert!(!guard.evaluate_request(OperationKind::Read, &req).allowed);
/// ```
pub trait RequestSource {
    /// Identifier used to correlate log lines.
    fn request_id(&self) -> &str;

    /// HTTP method as received.
    fn method(&self) -> &str;

    /// Every field of the request, tagged with its location.
    fn fields(&self) -> Vec<RequestField>;

    /// Whether the request arrived over HTTPS, directly or via a proxy.
    fn is_secure(&self) -> bool;

    /// HTTPS URL to redirect an insecure request to, if it can be built.
    fn https_location(&self) -> Option<String> {
        None
    }
}
