//! Transport-location and method policy for incoming requests.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classifier::FieldClassifier;
use crate::error::{Violation, ViolationKind};
use crate::field::{FieldLocation, RequestField};
use crate::http::HttpMethod;
use crate::web::RequestSource;

/// Whether an operation only reads or changes server state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Read-only; any recognised method is acceptable
    #[default]
    Read,
    /// Mutates data; requires POST, PUT, PATCH or DELETE
    StateChanging,
}

/// Why a request was allowed or rejected.
///
/// When several checks fail, the reason reported is the first in this order:
/// insecure transport, unsafe method, sensitive query field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Every check passed
    Compliant,
    /// A sensitive field arrived in the query string
    SensitiveQueryField,
    /// The method is not acceptable for the operation
    UnsafeMethod,
    /// The request did not arrive over HTTPS
    InsecureTransport,
}

impl DecisionReason {
    /// Stable identifier used in responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::Compliant => "compliant",
            DecisionReason::SensitiveQueryField => "sensitive-query-field",
            DecisionReason::UnsafeMethod => "unsafe-method",
            DecisionReason::InsecureTransport => "insecure-transport",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one request.
///
/// Decisions are plain values: they are produced per request, inspected by
/// the handler and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    /// `true` iff no check failed
    pub allowed: bool,
    /// Sensitive fields found in the query string
    pub violating_fields: BTreeSet<String>,
    /// Highest-priority reason for the outcome
    pub reason: DecisionReason,
    credential_exposed: bool,
    rejected_method: Option<String>,
    insecure_transport: bool,
    redirect_location: Option<String>,
}

impl PolicyDecision {
    fn from_checks(
        violating_fields: BTreeSet<String>,
        credential_exposed: bool,
        rejected_method: Option<String>,
        insecure_transport: bool,
        redirect_location: Option<String>,
    ) -> Self {
        let reason = if insecure_transport {
            DecisionReason::InsecureTransport
        } else if rejected_method.is_some() {
            DecisionReason::UnsafeMethod
        } else if !violating_fields.is_empty() {
            DecisionReason::SensitiveQueryField
        } else {
            DecisionReason::Compliant
        };

        Self {
            allowed: reason == DecisionReason::Compliant,
            violating_fields,
            reason,
            credential_exposed,
            rejected_method,
            insecure_transport,
            redirect_location,
        }
    }

    /// Returns `true` if the method check failed.
    pub fn method_violation(&self) -> bool {
        self.rejected_method.is_some()
    }

    /// Returns `true` if a credential or token was found in the query string.
    pub fn credential_exposed(&self) -> bool {
        self.credential_exposed
    }

    /// HTTPS URL the client should be redirected to, for insecure requests.
    pub fn redirect_location(&self) -> Option<&str> {
        self.redirect_location.as_deref()
    }

    /// HTTP status a handler should answer with.
    ///
    /// `200` when allowed; `301` for insecure transport; `401` when a
    /// credential or token leaked into the URL; `405` for a method violation;
    /// `400` for any other sensitive query field.
    pub fn status_code(&self) -> u16 {
        if self.allowed {
            200
        } else if self.insecure_transport {
            301
        } else if self.credential_exposed {
            401
        } else if self.rejected_method.is_some() {
            405
        } else {
            400
        }
    }

    /// Every failed check as a [`Violation`], highest priority first.
    pub fn violations(&self) -> Vec<Violation> {
        let mut out = Vec::new();
        if self.insecure_transport {
            out.push(Violation::new(
                ViolationKind::InsecureTransport {
                    redirect: self.redirect_location.clone(),
                },
                "requests must use HTTPS",
            ));
        }
        if let Some(method) = &self.rejected_method {
            out.push(Violation::new(
                ViolationKind::UnsafeMethod {
                    method: method.clone(),
                },
                "use POST, PUT, PATCH or DELETE for this operation",
            ));
        }
        if !self.violating_fields.is_empty() {
            out.push(Violation::new(
                ViolationKind::SensitiveQueryField {
                    fields: self.violating_fields.iter().cloned().collect(),
                    credential: self.credential_exposed,
                },
                "sensitive values must be sent in the body or a header",
            ));
        }
        out
    }

    /// Converts the decision into `Ok(())` or its highest-priority violation.
    ///
    /// # Errors
    ///
    /// Returns the first entry of [`violations`](Self::violations) when the
    /// request is not allowed.
    pub fn into_result(self) -> Result<(), Violation> {
        match self.violations().into_iter().next() {
            Some(v) => Err(v),
            None => Ok(()),
        }
    }
}

/// Rejects requests that carry sensitive data in the URL or use the wrong
/// method, before any handler logic runs.
///
/// The guard is stateless apart from the shared, read-only rule registry, so
/// one instance can serve every request concurrently.
///
/// # Examples
///
/// ```
/// use transport_policy::{FieldLocation, RequestField, RuleRegistry, TransportPolicyGuard};
///
/// let guard = TransportPolicyGuard::new(RuleRegistry::builtin());
///
/// let leaked = guard.evaluate(
///     "GET",
///     &[
///         RequestField::new("username", FieldLocation::QueryString, "admin"),
///         RequestField::new("password", FieldLocation::QueryString, "secret123"),
///     ],
/// );
/// assert!(!leaked.allowed);
/// assert!(leaked.violating_fields.contains("password"));
///
/// let posted = guard.evaluate(
///     "POST",
///     &[
///         RequestField::new("username", FieldLocation::Body, "admin"),
///         RequestField::new("password", FieldLocation::Body, "secret123"),
///     ],
/// );
/// assert!(posted.allowed);
/// ```
#[derive(Debug, Clone)]
pub struct TransportPolicyGuard {
    classifier: FieldClassifier,
    default_operation: OperationKind,
    require_secure_transport: bool,
}

impl TransportPolicyGuard {
    /// Creates a guard that treats operations as read-only by default.
    pub fn new(classifier: impl Into<FieldClassifier>) -> Self {
        Self {
            classifier: classifier.into(),
            default_operation: OperationKind::Read,
            require_secure_transport: false,
        }
    }

    /// Sets the operation kind [`evaluate`](Self::evaluate) assumes.
    pub fn with_default_operation(mut self, operation: OperationKind) -> Self {
        self.default_operation = operation;
        self
    }

    /// Rejects requests that did not arrive over HTTPS.
    ///
    /// Only [`evaluate_request`](Self::evaluate_request) can see the
    /// transport, so this has no effect on [`evaluate`](Self::evaluate).
    pub fn require_secure_transport(mut self, required: bool) -> Self {
        self.require_secure_transport = required;
        self
    }

    /// Returns the classifier used by this guard.
    pub fn classifier(&self) -> &FieldClassifier {
        &self.classifier
    }

    /// Returns the operation kind assumed by [`evaluate`](Self::evaluate).
    pub fn default_operation(&self) -> OperationKind {
        self.default_operation
    }

    /// Evaluates `method` and `fields` using the default operation kind.
    pub fn evaluate(&self, method: &str, fields: &[RequestField]) -> PolicyDecision {
        self.evaluate_operation(self.default_operation, method, fields)
    }

    /// Evaluates `method` and `fields` for an operation of the given kind.
    pub fn evaluate_operation(
        &self,
        operation: OperationKind,
        method: &str,
        fields: &[RequestField],
    ) -> PolicyDecision {
        let decision = self.check(operation, method, fields, false, None);
        log_decision(None, method, &decision);
        decision
    }

    /// Evaluates a full request, including the secure-transport check.
    pub fn evaluate_request<R>(&self, operation: OperationKind, request: &R) -> PolicyDecision
    where
        R: RequestSource + ?Sized,
    {
        let insecure = self.require_secure_transport && !request.is_secure();
        let redirect = if insecure {
            request.https_location()
        } else {
            None
        };
        let fields = request.fields();
        let decision = self.check(operation, request.method(), &fields, insecure, redirect);
        log_decision(Some(request.request_id()), request.method(), &decision);
        decision
    }

    fn check(
        &self,
        operation: OperationKind,
        method: &str,
        fields: &[RequestField],
        insecure_transport: bool,
        redirect_location: Option<String>,
    ) -> PolicyDecision {
        let registry = self.classifier.snapshot();

        let mut violating_fields = BTreeSet::new();
        let mut credential_exposed = false;
        let mut credential_outside_headers = false;

        for field in fields {
            let Some(category) = registry.classify(&field.name) else {
                continue;
            };
            if field.location == FieldLocation::QueryString {
                violating_fields.insert(field.name.clone());
                credential_exposed |= category.is_auth_related();
            }
            if field.location != FieldLocation::Header && category.is_auth_related() {
                credential_outside_headers = true;
            }
        }

        let method_ok = match method.parse::<HttpMethod>() {
            Ok(m) => {
                let state_ok =
                    operation == OperationKind::Read || m.allows_state_change();
                // Credentials only travel in a URL-only request via headers.
                let credential_ok = !(m.is_url_only() && credential_outside_headers);
                state_ok && credential_ok
            }
            Err(_) => false,
        };
        let rejected_method = (!method_ok).then(|| method.to_string());

        PolicyDecision::from_checks(
            violating_fields,
            credential_exposed,
            rejected_method,
            insecure_transport,
            redirect_location,
        )
    }
}

fn log_decision(request_id: Option<&str>, method: &str, decision: &PolicyDecision) {
    let request_id = request_id.unwrap_or("-");
    if decision.allowed {
        tracing::debug!(request_id, method, "request passed transport policy");
    } else {
        tracing::warn!(
            request_id,
            method,
            reason = %decision.reason,
            status = decision.status_code(),
            fields = ?decision.violating_fields,
            "request rejected by transport policy"
        );
    }
}
