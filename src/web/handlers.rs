//! Reference handlers for the three safe credential-transport patterns.
//!
//! Each handler follows the same order: transport guard first, then
//! endpoint-specific checks, then an audit line through the redacting
//! logger, then the business answer. Responses are framework-neutral
//! [`HandlerResponse`] values.
//!
//! **These handlers are for documentation and testing.** They compare
//! against fixed demo credentials and issue no tokens.

use serde_json::{json, Value};

use crate::audit::AuditRecord;
use crate::error::{Violation, ViolationKind};
use crate::guard::{OperationKind, PolicyDecision, TransportPolicyGuard};
use crate::http::HttpMethod;
use crate::logging::RedactingLogger;
use crate::secret::Secret;
use crate::sink::AuditSink;

use super::{bearer_token, IntakeRequest};

/// Status, JSON body and optional `Location` header for a handled request.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON response body
    pub body: Value,
    /// Redirect target, for 301 responses
    pub location: Option<String>,
}

impl HandlerResponse {
    fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body,
            location: None,
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "success": false, "message": message.into() }),
            location: None,
        }
    }

    /// Response for a rejected transport-policy decision.
    ///
    /// The body names the offending fields but never their values.
    pub fn from_decision(decision: &PolicyDecision) -> Self {
        let fields: Vec<&str> = decision.violating_fields.iter().map(String::as_str).collect();
        Self {
            status: decision.status_code(),
            body: json!({
                "success": false,
                "reason": decision.reason.as_str(),
                "fields": fields,
            }),
            location: decision.redirect_location().map(str::to_string),
        }
    }

    /// Response for a violation raised by intake or credential parsing.
    pub fn from_violation(violation: &Violation) -> Self {
        Self::error(violation.status_code(), violation.message.clone())
    }
}

/// Demo account the reference handlers authenticate against.
#[derive(Debug)]
pub struct DemoAccount {
    username: String,
    password: Secret<String>,
    api_token: Secret<String>,
}

impl DemoAccount {
    /// Creates an account.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password.into()),
            api_token: Secret::new(api_token.into()),
        }
    }
}

/// The login, API-data and user-update endpoints, wired to a guard and a
/// redacting logger.
///
/// # Examples
///
/// ```
/// use transport_policy::web::{DemoAccount, IntakeRequest, ReferenceApi};
/// use transport_policy::{MemorySink, RedactingLogger, RuleRegistry, TransportPolicyGuard};
///
/// let api = ReferenceApi::new(
///     TransportPolicyGuard::new(RuleRegistry::builtin()),
///     RedactingLogger::new(RuleRegistry::builtin(), MemorySink::new()),
///     DemoAccount::new("admin", "secret123", "api-token-1"),
/// );
///
/// // Credentials in the URL are refused before any login logic runs
/// let leaked = IntakeRequest::new("req-1", "GET").with_query_string("username=admin&password=secret123");
/// assert_eq!(api.handle_login(&leaked).status, 401);
///
/// let posted = IntakeRequest::new("req-2", "POST")
///     .with_header("Content-Type", "application/json")
///     .with_json_body(r#"{"username":"admin","password":"secret123"}"#)
///     .unwrap();
/// assert_eq!(api.handle_login(&posted).status, 200);
/// ```
#[derive(Debug)]
pub struct ReferenceApi<S> {
    guard: TransportPolicyGuard,
    logger: RedactingLogger<S>,
    account: DemoAccount,
}

impl<S: AuditSink> ReferenceApi<S> {
    /// Creates the endpoint set.
    pub fn new(guard: TransportPolicyGuard, logger: RedactingLogger<S>, account: DemoAccount) -> Self {
        Self {
            guard,
            logger,
            account,
        }
    }

    /// Returns the audit logger.
    pub fn logger(&self) -> &RedactingLogger<S> {
        &self.logger
    }

    /// `POST /api/login` with `username` and `password` in a JSON body.
    pub fn handle_login(&self, request: &IntakeRequest) -> HandlerResponse {
        let methods = [HttpMethod::Post];
        if let Err(response) = self.admit(OperationKind::StateChanging, request, &methods) {
            return response;
        }

        if !is_json(request) {
            return HandlerResponse::from_violation(&Violation::new(
                ViolationKind::UnsupportedMediaType,
                "Content-Type must be application/json",
            ));
        }

        let (Some(username), Some(password)) =
            (request.body_field("username"), request.body_field("password"))
        else {
            return HandlerResponse::error(400, "Username and password are required");
        };

        let record = AuditRecord::new()
            .with("event", "login")
            .with("request_id", request.request_id())
            .with("username", username)
            .with("password", password);
        if let Err(response) = self.audit(record) {
            return response;
        }

        if username == self.account.username && self.account.password.matches(&password.to_string()) {
            HandlerResponse::ok(json!({ "success": true, "message": "Login successful" }))
        } else {
            HandlerResponse::error(401, "Invalid credentials")
        }
    }

    /// `GET /api/data` authenticated with `Authorization: Bearer <token>`.
    pub fn handle_api_data(&self, request: &IntakeRequest) -> HandlerResponse {
        if let Err(response) = self.admit(OperationKind::Read, request, &[HttpMethod::Get]) {
            return response;
        }

        let token = match bearer_token(request) {
            Ok(token) => token,
            Err(violation) => return HandlerResponse::from_violation(&violation),
        };

        // The token itself never enters the record.
        let record = AuditRecord::new()
            .with("event", "api_data")
            .with("request_id", request.request_id())
            .with("auth", "bearer");
        if let Err(response) = self.audit(record) {
            return response;
        }

        if !self.account.api_token.matches(token.expose_secret()) {
            return HandlerResponse::error(401, "Invalid token");
        }
        HandlerResponse::ok(json!({ "data": "Sensitive API response", "status": "ok" }))
    }

    /// `PUT` or `POST /api/user/update` with profile fields in the body.
    pub fn handle_user_update(&self, request: &IntakeRequest) -> HandlerResponse {
        if let Err(response) = self.admit(
            OperationKind::StateChanging,
            request,
            &[HttpMethod::Put, HttpMethod::Post],
        ) {
            return response;
        }

        if request.body_len() == 0 {
            return HandlerResponse::error(400, "Invalid request body");
        }

        // Only the shape of the update is audited.
        let record = AuditRecord::new()
            .with("event", "user_update")
            .with("request_id", request.request_id())
            .with("field_count", request.body_len().to_string());
        if let Err(response) = self.audit(record) {
            return response;
        }

        HandlerResponse::ok(json!({ "success": true, "message": "User info updated" }))
    }

    /// Runs the transport guard, then checks the endpoint's own method list.
    fn admit(
        &self,
        operation: OperationKind,
        request: &IntakeRequest,
        methods: &[HttpMethod],
    ) -> Result<(), HandlerResponse> {
        let decision = self.guard.evaluate_request(operation, request);
        if !decision.allowed {
            return Err(HandlerResponse::from_decision(&decision));
        }

        let accepted = request
            .method()
            .parse::<HttpMethod>()
            .is_ok_and(|m| methods.contains(&m));
        if !accepted {
            let names: Vec<&str> = methods.iter().map(|m| m.as_str()).collect();
            return Err(HandlerResponse::error(
                405,
                format!("Method not allowed. Use {}.", names.join(" or ")),
            ));
        }
        Ok(())
    }

    fn audit(&self, record: AuditRecord) -> Result<(), HandlerResponse> {
        self.logger
            .emit(record)
            .map_err(|_| HandlerResponse::error(500, "Audit log unavailable"))
    }
}

/// `Content-Type: application/json`, parameters such as `charset` allowed.
fn is_json(request: &IntakeRequest) -> bool {
    request.header("Content-Type").is_some_and(|ct| {
        ct.trim_start()
            .get(..16)
            .is_some_and(|mime| mime.eq_ignore_ascii_case("application/json"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RuleRegistry;
    use crate::sink::MemorySink;
    use crate::web::Scheme;

    fn api() -> ReferenceApi<MemorySink> {
        ReferenceApi::new(
            TransportPolicyGuard::new(RuleRegistry::builtin()),
            RedactingLogger::new(RuleRegistry::builtin(), MemorySink::new()),
            DemoAccount::new("admin", "secret123", "tok-abcdef-123456"),
        )
    }

    fn login_body(user: &str, pass: &str) -> IntakeRequest {
        IntakeRequest::new("req-login", "POST")
            .with_header("Content-Type", "application/json")
            .with_json_body(&json!({ "username": user, "password": pass }).to_string())
            .unwrap()
    }

    #[test]
    fn login_via_query_string_is_refused_and_not_logged() {
        let api = api();
        let req = IntakeRequest::new("req-1", "GET")
            .with_query_string("username=admin&password=secret123");

        let resp = api.handle_login(&req);

        assert_eq!(resp.status, 401);
        assert_eq!(resp.body["reason"], "unsafe-method");
        assert_eq!(resp.body["fields"], json!(["password"]));
        assert!(!resp.body.to_string().contains("secret123"));
        assert!(api.logger().sink().is_empty());
    }

    #[test]
    fn login_via_body_succeeds_and_masks_password() {
        let api = api();
        let resp = api.handle_login(&login_body("admin", "secret123"));

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["success"], true);

        let records = api.logger().sink().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("username"), Some("admin"));
        assert_eq!(records[0].get("password"), Some("***"));
        assert_eq!(records[0].get("event"), Some("login"));
    }

    #[test]
    fn login_with_wrong_password() {
        let resp = api().handle_login(&login_body("admin", "nope"));
        assert_eq!(resp.status, 401);
        assert_eq!(resp.body["message"], "Invalid credentials");
    }

    #[test]
    fn login_requires_both_fields() {
        let req = IntakeRequest::new("r", "POST")
            .with_header("Content-Type", "application/json")
            .with_body_field("username", "admin");
        assert_eq!(api().handle_login(&req).status, 400);
    }

    #[test]
    fn login_with_form_body_is_unsupported_media_type() {
        let api = api();
        let req = IntakeRequest::new("r", "POST")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body_field("username", "admin")
            .with_body_field("password", "secret123");

        let resp = api.handle_login(&req);

        assert_eq!(resp.status, 415);
        assert_eq!(resp.body["message"], "Content-Type must be application/json");
        assert!(api.logger().sink().is_empty());
    }

    #[test]
    fn login_without_content_type_is_unsupported_media_type() {
        let req = IntakeRequest::new("r", "POST")
            .with_body_field("username", "admin")
            .with_body_field("password", "secret123");
        assert_eq!(api().handle_login(&req).status, 415);
    }

    #[test]
    fn login_accepts_json_with_charset() {
        let req = IntakeRequest::new("r", "POST")
            .with_header("content-type", "Application/JSON; charset=utf-8")
            .with_body_field("username", "admin")
            .with_body_field("password", "secret123");
        assert_eq!(api().handle_login(&req).status, 200);
    }

    #[test]
    fn login_rejects_put() {
        let req = IntakeRequest::new("r", "PUT")
            .with_body_field("username", "admin")
            .with_body_field("password", "secret123");
        let resp = api().handle_login(&req);
        assert_eq!(resp.status, 405);
    }

    #[test]
    fn api_data_with_bearer_header() {
        let api = api();
        let req = IntakeRequest::new("req-api", "GET")
            .with_header("Authorization", "Bearer tok-abcdef-123456");

        let resp = api.handle_api_data(&req);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["status"], "ok");

        let records = api.logger().sink().records();
        assert_eq!(records[0].get("auth"), Some("bearer"));
        assert!(!records[0].to_json().contains("tok-abcdef"));
    }

    #[test]
    fn api_data_keeps_token_out_of_audit_under_any_registry() {
        use crate::rule::{Category, SensitiveFieldRule};

        // This registry knows nothing about authorization headers.
        let registry = RuleRegistry::new(vec![
            SensitiveFieldRule::substring("password", Category::Credential).unwrap(),
        ])
        .unwrap();
        let api = ReferenceApi::new(
            TransportPolicyGuard::new(registry.clone()),
            RedactingLogger::new(registry, MemorySink::new()),
            DemoAccount::new("admin", "secret123", "tok-abcdef-123456"),
        );
        let req = IntakeRequest::new("req-api", "GET")
            .with_header("Authorization", "Bearer tok-abcdef-123456");

        assert_eq!(api.handle_api_data(&req).status, 200);
        let json = api.logger().sink().records()[0].to_json();
        assert!(!json.contains("tok-abcdef"));
    }

    #[test]
    fn api_data_with_token_in_query_is_refused() {
        let req = IntakeRequest::new("r", "GET").with_query_param("token", "tok-abcdef-123456");
        let resp = api().handle_api_data(&req);
        assert_eq!(resp.status, 401);
        assert_eq!(resp.body["fields"], json!(["token"]));
    }

    #[test]
    fn api_data_without_header() {
        let resp = api().handle_api_data(&IntakeRequest::new("r", "GET"));
        assert_eq!(resp.status, 401);
        assert_eq!(resp.body["message"], "Authorization header required");
    }

    #[test]
    fn api_data_with_wrong_token() {
        let req = IntakeRequest::new("r", "GET").with_header("Authorization", "Bearer other");
        assert_eq!(api().handle_api_data(&req).status, 401);
    }

    #[test]
    fn user_update_via_put() {
        let api = api();
        let req = IntakeRequest::new("req-upd", "PUT")
            .with_json_body(r#"{"ssn":"123-45-6789","phone":"010-1234-5678"}"#)
            .unwrap();

        let resp = api.handle_user_update(&req);
        assert_eq!(resp.status, 200);

        let records = api.logger().sink().records();
        assert_eq!(records[0].get("field_count"), Some("2"));
        assert!(!records[0].to_json().contains("123-45-6789"));
    }

    #[test]
    fn user_update_via_get_query_is_refused() {
        let req = IntakeRequest::new("r", "GET")
            .with_query_string("ssn=123-45-6789&phone=010-1234-5678");
        let resp = api().handle_user_update(&req);
        assert_eq!(resp.status, 405);
        assert_eq!(resp.body["reason"], "unsafe-method");
    }

    #[test]
    fn user_update_via_delete_is_refused_by_endpoint() {
        let req = IntakeRequest::new("r", "DELETE").with_body_field("nickname", "bob");
        assert_eq!(api().handle_user_update(&req).status, 405);
    }

    #[test]
    fn insecure_transport_redirects() {
        let api = ReferenceApi::new(
            TransportPolicyGuard::new(RuleRegistry::builtin()).require_secure_transport(true),
            RedactingLogger::new(RuleRegistry::builtin(), MemorySink::new()),
            DemoAccount::new("admin", "secret123", "t"),
        );

        let plain = login_body("admin", "secret123")
            .with_host("example.com")
            .with_path("/api/login");
        let resp = api.handle_login(&plain);
        assert_eq!(resp.status, 301);
        assert_eq!(resp.location.as_deref(), Some("https://example.com/api/login"));

        let secure = login_body("admin", "secret123").with_scheme(Scheme::Https);
        assert_eq!(api.handle_login(&secure).status, 200);
    }

    #[test]
    fn full_sink_fails_closed() {
        let api = ReferenceApi::new(
            TransportPolicyGuard::new(RuleRegistry::builtin()),
            RedactingLogger::new(RuleRegistry::builtin(), MemorySink::with_capacity_limit(0)),
            DemoAccount::new("admin", "secret123", "t"),
        );
        let resp = api.handle_login(&login_body("admin", "secret123"));
        assert_eq!(resp.status, 500);
    }

    #[test]
    fn malformed_body_response() {
        let violation = IntakeRequest::new("r", "POST").with_json_body("nope").unwrap_err();
        let resp = HandlerResponse::from_violation(&violation);
        assert_eq!(resp.status, 400);
    }
}
