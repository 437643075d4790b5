//! Property tests for classification, transport decisions and redaction.
//!
//! These check invariants that must hold for any field name, location and
//! value, not just the fixed scenarios in the integration tests.

use std::collections::BTreeSet;

use proptest::prelude::*;
use transport_policy::{
    AuditRecord, Category, FieldLocation, MemorySink, OperationKind, RedactingLogger,
    RequestField, RuleRegistry, TransportPolicyGuard, DEFAULT_MASK,
};

fn arb_location() -> impl Strategy<Value = FieldLocation> {
    prop_oneof![
        Just(FieldLocation::QueryString),
        Just(FieldLocation::Header),
        Just(FieldLocation::Body),
    ]
}

fn arb_sensitive_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("password"),
        Just("user_passwd"),
        Just("client_secret"),
        Just("access_token"),
        Just("api-key"),
        Just("Authorization"),
        Just("ssn"),
        Just("userSSN"),
        Just("ssnNumber"),
        Just("customerSsn"),
        Just("mobile_phone"),
    ]
}

// Names like `x123` never hit a builtin rule.
fn arb_plain_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("x[0-9]{1,6}").unwrap()
}

fn arb_field() -> impl Strategy<Value = RequestField> {
    (
        prop_oneof![
            arb_sensitive_name().prop_map(str::to_string),
            arb_plain_name(),
            prop::string::string_regex("[a-z_]{1,12}").unwrap(),
        ],
        arb_location(),
        prop::string::string_regex("[a-zA-Z0-9]{0,16}").unwrap(),
    )
        .prop_map(|(name, location, value)| RequestField::new(name, location, value))
}

fn arb_method() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("GET"),
        Just("HEAD"),
        Just("OPTIONS"),
        Just("POST"),
        Just("PUT"),
        Just("PATCH"),
        Just("DELETE"),
        Just("get"),
        Just("BREW"),
    ]
}

proptest! {
    /// Property: classification ignores ASCII case
    #[test]
    fn proptest_classify_is_case_insensitive(name in "[a-zA-Z_-]{0,20}") {
        let registry = RuleRegistry::builtin();
        prop_assert_eq!(
            registry.classify(&name),
            registry.classify(&name.to_ascii_uppercase())
        );
    }

    /// Property: any name containing "password" is a credential, whatever
    /// surrounds it
    #[test]
    fn proptest_password_anywhere_is_credential(
        prefix in "[a-z_]{0,8}",
        suffix in "[a-z_]{0,8}",
    ) {
        let name = format!("{prefix}password{suffix}");
        prop_assert_eq!(RuleRegistry::builtin().classify(&name), Some(Category::Credential));
    }

    /// Property: the violating set is exactly the sensitive fields that
    /// arrived in the query string
    #[test]
    fn proptest_violations_are_sensitive_query_fields(
        fields in prop::collection::vec(arb_field(), 0..8),
        method in arb_method(),
    ) {
        let registry = RuleRegistry::builtin();
        let expected: BTreeSet<String> = fields
            .iter()
            .filter(|f| f.location == FieldLocation::QueryString)
            .filter(|f| registry.classify(&f.name).is_some())
            .map(|f| f.name.clone())
            .collect();

        let decision = TransportPolicyGuard::new(registry).evaluate(method, &fields);

        prop_assert_eq!(&decision.violating_fields, &expected);
        if decision.allowed {
            prop_assert!(decision.violating_fields.is_empty());
            prop_assert_eq!(decision.status_code(), 200);
        } else {
            prop_assert_ne!(decision.status_code(), 200);
        }
    }

    /// Property: a state-changing operation over GET is always refused,
    /// whatever its fields
    #[test]
    fn proptest_state_changing_get_is_refused(
        fields in prop::collection::vec(arb_field(), 0..8),
    ) {
        let guard = TransportPolicyGuard::new(RuleRegistry::builtin());
        let decision = guard.evaluate_operation(OperationKind::StateChanging, "GET", &fields);

        prop_assert!(!decision.allowed);
        prop_assert_eq!(decision.reason.as_str(), "unsafe-method");
    }

    /// Property: decisions never carry field values
    #[test]
    fn proptest_decision_debug_has_no_values(
        name in arb_sensitive_name(),
        value in "v[a-z0-9]{12}",
    ) {
        let guard = TransportPolicyGuard::new(RuleRegistry::builtin());
        let fields = [RequestField::new(name, FieldLocation::QueryString, value.clone())];
        let decision = guard.evaluate("GET", &fields);

        let decision_dbg = format!("{decision:?}");
        let field_dbg = format!("{:?}", fields[0]);
        prop_assert!(!decision_dbg.contains(&value));
        prop_assert!(!field_dbg.contains(&value));
    }

    /// Property: sensitive values never reach the sink; other values pass
    /// through untouched
    #[test]
    fn proptest_emit_never_forwards_sensitive_values(
        sensitive in prop::collection::btree_map(arb_sensitive_name(), "s[a-z0-9]{8,16}", 1..4),
        plain in prop::collection::btree_map(arb_plain_name(), "[a-z0-9 ]{0,16}", 0..4),
    ) {
        let logger = RedactingLogger::new(RuleRegistry::builtin(), MemorySink::new());
        let record: AuditRecord = sensitive
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .chain(plain.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect();

        prop_assert!(logger.emit(record).is_ok());

        let records = logger.into_sink().into_records();
        prop_assert_eq!(records.len(), 1);
        let written = &records[0];
        let json = written.to_json();

        for (key, value) in &sensitive {
            prop_assert_eq!(written.get(key), Some(DEFAULT_MASK));
            prop_assert!(!json.contains(value.as_str()));
        }
        for (key, value) in &plain {
            prop_assert_eq!(written.get(key), Some(value.as_str()));
        }
    }

    /// Property: redacting an already-redacted record changes nothing
    #[test]
    fn proptest_redaction_is_idempotent(
        entries in prop::collection::vec(
            (
                prop_oneof![arb_sensitive_name().prop_map(str::to_string), arb_plain_name()],
                "[a-zA-Z0-9*]{0,12}",
            ),
            0..6,
        ),
    ) {
        let logger = RedactingLogger::new(RuleRegistry::builtin(), MemorySink::new());
        let once = logger.redact(entries.into_iter().collect());
        let twice = logger.redact(once.clone().into_record());

        prop_assert_eq!(once, twice);
    }
}
