use crate::audit::{AuditRecord, RedactedRecord};
use crate::classifier::FieldClassifier;
use crate::error::ConfigError;
use crate::sink::{AuditSink, SinkError};

/// Placeholder written in place of every sensitive value.
pub const DEFAULT_MASK: &str = "***";

/// Masks sensitive fields of an audit record, then forwards it to a sink.
///
/// The mask is a constant; it never depends on the value it replaces, so no
/// prefix, length or other fragment of a secret reaches the log.
///
/// `RedactingLogger` holds no per-request state. Share one instance (behind
/// `Arc` if needed) across all handlers.
///
/// # Examples
///
/// ```
/// use transport_policy::{AuditRecord, MemorySink, RedactingLogger, RuleRegistry};
///
/// let logger = RedactingLogger::new(RuleRegistry::builtin(), MemorySink::new());
///
/// logger
///     .emit(AuditRecord::new().with("username", "admin").with("password", "secret123"))
///     .unwrap();
///
/// let sent = &logger.sink().records()[0];
/// assert_eq!(sent.get("username"), Some("admin"));
/// assert_eq!(sent.get("password"), Some("***"));
/// ```
#[derive(Debug)]
pub struct RedactingLogger<S> {
    classifier: FieldClassifier,
    sink: S,
    mask: String,
}

impl<S: AuditSink> RedactingLogger<S> {
    /// Creates a logger using [`DEFAULT_MASK`].
    pub fn new(classifier: impl Into<FieldClassifier>, sink: S) -> Self {
        Self {
            classifier: classifier.into(),
            sink,
            mask: DEFAULT_MASK.to_string(),
        }
    }

    /// Replaces the mask token.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMask` if `mask` is empty.
    pub fn with_mask(mut self, mask: impl Into<String>) -> Result<Self, ConfigError> {
        let mask = mask.into();
        if mask.is_empty() {
            return Err(ConfigError::InvalidMask);
        }
        self.mask = mask;
        Ok(self)
    }

    /// Returns the mask token.
    pub fn mask(&self) -> &str {
        &self.mask
    }

    /// Returns the wrapped sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the logger and returns its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Masks every sensitive field of `record` without writing it anywhere.
    ///
    /// All keys are judged against a single registry snapshot. Applying this
    /// to an already redacted record yields the same record.
    pub fn redact(&self, mut record: AuditRecord) -> RedactedRecord {
        let registry = self.classifier.snapshot();
        for (key, value) in record.values_mut() {
            if registry.classify(key).is_some() {
                value.clear();
                value.push_str(&self.mask);
            }
        }
        RedactedRecord::new_unchecked(record.into_fields())
    }

    /// Redacts `record` and writes it to the sink exactly once.
    ///
    /// # Errors
    ///
    /// Propagates the sink's `SinkError`. Redaction has already happened by
    /// then and nothing is retried, so a failure never leaks raw values.
    pub fn emit(&self, record: AuditRecord) -> Result<(), SinkError> {
        let redacted = self.redact(record);
        self.sink.write(&redacted).inspect_err(|e| {
            tracing::error!(error = %e, fields = redacted.len(), "audit sink rejected record");
        })
    }
}

/// Sink that emits each record as a `tracing` event at INFO level.
///
/// The record is attached as a JSON string in the `audit` field, under the
/// `audit` target, so subscribers can route it separately.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Creates a tracing sink.
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingSink {
    fn write(&self, record: &RedactedRecord) -> Result<(), SinkError> {
        tracing::info!(target: "audit", audit = %record.to_json(), "audit record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RuleRegistry;
    use crate::sink::{MemorySink, SinkErrorKind};
    use std::cell::Cell;

    fn logger() -> RedactingLogger<MemorySink> {
        RedactingLogger::new(RuleRegistry::builtin(), MemorySink::new())
    }

    struct DownSink {
        calls: Cell<usize>,
    }

    impl AuditSink for DownSink {
        fn write(&self, _record: &RedactedRecord) -> Result<(), SinkError> {
            self.calls.set(self.calls.get() + 1);
            Err(SinkError::new(SinkErrorKind::Unavailable))
        }
    }

    #[test]
    fn sensitive_values_are_masked() {
        let logger = logger();
        logger
            .emit(
                AuditRecord::new()
                    .with("username", "admin")
                    .with("password", "secret123"),
            )
            .unwrap();

        let records = logger.sink().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("username"), Some("admin"));
        assert_eq!(records[0].get("password"), Some("***"));
    }

    #[test]
    fn mask_never_reveals_a_prefix() {
        let logger = logger();
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let redacted = logger.redact(AuditRecord::new().with("token", token));

        let value = redacted.get("token").unwrap();
        assert_eq!(value, "***");
        assert!(!token.starts_with(value));
    }

    #[test]
    fn redaction_is_idempotent() {
        let logger = logger();
        let once = logger.redact(
            AuditRecord::new()
                .with("ssn", "123-45-6789")
                .with("event", "update"),
        );
        let twice = logger.redact(once.clone().into_record());
        assert_eq!(once, twice);
    }

    #[test]
    fn custom_mask() {
        let logger = logger().with_mask("[MASKED]").unwrap();
        assert_eq!(logger.mask(), "[MASKED]");
        let redacted = logger.redact(AuditRecord::new().with("apiKey", "k"));
        assert_eq!(redacted.get("apiKey"), Some("[MASKED]"));
    }

    #[test]
    fn empty_mask_is_rejected() {
        let err = logger().with_mask("").unwrap_err();
        assert_eq!(err, ConfigError::InvalidMask);
    }

    #[test]
    fn sink_failure_is_propagated_once() {
        let logger = RedactingLogger::new(
            RuleRegistry::builtin(),
            DownSink {
                calls: Cell::new(0),
            },
        );

        let err = logger
            .emit(AuditRecord::new().with("password", "hunter2"))
            .unwrap_err();

        assert_eq!(err.kind(), SinkErrorKind::Unavailable);
        assert_eq!(logger.sink().calls.get(), 1);
    }

    #[test]
    fn tracing_sink_accepts_records() {
        let logger = RedactingLogger::new(RuleRegistry::builtin(), TracingSink::new());
        assert!(logger
            .emit(AuditRecord::new().with("phone", "010-1234-5678"))
            .is_ok());
    }
}
