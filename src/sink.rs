use std::fmt;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use crate::audit::RedactedRecord;

/// Error returned when an audit sink cannot accept a record.
///
/// # Examples
///
/// ```
/// use transport_policy::{SinkError, SinkErrorKind};
///
/// let error = SinkError::with_message(SinkErrorKind::Unavailable, "collector offline");
/// assert_eq!(error.kind(), SinkErrorKind::Unavailable);
/// assert_eq!(error.message(), Some("collector offline"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkError {
    kind: SinkErrorKind,
    message: Option<String>,
}

impl SinkError {
    /// Creates a new sink error with the specified kind.
    pub fn new(kind: SinkErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Creates a new sink error with a custom message.
    pub fn with_message(kind: SinkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> SinkErrorKind {
        self.kind
    }

    /// Returns the error message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(msg) = &self.message {
            write!(f, "sink error ({}): {}", self.kind, msg)
        } else {
            write!(f, "sink error ({})", self.kind)
        }
    }
}

impl std::error::Error for SinkError {}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        SinkError::with_message(SinkErrorKind::Io, e.to_string())
    }
}

/// Kind of sink error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkErrorKind {
    /// I/O error occurred while writing.
    Io,
    /// The sink is not reachable.
    Unavailable,
    /// Sink is full or has reached capacity.
    Full,
}

impl fmt::Display for SinkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Full => write!(f, "sink full"),
        }
    }
}

/// Destination for audit lines.
///
/// `write` accepts only [`RedactedRecord`], which cannot be constructed
/// outside this crate, so a sink can never be handed raw values.
///
/// Implementations must not retry by writing anything other than the record
/// they were given.
// The parameter type is the redaction bottleneck. Keep it `&RedactedRecord`.
pub trait AuditSink {
    /// Writes one redacted record.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the record could not be written.
    fn write(&self, record: &RedactedRecord) -> Result<(), SinkError>;
}

impl<S: AuditSink + ?Sized> AuditSink for &S {
    fn write(&self, record: &RedactedRecord) -> Result<(), SinkError> {
        (**self).write(record)
    }
}

impl<S: AuditSink + ?Sized> AuditSink for Box<S> {
    fn write(&self, record: &RedactedRecord) -> Result<(), SinkError> {
        (**self).write(record)
    }
}

impl<S: AuditSink + ?Sized> AuditSink for std::sync::Arc<S> {
    fn write(&self, record: &RedactedRecord) -> Result<(), SinkError> {
        (**self).write(record)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Writers append whole records, so the data is consistent even if a
    // previous holder panicked.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An in-memory sink that keeps every record it receives.
///
/// Thread-safe; useful in tests and as a staging point for batch shipping.
/// An optional capacity makes it return `SinkErrorKind::Full` once reached.
///
/// # Examples
///
/// ```
/// use transport_policy::{AuditRecord, MemorySink, RedactingLogger, RuleRegistry};
///
/// let logger = RedactingLogger::new(RuleRegistry::builtin(), MemorySink::new());
/// logger
///     .emit(AuditRecord::new().with("username", "admin").with("password", "secret123"))
///     .unwrap();
///
/// let records = logger.sink().records();
/// assert_eq!(records[0].get("password"), Some("***"));
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<RedactedRecord>>,
    capacity: Option<usize>,
}

impl MemorySink {
    /// Creates an unbounded sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that accepts at most `capacity` records.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            capacity: Some(capacity),
        }
    }

    /// Returns the number of records written.
    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        lock(&self.records).is_empty()
    }

    /// Returns a snapshot of the records written so far.
    pub fn records(&self) -> Vec<RedactedRecord> {
        lock(&self.records).clone()
    }

    /// Consumes the sink and returns its records.
    pub fn into_records(self) -> Vec<RedactedRecord> {
        self.records
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuditSink for MemorySink {
    fn write(&self, record: &RedactedRecord) -> Result<(), SinkError> {
        let mut records = lock(&self.records);
        if let Some(capacity) = self.capacity {
            if records.len() >= capacity {
                return Err(SinkError::with_message(
                    SinkErrorKind::Full,
                    format!("capacity of {} records reached", capacity),
                ));
            }
        }
        records.push(record.clone());
        Ok(())
    }
}

/// Writes each record as one JSON object per line to any `io::Write`.
///
/// # Examples
///
/// ```
/// use transport_policy::{AuditRecord, JsonLineSink, RedactingLogger, RuleRegistry};
///
/// let logger = RedactingLogger::new(RuleRegistry::builtin(), JsonLineSink::new(Vec::new()));
/// logger.emit(AuditRecord::new().with("token", "abcdef")).unwrap();
///
/// let out = String::from_utf8(logger.into_sink().into_inner()).unwrap();
/// assert_eq!(out, "{\"token\":\"***\"}\n");
/// ```
#[derive(Debug)]
pub struct JsonLineSink<W> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLineSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write> AuditSink for JsonLineSink<W> {
    fn write(&self, record: &RedactedRecord) -> Result<(), SinkError> {
        let mut line = record.to_json();
        line.push('\n');
        let mut writer = lock(&self.writer);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io;

    fn record(pairs: &[(&str, &str)]) -> RedactedRecord {
        let fields: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RedactedRecord::new_unchecked(fields)
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_error_display() {
        assert_eq!(
            SinkError::new(SinkErrorKind::Io).to_string(),
            "sink error (I/O error)"
        );
        assert_eq!(
            SinkError::with_message(SinkErrorKind::Full, "limit").to_string(),
            "sink error (sink full): limit"
        );
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.write(&record(&[("event", "a")])).unwrap();
        sink.write(&record(&[("event", "b")])).unwrap();

        assert_eq!(sink.len(), 2);
        let records = sink.into_records();
        assert_eq!(records[0].get("event"), Some("a"));
        assert_eq!(records[1].get("event"), Some("b"));
    }

    #[test]
    fn memory_sink_capacity() {
        let sink = MemorySink::with_capacity_limit(1);
        sink.write(&record(&[("n", "1")])).unwrap();

        let err = sink.write(&record(&[("n", "2")])).unwrap_err();
        assert_eq!(err.kind(), SinkErrorKind::Full);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn json_line_sink_writes_lines() {
        let sink = JsonLineSink::new(Vec::new());
        sink.write(&record(&[("a", "1")])).unwrap();
        sink.write(&record(&[("b", "2")])).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "{\"a\":\"1\"}\n{\"b\":\"2\"}\n");
    }

    #[test]
    fn json_line_sink_reports_io_errors() {
        let sink = JsonLineSink::new(BrokenWriter);
        let err = sink.write(&record(&[("a", "1")])).unwrap_err();
        assert_eq!(err.kind(), SinkErrorKind::Io);
        assert!(err.message().unwrap().contains("pipe closed"));
    }
}
