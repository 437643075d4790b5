//! Audit records before and after redaction.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Field name to raw value, built by a handler before logging.
///
/// An `AuditRecord` may hold raw secrets, so it cannot be handed to a sink
/// directly; it must go through [`RedactingLogger`](crate::RedactingLogger),
/// which produces a [`RedactedRecord`]. Its `Debug` output lists keys only.
///
/// # Examples
///
/// ```
/// use transport_policy::AuditRecord;
///
/// let record = AuditRecord::new()
///     .with("username", "admin")
///     .with("password", "secret123");
///
/// assert_eq!(record.len(), 2);
/// assert!(!format!("{:?}", record).contains("secret123"));
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuditRecord {
    fields: BTreeMap<String, String>,
}

impl AuditRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds or replaces a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Returns the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Iterates over field names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = (&String, &mut String)> {
        self.fields.iter_mut()
    }

    pub(crate) fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }
}

impl fmt::Debug for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditRecord")
            .field("keys", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for AuditRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// An audit record whose sensitive values have been masked.
///
/// Only [`RedactingLogger`](crate::RedactingLogger) can build one, which is
/// what lets [`AuditSink`](crate::AuditSink) accept this type and nothing
/// else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RedactedRecord {
    fields: BTreeMap<String, String>,
}

impl RedactedRecord {
    pub(crate) fn new_unchecked(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    /// Returns the (possibly masked) value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders the record as a compact JSON object.
    pub fn to_json(&self) -> String {
        // A map of strings always serializes.
        serde_json::to_string(&self.fields).unwrap_or_default()
    }

    /// Converts back into an [`AuditRecord`], e.g. to redact it again.
    pub fn into_record(self) -> AuditRecord {
        AuditRecord {
            fields: self.fields,
        }
    }
}
