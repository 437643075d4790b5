//! Credential-transport and logging-safety policy for HTTP request intake.
//!
//! This crate enforces two defenses against CWE-598 (sensitive data in GET
//! query strings) and its logging counterpart:
//! - **Transport policy**: sensitive fields must arrive in the body or a
//!   header, never the URL, and state-changing operations must not use GET
//! - **Redaction**: audit records pass through a logger that replaces every
//!   sensitive value with a fixed mask before any sink sees it
//!
//! # Core Types
//!
//! - [`FieldClassifier`]: Decides whether a field name is sensitive, using an
//!   ordered [`RuleRegistry`] (first match wins)
//! - [`TransportPolicyGuard`]: Evaluates method and field locations into a
//!   [`PolicyDecision`]
//! - [`RedactingLogger`]: Masks an [`AuditRecord`] and forwards it to an
//!   [`AuditSink`]
//! - [`PolicyConfig`]: Loads rules and settings from YAML or JSON at startup
//! - [`web`]: Framework-neutral request intake and reference handlers
//!
//! # Examples
//!
//! ```
//! use transport_policy::{
//!     AuditRecord, FieldLocation, MemorySink, RedactingLogger, RequestField, RuleRegistry,
//!     SharedRegistry, TransportPolicyGuard,
//! };
//!
//! let registry = SharedRegistry::new(RuleRegistry::builtin());
//! let guard = TransportPolicyGuard::new(registry.clone());
//! let logger = RedactingLogger::new(registry, MemorySink::new());
//!
//! let decision = guard.evaluate(
//!     "POST",
//!     &[
//!         RequestField::new("username", FieldLocation::Body, "admin"),
//!         RequestField::new("password", FieldLocation::Body, "secret123"),
//!     ],
//! );
//! assert!(decision.allowed);
//!
//! logger
//!     .emit(AuditRecord::new().with("username", "admin").with("password", "secret123"))
//!     .unwrap();
//! assert_eq!(logger.sink().records()[0].get("password"), Some("***"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod classifier;
mod config;
mod error;
mod field;
mod guard;
mod http;
mod logging;
mod registry;
mod rule;
mod secret;
mod sink;
pub mod web;

pub use audit::{AuditRecord, RedactedRecord};
pub use classifier::FieldClassifier;
pub use config::{PolicyConfig, RuleSpec};
pub use error::{ConfigError, Error, Violation, ViolationKind};
pub use field::{FieldLocation, RequestField};
pub use guard::{DecisionReason, OperationKind, PolicyDecision, TransportPolicyGuard};
pub use http::{HttpMethod, UnknownMethod};
pub use logging::{RedactingLogger, TracingSink, DEFAULT_MASK};
pub use registry::{RuleRegistry, SharedRegistry};
pub use rule::{Category, FieldMatcher, SensitiveFieldRule};
pub use secret::Secret;
pub use sink::{AuditSink, JsonLineSink, MemorySink, SinkError, SinkErrorKind};
