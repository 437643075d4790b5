use std::fmt;

use crate::sink::SinkError;

/// Errors that can occur in the transport policy crate.
#[derive(Debug)]
pub enum Error {
    /// The rule registry or policy configuration could not be loaded
    Config(ConfigError),
    /// A request broke the transport policy
    Violation(Violation),
    /// The audit sink rejected a redacted record
    Sink(SinkError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Violation(v) => write!(f, "Policy violation: {}", v),
            Error::Sink(e) => write!(f, "Audit sink failure: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Violation(v) => Some(v),
            Error::Sink(e) => Some(e),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<Violation> for Error {
    fn from(v: Violation) -> Self {
        Error::Violation(v)
    }
}

impl From<SinkError> for Error {
    fn from(e: SinkError) -> Self {
        Error::Sink(e)
    }
}

/// A fatal problem with the sensitive-field registry or policy settings.
///
/// Configuration errors are raised while loading, before any request is
/// evaluated. A process that gets one of these must not start serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read
    Io {
        /// Path that failed to load
        path: String,
        /// Underlying I/O message
        message: String,
    },
    /// The configuration document is not valid YAML/JSON for this schema
    Parse(String),
    /// The configuration file extension is neither YAML nor JSON
    UnsupportedFormat(String),
    /// No rules were configured
    MissingRegistry,
    /// A single rule could not be compiled
    InvalidRule {
        /// Zero-based position of the rule in the registry
        index: usize,
        /// What was wrong with it
        reason: String,
    },
    /// The redaction mask is empty
    InvalidMask,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "cannot read '{}': {}", path, message),
            ConfigError::Parse(msg) => write!(f, "malformed policy configuration: {}", msg),
            ConfigError::UnsupportedFormat(path) => {
                write!(f, "'{}' is not a .yaml, .yml or .json file", path)
            }
            ConfigError::MissingRegistry => {
                write!(f, "no sensitive field rules configured")
            }
            ConfigError::InvalidRule { index, reason } => {
                write!(f, "rule #{} is invalid: {}", index, reason)
            }
            ConfigError::InvalidMask => write!(f, "redaction mask must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A policy violation with details about what failed.
///
/// Violations are ordinary values: handlers turn them into HTTP error
/// responses with [`Violation::status_code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The kind of violation that occurred
    pub kind: ViolationKind,
    /// Human-readable message explaining the violation
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// HTTP status a handler should answer with.
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Violation {}

/// The kind of policy violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// Sensitive fields were sent in the URL query string
    SensitiveQueryField {
        /// Offending field names, sorted
        fields: Vec<String>,
        /// Whether any of them is a credential or token
        credential: bool,
    },
    /// The HTTP method is not acceptable for this operation
    UnsafeMethod {
        /// The method that was used
        method: String,
    },
    /// The request did not arrive over HTTPS
    InsecureTransport {
        /// Where the client should retry, if known
        redirect: Option<String>,
    },
    /// The request body could not be understood
    MalformedBody,
    /// The body was sent with a media type the endpoint does not accept
    UnsupportedMediaType,
    /// A required credential was not supplied
    MissingCredentials,
    /// A credential was supplied in the wrong form or did not match
    InvalidCredentials,
}

impl ViolationKind {
    /// HTTP status for this kind of violation.
    pub fn status_code(&self) -> u16 {
        match self {
            ViolationKind::SensitiveQueryField { credential: true, .. } => 401,
            ViolationKind::SensitiveQueryField { .. } => 400,
            ViolationKind::UnsafeMethod { .. } => 405,
            ViolationKind::InsecureTransport { .. } => 301,
            ViolationKind::MalformedBody => 400,
            ViolationKind::UnsupportedMediaType => 415,
            ViolationKind::MissingCredentials | ViolationKind::InvalidCredentials => 401,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::SensitiveQueryField { fields, .. } => {
                write!(f, "Sensitive query fields [{}]", fields.join(", "))
            }
            ViolationKind::UnsafeMethod { method } => write!(f, "Unsafe method '{}'", method),
            ViolationKind::InsecureTransport { .. } => write!(f, "Insecure transport"),
            ViolationKind::MalformedBody => write!(f, "Malformed body"),
            ViolationKind::UnsupportedMediaType => write!(f, "Unsupported media type"),
            ViolationKind::MissingCredentials => write!(f, "Missing credentials"),
            ViolationKind::InvalidCredentials => write!(f, "Invalid credentials"),
        }
    }
}
