//! Startup configuration: the sensitive-field registry and guard settings.
//!
//! Configuration is read once, validated completely, and then turned into
//! immutable runtime objects. Any problem is a [`ConfigError`] and the
//! process should refuse to start.
//!
//! ```yaml
//! mask: "***"
//! default_operation: read
//! require_secure_transport: true
//! rules:
//!   - pattern: password
//!     category: credential
//!   - regex: "api[_-]?key"
//!     category: token
//!   - pattern: phone
//!     category: pii
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::classifier::FieldClassifier;
use crate::error::ConfigError;
use crate::guard::{OperationKind, TransportPolicyGuard};
use crate::logging::{RedactingLogger, DEFAULT_MASK};
use crate::registry::{RuleRegistry, SharedRegistry, BUILTIN_RULES};
use crate::rule::{Category, SensitiveFieldRule};
use crate::sink::AuditSink;

/// One configured rule: exactly one of `pattern` or `regex`, plus a category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Case-insensitive substring
    #[serde(default)]
    pub pattern: Option<String>,
    /// Case-insensitive regular expression
    #[serde(default)]
    pub regex: Option<String>,
    /// Category assigned to matching fields
    pub category: Category,
}

impl RuleSpec {
    fn compile(&self, index: usize) -> Result<SensitiveFieldRule, ConfigError> {
        let rule = match (&self.pattern, &self.regex) {
            (Some(p), None) => SensitiveFieldRule::substring(p, self.category),
            (None, Some(r)) => SensitiveFieldRule::regex(r, self.category),
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidRule {
                    index,
                    reason: "set either 'pattern' or 'regex', not both".to_string(),
                });
            }
            (None, None) => {
                return Err(ConfigError::InvalidRule {
                    index,
                    reason: "missing 'pattern' or 'regex'".to_string(),
                });
            }
        };
        rule.map_err(|e| match e {
            ConfigError::InvalidRule { reason, .. } => ConfigError::InvalidRule { index, reason },
            other => other,
        })
    }
}

/// Policy settings as loaded from YAML or JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Ordered sensitive-field rules; required and non-empty
    #[serde(default)]
    pub rules: Option<Vec<RuleSpec>>,
    /// Redaction mask; defaults to `***`
    #[serde(default)]
    pub mask: Option<String>,
    /// Operation kind assumed when a route does not say
    #[serde(default)]
    pub default_operation: OperationKind,
    /// Reject plain-HTTP requests
    #[serde(default)]
    pub require_secure_transport: bool,
}

impl PolicyConfig {
    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed YAML, unknown keys or
    /// unknown categories.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON, unknown keys or
    /// unknown categories.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads a `.yaml`, `.yml` or `.json` file.
    ///
    /// The file is validated in full, rules included, before returning.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read,
    /// `ConfigError::UnsupportedFormat` for other extensions, and any error
    /// from parsing or [`validate`](Self::validate).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: shown.clone(),
            message: e.to_string(),
        })?;

        let config = match ext.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text)?,
            Some("json") => Self::from_json_str(&text)?,
            _ => return Err(ConfigError::UnsupportedFormat(shown)),
        };
        config.validate()?;

        tracing::info!(
            path = %shown,
            rules = config.rules.as_ref().map_or(0, Vec::len),
            "loaded transport policy configuration"
        );
        Ok(config)
    }

    /// The configuration equivalent to [`RuleRegistry::builtin`].
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|&(text, is_regex, category)| RuleSpec {
                pattern: (!is_regex).then(|| text.to_string()),
                regex: is_regex.then(|| text.to_string()),
                category,
            })
            .collect();
        Self {
            rules: Some(rules),
            mask: None,
            default_operation: OperationKind::Read,
            require_secure_transport: false,
        }
    }

    /// Checks every rule and the mask without building anything.
    ///
    /// # Errors
    ///
    /// See [`registry`](Self::registry) and [`mask`](Self::mask).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry()?;
        self.mask()?;
        Ok(())
    }

    /// Compiles the rules into a registry, in order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRegistry` if `rules` is absent or empty,
    /// or `ConfigError::InvalidRule` for the first rule that does not compile.
    pub fn registry(&self) -> Result<RuleRegistry, ConfigError> {
        let specs = self.rules.as_deref().unwrap_or_default();
        let rules = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| spec.compile(index))
            .collect::<Result<Vec<_>, _>>()?;
        RuleRegistry::new(rules)
    }

    /// Returns the configured mask or [`DEFAULT_MASK`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMask` if the mask is set but empty.
    pub fn mask(&self) -> Result<&str, ConfigError> {
        match self.mask.as_deref() {
            Some("") => Err(ConfigError::InvalidMask),
            Some(mask) => Ok(mask),
            None => Ok(DEFAULT_MASK),
        }
    }

    /// Builds a hot-swappable registry handle.
    ///
    /// # Errors
    ///
    /// See [`registry`](Self::registry).
    pub fn shared_registry(&self) -> Result<SharedRegistry, ConfigError> {
        self.registry().map(SharedRegistry::new)
    }

    /// Builds a guard over `registry` with this configuration's settings.
    pub fn guard(&self, registry: SharedRegistry) -> TransportPolicyGuard {
        TransportPolicyGuard::new(FieldClassifier::shared(registry))
            .with_default_operation(self.default_operation)
            .require_secure_transport(self.require_secure_transport)
    }

    /// Builds a redacting logger over `registry` writing to `sink`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMask` if the mask is set but empty.
    pub fn logger<S: AuditSink>(
        &self,
        registry: SharedRegistry,
        sink: S,
    ) -> Result<RedactingLogger<S>, ConfigError> {
        RedactingLogger::new(FieldClassifier::shared(registry), sink).with_mask(self.mask()?)
    }
}
