//! The ordered sensitive-field rule registry and its hot-swappable handle.

use std::sync::{Arc, RwLock};

use crate::error::ConfigError;
use crate::rule::{Category, SensitiveFieldRule};

/// `(pattern, is_regex, category)` for the built-in registry, in priority order.
pub(crate) const BUILTIN_RULES: [(&str, bool, Category); 8] = [
    ("password", false, Category::Credential),
    ("passwd", false, Category::Credential),
    ("secret", false, Category::Credential),
    ("token", false, Category::Token),
    (r"api[_-]?key", true, Category::Token),
    ("authorization", false, Category::Token),
    // Names are lowercased before matching, so camelCase boundaries are gone
    // and either side of a separator is enough.
    (r"(^|[^a-z])ssn|ssn($|[^a-z])", true, Category::Pii),
    ("phone", false, Category::Pii),
];

/// An immutable, ordered list of sensitive-field rules.
///
/// Rules are evaluated in insertion order and the first match wins. A
/// registry is never empty: a policy with nothing to protect is treated as a
/// configuration mistake.
///
/// # Examples
///
/// ```
/// use transport_policy::{Category, RuleRegistry, SensitiveFieldRule};
///
/// let registry = RuleRegistry::new(vec![
///     SensitiveFieldRule::substring("password", Category::Credential).unwrap(),
///     SensitiveFieldRule::substring("pass", Category::Pii).unwrap(),
/// ])
/// .unwrap();
///
/// // First match wins
/// assert_eq!(registry.classify("password"), Some(Category::Credential));
/// assert_eq!(registry.classify("passport"), Some(Category::Pii));
/// assert_eq!(registry.classify("page"), None);
/// ```
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<SensitiveFieldRule>,
}

impl RuleRegistry {
    /// Creates a registry from rules in priority order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRegistry` if `rules` is empty.
    pub fn new(rules: Vec<SensitiveFieldRule>) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            return Err(ConfigError::MissingRegistry);
        }
        Ok(Self { rules })
    }

    /// Credential, token and PII rules covering common login, API and profile
    /// field names.
    ///
    /// If a builtin rule ever failed to build, the registry falls back to a
    /// single rule treating every field as a credential, so nothing is let
    /// through unclassified.
    pub fn builtin() -> Self {
        match Self::try_builtin() {
            Ok(registry) => registry,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "builtin rules failed to build; classifying every field"
                );
                Self {
                    rules: vec![SensitiveFieldRule::match_all(Category::Credential)],
                }
            }
        }
    }

    /// Builds the builtin rules, reporting the first one that fails.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRule` with the index of the failing rule.
    pub fn try_builtin() -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(BUILTIN_RULES.len());
        for (index, &(pattern, is_regex, category)) in BUILTIN_RULES.iter().enumerate() {
            let rule = if is_regex {
                SensitiveFieldRule::regex(pattern, category)
            } else {
                SensitiveFieldRule::substring(pattern, category)
            };
            match rule {
                Ok(rule) => rules.push(rule),
                Err(ConfigError::InvalidRule { reason, .. }) => {
                    return Err(ConfigError::InvalidRule { index, reason });
                }
                Err(other) => return Err(other),
            }
        }
        Self::new(rules)
    }

    /// Returns the category of the first rule matching `field_name`.
    pub fn classify(&self, field_name: &str) -> Option<Category> {
        self.matching_rule(field_name).map(SensitiveFieldRule::category)
    }

    /// Returns the first rule matching `field_name`.
    pub fn matching_rule(&self, field_name: &str) -> Option<&SensitiveFieldRule> {
        let lowered = field_name.to_lowercase();
        self.rules.iter().find(|rule| rule.matches_lowered(&lowered))
    }

    /// Returns the rules in evaluation order.
    pub fn rules(&self) -> &[SensitiveFieldRule] {
        &self.rules
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always `false`; an empty registry cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A shared handle to the current registry snapshot.
///
/// Readers take a snapshot (an `Arc<RuleRegistry>`) and work against it for
/// the whole request. [`publish`](Self::publish) swaps in a complete new
/// registry, so a reader sees either the old rules or the new ones, never a
/// mix. Clones share the same slot.
///
/// # Examples
///
/// ```
/// use transport_policy::{Category, RuleRegistry, SensitiveFieldRule, SharedRegistry};
///
/// let shared = SharedRegistry::new(RuleRegistry::builtin());
/// let before = shared.snapshot();
///
/// shared.publish(
///     RuleRegistry::new(vec![SensitiveFieldRule::substring("pin", Category::Credential).unwrap()])
///         .unwrap(),
/// );
///
/// assert_eq!(before.classify("pin_code"), None);
/// assert_eq!(shared.snapshot().classify("pin_code"), Some(Category::Credential));
/// ```
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    current: Arc<RwLock<Arc<RuleRegistry>>>,
}

impl SharedRegistry {
    /// Wraps an initial registry.
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// Returns the registry currently in effect.
    pub fn snapshot(&self) -> Arc<RuleRegistry> {
        // The slot only ever holds a complete Arc, so a poisoned lock still
        // guards a consistent value.
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Atomically replaces the registry for all subsequent snapshots.
    pub fn publish(&self, registry: RuleRegistry) {
        let next = Arc::new(registry);
        let rules = next.len();
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        tracing::info!(rules, "published sensitive field registry");
    }
}

impl From<RuleRegistry> for SharedRegistry {
    fn from(registry: RuleRegistry) -> Self {
        Self::new(registry)
    }
}
