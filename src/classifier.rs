use std::sync::Arc;

use crate::registry::{RuleRegistry, SharedRegistry};
use crate::rule::Category;

/// Decides whether a request field is sensitive.
///
/// `FieldClassifier` is a cheap, cloneable view over a [`SharedRegistry`].
/// It holds no per-request state and is safe to share across threads.
///
/// # Examples
///
/// ```
/// use transport_policy::{Category, FieldClassifier, RuleRegistry};
///
/// let classifier = FieldClassifier::new(RuleRegistry::builtin());
///
/// assert_eq!(classifier.classify("password"), Some(Category::Credential));
/// assert_eq!(classifier.classify("page"), None);
/// ```
#[derive(Debug, Clone)]
pub struct FieldClassifier {
    registry: SharedRegistry,
}

impl FieldClassifier {
    /// Creates a classifier over a fixed registry.
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry: SharedRegistry::new(registry),
        }
    }

    /// Creates a classifier that follows a hot-swappable registry.
    pub fn shared(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Classifies a single field name against the current registry.
    pub fn classify(&self, field_name: &str) -> Option<Category> {
        self.registry.snapshot().classify(field_name)
    }

    /// Returns the registry snapshot to use for one whole request.
    ///
    /// Callers that classify several fields should take one snapshot so that
    /// every field is judged by the same rule set.
    pub fn snapshot(&self) -> Arc<RuleRegistry> {
        self.registry.snapshot()
    }

    /// Returns the underlying shared registry handle.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }
}

impl From<RuleRegistry> for FieldClassifier {
    fn from(registry: RuleRegistry) -> Self {
        Self::new(registry)
    }
}

impl From<SharedRegistry> for FieldClassifier {
    fn from(registry: SharedRegistry) -> Self {
        Self::shared(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::SensitiveFieldRule;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn classifier_is_thread_safe() {
        assert_send_sync::<FieldClassifier>();
    }

    #[test]
    fn classify_sample_fields() {
        let classifier = FieldClassifier::new(RuleRegistry::builtin());
        assert_eq!(classifier.classify("password"), Some(Category::Credential));
        assert_eq!(classifier.classify("PASSWORD"), Some(Category::Credential));
        assert_eq!(classifier.classify("token"), Some(Category::Token));
        assert_eq!(classifier.classify("ssn"), Some(Category::Pii));
        assert_eq!(classifier.classify("page"), None);
        assert_eq!(classifier.classify("username"), None);
        assert_eq!(classifier.classify(""), None);
    }

    #[test]
    fn classifier_follows_published_registry() {
        let shared = SharedRegistry::new(RuleRegistry::builtin());
        let classifier = FieldClassifier::shared(shared.clone());
        assert_eq!(classifier.classify("otp"), None);

        shared.publish(
            RuleRegistry::new(vec![
                SensitiveFieldRule::substring("otp", Category::Credential).unwrap(),
            ])
            .unwrap(),
        );

        assert_eq!(classifier.classify("otp"), Some(Category::Credential));
    }
}
