use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What kind of sensitive data a field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Passwords, shared secrets
    Credential,
    /// Personally identifiable information (SSN, phone number, ...)
    Pii,
    /// Bearer tokens, API keys, session identifiers
    Token,
}

impl Category {
    /// Returns `true` for categories that authenticate the caller.
    ///
    /// Leaking one of these in a URL is treated as an authentication failure
    /// rather than a plain bad request.
    pub fn is_auth_related(self) -> bool {
        matches!(self, Category::Credential | Category::Token)
    }

    /// Lowercase name used in configuration and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Credential => "credential",
            Category::Pii => "pii",
            Category::Token => "token",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a rule recognises field names.
#[derive(Debug, Clone)]
pub enum FieldMatcher {
    /// Case-insensitive substring match; stored lowercased
    Substring(String),
    /// Case-insensitive regular expression
    Pattern(Regex),
}

impl FieldMatcher {
    /// `lowered` must already be lowercase.
    fn matches(&self, lowered: &str) -> bool {
        match self {
            FieldMatcher::Substring(needle) => lowered.contains(needle.as_str()),
            FieldMatcher::Pattern(re) => re.is_match(lowered),
        }
    }

    /// The pattern text as it was configured.
    pub fn as_str(&self) -> &str {
        match self {
            FieldMatcher::Substring(s) => s,
            FieldMatcher::Pattern(re) => re.as_str(),
        }
    }
}

/// One entry of the sensitive-field registry.
///
/// Rules are immutable once built. Construction validates the pattern, so a
/// rule that exists is always usable.
///
/// # Examples
///
/// ```
/// use transport_policy::{Category, SensitiveFieldRule};
///
/// let rule = SensitiveFieldRule::substring("password", Category::Credential).unwrap();
/// assert!(rule.matches("NewPassword"));
///
/// let rule = SensitiveFieldRule::regex(r"^api[_-]?key$", Category::Token).unwrap();
/// assert!(rule.matches("API_KEY"));
/// assert!(!rule.matches("api_keys_count"));
/// ```
#[derive(Debug, Clone)]
pub struct SensitiveFieldRule {
    matcher: FieldMatcher,
    category: Category,
}

impl SensitiveFieldRule {
    /// Builds a case-insensitive substring rule.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRule` if the pattern is empty or only
    /// whitespace, since it would match every field.
    pub fn substring(pattern: &str, category: Category) -> Result<Self, ConfigError> {
        let needle = pattern.trim().to_lowercase();
        if needle.is_empty() {
            return Err(ConfigError::InvalidRule {
                index: 0,
                reason: "substring pattern is empty".to_string(),
            });
        }
        Ok(Self {
            matcher: FieldMatcher::Substring(needle),
            category,
        })
    }

    /// Builds a case-insensitive regular-expression rule.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRule` if the expression is empty or does
    /// not compile.
    pub fn regex(pattern: &str, category: Category) -> Result<Self, ConfigError> {
        if pattern.trim().is_empty() {
            return Err(ConfigError::InvalidRule {
                index: 0,
                reason: "regex pattern is empty".to_string(),
            });
        }
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidRule {
                index: 0,
                reason: e.to_string(),
            })?;
        Ok(Self {
            matcher: FieldMatcher::Pattern(re),
            category,
        })
    }

    /// A rule matching every field name. Only used to fail closed.
    pub(crate) fn match_all(category: Category) -> Self {
        Self {
            matcher: FieldMatcher::Substring(String::new()),
            category,
        }
    }

    /// Returns the category assigned to matching fields.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the matcher.
    pub fn matcher(&self) -> &FieldMatcher {
        &self.matcher
    }

    /// Tests a field name against this rule, ignoring case.
    pub fn matches(&self, field_name: &str) -> bool {
        self.matches_lowered(&field_name.to_lowercase())
    }

    pub(crate) fn matches_lowered(&self, lowered: &str) -> bool {
        self.matcher.matches(lowered)
    }
}
