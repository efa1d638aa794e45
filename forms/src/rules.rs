//! Validation rules, field values, and named custom validators.
//!
//! A rule is attached to an element id, never embedded in the element. The
//! engine in [`crate::form_data`] evaluates rules against the current
//! [`FieldValue`] of each field; this module only knows how a single rule
//! judges a single value.
//!
//! `custom` rules cannot carry a closure through serialization, so they name
//! a predicate registered in a [`ValidatorRegistry`] instead. A missing or
//! unknown name passes.

#[cfg(test)]
#[path = "rules_test.rs"]
mod rules_test;

use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::doc::ElementKind;

// =============================================================================
// VALUES
// =============================================================================

/// Current scalar value of one field.
///
/// Text fields and dropdowns hold `Text`, checkboxes hold `Bool`, signature
/// fields hold `Text` (the encoded image) or `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Null,
}

impl FieldValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(s: Option<String>) -> Self {
        s.map_or(Self::Null, Self::Text)
    }
}

// =============================================================================
// RULES
// =============================================================================

/// The kind of a validation rule, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Required,
    MinLength,
    MaxLength,
    Pattern,
    Custom,
}

impl RuleKind {
    /// Rule kinds offered in the rule editor for an element kind. The engine
    /// does not enforce this; any rule attached to any field is evaluated.
    #[must_use]
    pub fn available_for(kind: ElementKind) -> &'static [RuleKind] {
        match kind {
            ElementKind::TextField => &[Self::Required, Self::MinLength, Self::MaxLength, Self::Pattern],
            ElementKind::Checkbox | ElementKind::Dropdown | ElementKind::SignatureField => &[Self::Required],
        }
    }

    /// A rule of this kind with the editor's starting message and parameter.
    #[must_use]
    pub fn default_rule(self) -> ValidationRule {
        match self {
            Self::Required => ValidationRule::Required { message: "This field is required".into() },
            Self::MinLength => ValidationRule::MinLength {
                message: "This field must be at least {value} characters".into(),
                value: 3,
            },
            Self::MaxLength => ValidationRule::MaxLength {
                message: "This field must be at most {value} characters".into(),
                value: 50,
            },
            Self::Pattern => {
                ValidationRule::Pattern { message: "This field must match the pattern".into(), value: ".*".into() }
            }
            Self::Custom => ValidationRule::Custom { message: "This field is invalid".into(), validator: None },
        }
    }
}

/// One constraint on a field value.
///
/// `message` is shown verbatim when the rule fails. A `{value}` placeholder in
/// a length message is for display code to fill in; it is not substituted
/// here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValidationRule {
    /// Fails on a missing value, `null`, or the empty string.
    Required { message: String },
    /// Fails unless the value is text with at least `value` characters.
    MinLength {
        message: String,
        #[serde(default)]
        value: usize,
    },
    /// Fails unless the value is text with at most `value` characters.
    MaxLength {
        message: String,
        #[serde(default)]
        value: usize,
    },
    /// Fails unless the value is text containing a match for the regex `value`.
    Pattern { message: String, value: String },
    /// Fails when the named predicate rejects the value.
    Custom {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        validator: Option<String>,
    },
}

impl ValidationRule {
    #[must_use]
    pub fn required(message: impl Into<String>) -> Self {
        Self::Required { message: message.into() }
    }

    #[must_use]
    pub fn min_length(value: usize, message: impl Into<String>) -> Self {
        Self::MinLength { message: message.into(), value }
    }

    #[must_use]
    pub fn max_length(value: usize, message: impl Into<String>) -> Self {
        Self::MaxLength { message: message.into(), value }
    }

    #[must_use]
    pub fn pattern(regex: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pattern { message: message.into(), value: regex.into() }
    }

    #[must_use]
    pub fn custom(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Custom { message: message.into(), validator: Some(validator.into()) }
    }

    #[must_use]
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Required { .. } => RuleKind::Required,
            Self::MinLength { .. } => RuleKind::MinLength,
            Self::MaxLength { .. } => RuleKind::MaxLength,
            Self::Pattern { .. } => RuleKind::Pattern,
            Self::Custom { .. } => RuleKind::Custom,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Required { message }
            | Self::MinLength { message, .. }
            | Self::MaxLength { message, .. }
            | Self::Pattern { message, .. }
            | Self::Custom { message, .. } => message,
        }
    }

    /// Whether `value` satisfies this rule. `None` is a field with no value
    /// at all.
    ///
    /// Length and pattern rules only accept text; any other value fails them.
    /// Lengths count Unicode scalar values. A pattern that does not compile
    /// fails every value.
    #[must_use]
    pub fn is_satisfied_by(&self, value: Option<&FieldValue>, validators: &ValidatorRegistry) -> bool {
        self.is_satisfied_with(value, validators, &PatternCache::default())
    }

    /// Like [`Self::is_satisfied_by`], taking `pattern` regexes from
    /// `patterns` when the source has been compiled there already.
    #[must_use]
    pub fn is_satisfied_with(
        &self,
        value: Option<&FieldValue>,
        validators: &ValidatorRegistry,
        patterns: &PatternCache,
    ) -> bool {
        let text = value.and_then(FieldValue::as_str);
        match self {
            Self::Required { .. } => match value {
                None | Some(FieldValue::Null) => false,
                Some(FieldValue::Text(s)) => !s.is_empty(),
                Some(FieldValue::Bool(_)) => true,
            },
            Self::MinLength { value: min, .. } => text.is_some_and(|s| s.chars().count() >= *min),
            Self::MaxLength { value: max, .. } => text.is_some_and(|s| s.chars().count() <= *max),
            Self::Pattern { value: source, .. } => {
                let matches = |re: &Regex| text.is_some_and(|s| re.is_match(s));
                match patterns.lookup(source) {
                    Some(compiled) => compiled.is_some_and(matches),
                    None => compile_pattern(source).as_ref().is_some_and(matches),
                }
            }
            Self::Custom { validator, .. } => {
                validator.as_deref().map_or(true, |name| validators.check(name, value))
            }
        }
    }
}

// =============================================================================
// PATTERNS
// =============================================================================

/// Compiled regexes for `pattern` rules, keyed by source text. A source that
/// does not compile is kept as `None` so it is reported only once.
#[derive(Debug, Clone, Default)]
pub struct PatternCache {
    compiled: HashMap<String, Option<Regex>>,
}

impl PatternCache {
    /// Make the cache hold exactly the pattern sources used by `rules`.
    /// Sources already compiled are reused.
    pub fn sync<'a>(&mut self, rules: impl IntoIterator<Item = &'a ValidationRule>) {
        let mut next = HashMap::new();
        for rule in rules {
            if let ValidationRule::Pattern { value: source, .. } = rule {
                if next.contains_key(source) {
                    continue;
                }
                let compiled = self.compiled.remove(source).unwrap_or_else(|| compile_pattern(source));
                next.insert(source.clone(), compiled);
            }
        }
        self.compiled = next;
    }

    /// `None` when `source` has not been compiled here; `Some(None)` when it
    /// was and failed.
    #[must_use]
    pub fn lookup(&self, source: &str) -> Option<Option<&Regex>> {
        self.compiled.get(source).map(Option::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

fn compile_pattern(source: &str) -> Option<Regex> {
    match Regex::new(source) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern = %source, error = %e, "invalid validation pattern");
            None
        }
    }
}

// =============================================================================
// CUSTOM VALIDATORS
// =============================================================================

/// Predicate backing a `custom` rule.
pub type Predicate = Box<dyn Fn(Option<&FieldValue>) -> bool + Send + Sync>;

/// Named predicates that `custom` rules refer to.
pub struct ValidatorRegistry {
    predicates: HashMap<String, Predicate>,
}

impl ValidatorRegistry {
    /// An empty registry; every `custom` rule passes.
    #[must_use]
    pub fn new() -> Self {
        Self { predicates: HashMap::new() }
    }

    /// A registry preloaded with `email`, `digits`, `checked`, and `signed`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("email", |v| v.and_then(FieldValue::as_str).is_some_and(looks_like_email));
        registry.register("digits", |v| {
            v.and_then(FieldValue::as_str).is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        });
        registry.register("checked", |v| v.and_then(FieldValue::as_bool).unwrap_or(false));
        registry.register("signed", |v| v.and_then(FieldValue::as_str).is_some_and(|s| !s.is_empty()));
        registry
    }

    /// Register or replace the predicate called `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(Option<&FieldValue>) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Box::new(predicate));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the predicate called `name`. Unknown names pass.
    #[must_use]
    pub fn check(&self, name: &str, value: Option<&FieldValue>) -> bool {
        match self.predicates.get(name) {
            Some(predicate) => predicate(value),
            None => {
                tracing::debug!(validator = name, "unknown custom validator; treating as passing");
                true
            }
        }
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry").field("names", &self.names()).finish()
    }
}

fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
