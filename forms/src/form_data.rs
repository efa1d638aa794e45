//! Form data engine: the derived value-per-field map and rule evaluation.
//!
//! DESIGN
//! ======
//! The value map is a cache derived from the element list. `sync_from_elements`
//! rebuilds it wholesale, so ids that no longer exist drop out. Between syncs
//! a caller may write values directly with `set_value`; keeping those writes
//! in step with element properties is the caller's job (see
//! [`crate::session::FormSession`], which does both).
//!
//! Rules live in their own map keyed by element id. Only ids with at least
//! one rule take part in `validate_all`.

#[cfg(test)]
#[path = "form_data_test.rs"]
mod form_data_test;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::doc::{ElementId, ElementProps, FormElement};
use crate::rules::{FieldValue, PatternCache, ValidationRule, ValidatorRegistry};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FormDataError {
    #[error("form data JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of [`FormData::validate_all`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff `errors` is empty.
    pub valid: bool,
    /// Messages per failing field, in rule order. Passing fields are absent.
    pub errors: BTreeMap<ElementId, Vec<String>>,
}

/// Persisted shape: `{"values": {...}, "rules": {...}}`.
#[derive(Serialize)]
struct EncodedRef<'a> {
    values: &'a HashMap<ElementId, FieldValue>,
    rules: &'a HashMap<ElementId, Vec<ValidationRule>>,
}

#[derive(Deserialize)]
struct Encoded {
    #[serde(default)]
    values: HashMap<ElementId, FieldValue>,
    #[serde(default)]
    rules: HashMap<ElementId, Vec<ValidationRule>>,
}

/// Field values and validation rules for one open document.
#[derive(Debug, Default)]
pub struct FormData {
    values: HashMap<ElementId, FieldValue>,
    rules: HashMap<ElementId, Vec<ValidationRule>>,
    validators: ValidatorRegistry,
    patterns: PatternCache,
}

// =============================================================================
// VALUES
// =============================================================================

/// The value an element contributes to the form, taken from its properties.
#[must_use]
pub fn value_of(element: &FormElement) -> FieldValue {
    match &element.props {
        ElementProps::TextField(p) => FieldValue::Text(p.value.clone()),
        ElementProps::Checkbox(p) => FieldValue::Bool(p.checked),
        ElementProps::Dropdown(p) => FieldValue::Text(p.selected_option.clone()),
        ElementProps::SignatureField(p) => FieldValue::from(p.signature_data.clone()),
    }
}

impl FormData {
    /// An engine with no values, no rules, and an empty validator registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose `custom` rules resolve against `validators`.
    #[must_use]
    pub fn with_validators(validators: ValidatorRegistry) -> Self {
        Self { validators, ..Self::default() }
    }

    /// Rebuild the value map from `elements`, replacing whatever was there.
    pub fn sync_from_elements(&mut self, elements: &[FormElement]) {
        self.values = elements.iter().map(|e| (e.id, value_of(e))).collect();
        tracing::debug!(fields = self.values.len(), "form values synced");
    }

    #[must_use]
    pub fn value(&self, id: &ElementId) -> Option<&FieldValue> {
        self.values.get(id)
    }

    /// Overwrite one value without touching the element it came from.
    pub fn set_value(&mut self, id: ElementId, value: FieldValue) {
        self.values.insert(id, value);
    }

    /// All current values.
    #[must_use]
    pub fn values(&self) -> &HashMap<ElementId, FieldValue> {
        &self.values
    }

    // =========================================================================
    // RULES
    // =========================================================================

    /// Replace the rule list for `id`.
    pub fn set_rules(&mut self, id: ElementId, rules: Vec<ValidationRule>) {
        self.rules.insert(id, rules);
        self.refresh_patterns();
    }

    /// Rules for `id`; empty when none are registered.
    #[must_use]
    pub fn rules(&self, id: &ElementId) -> &[ValidationRule] {
        self.rules.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn clear_rules(&mut self, id: &ElementId) {
        if self.rules.remove(id).is_some() {
            self.refresh_patterns();
        }
    }

    /// Drop the rules of every id `keep` rejects. Returns the dropped ids.
    pub fn retain_rules<F>(&mut self, mut keep: F) -> Vec<ElementId>
    where
        F: FnMut(&ElementId) -> bool,
    {
        let dropped: Vec<ElementId> = self.rules.keys().filter(|id| !keep(*id)).copied().collect();
        for id in &dropped {
            self.rules.remove(id);
        }
        if !dropped.is_empty() {
            self.refresh_patterns();
        }
        dropped
    }

    /// Compiled `pattern` sources currently held for the rules.
    #[must_use]
    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    fn refresh_patterns(&mut self) {
        self.patterns.sync(self.rules.values().flatten());
    }

    /// Number of fields with a registered rule list.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    pub fn validators_mut(&mut self) -> &mut ValidatorRegistry {
        &mut self.validators
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Messages of every rule for `id` that the current value fails, in rule
    /// order.
    #[must_use]
    pub fn validate_field(&self, id: &ElementId) -> Vec<String> {
        let value = self.values.get(id);
        self.rules(id)
            .iter()
            .filter(|rule| !rule.is_satisfied_with(value, &self.validators, &self.patterns))
            .map(|rule| rule.message().to_string())
            .collect()
    }

    /// Validate every field that has rules.
    #[must_use]
    pub fn validate_all(&self) -> ValidationResult {
        let errors: BTreeMap<ElementId, Vec<String>> = self
            .rules
            .keys()
            .filter_map(|id| {
                let messages = self.validate_field(id);
                (!messages.is_empty()).then_some((*id, messages))
            })
            .collect();
        ValidationResult { valid: errors.is_empty(), errors }
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Encode values and rules together.
    ///
    /// # Errors
    ///
    /// Returns `Json` if encoding fails.
    pub fn serialize(&self) -> Result<String, FormDataError> {
        Ok(serde_json::to_string(&EncodedRef { values: &self.values, rules: &self.rules })?)
    }

    /// Replace both maps with decoded ones. The validator registry is kept.
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed input; nothing is changed in that case.
    pub fn deserialize(&mut self, json: &str) -> Result<(), FormDataError> {
        match serde_json::from_str::<Encoded>(json) {
            Ok(decoded) => {
                self.values = decoded.values;
                self.rules = decoded.rules;
                self.refresh_patterns();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to deserialize form data");
                Err(e.into())
            }
        }
    }

    /// Drop all values and rules.
    pub fn clear(&mut self) {
        self.values.clear();
        self.rules.clear();
        self.patterns = PatternCache::default();
    }
}
