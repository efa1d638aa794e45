//! Document model: form elements, their typed properties, and the in-memory
//! store.
//!
//! This module defines what is placed on the PDF pages (`FormElement`,
//! `ElementKind`, `ElementProps`), the sparse edit types used to create and
//! modify elements (`ElementOptions`, `ElementPatch`, `PropertyUpdate`), and
//! the store that owns every live element (`ElementStore`).
//!
//! The store is the only owner of the canonical element list. Everything else
//! (the validation engine, the exporter, the renderer in the host) reads
//! copies or borrowed slices. The renderer sorts by z-index through
//! `sorted_by_z`; the list itself stays in insertion order.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{
    CHECKBOX_SIZE, DEFAULT_FONT_SIZE, DROPDOWN_SIZE, SELECTED_Z_BOOST, SIGNATURE_SIZE, TEXT_FIELD_SIZE,
    Z_INDEX_BASE, Z_INDEX_STEP,
};
use crate::coords::Rect;

/// Unique identifier for a form element.
pub type ElementId = Uuid;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("element list JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown property `{0}`")]
    UnknownProperty(String),
    #[error("invalid value for property `{key}`: {source}")]
    InvalidPropertyValue { key: String, source: serde_json::Error },
    #[error("property `{key}` does not apply to {kind} elements")]
    PropertyMismatch { key: &'static str, kind: ElementKind },
    #[error("`{0}` is not one of the dropdown options")]
    UnknownOption(String),
    #[error("font size must be positive, got {0}")]
    InvalidFontSize(f64),
    #[error("element {id} is invalid: {reason}")]
    InvalidElement { id: ElementId, reason: &'static str },
    #[error("duplicate element id {0}")]
    DuplicateId(ElementId),
}

// =============================================================================
// KINDS AND PROPERTIES
// =============================================================================

/// The kind of a form element. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    /// Single-line text input.
    TextField,
    /// Boolean toggle with a label.
    Checkbox,
    /// Choice from a fixed list of options.
    Dropdown,
    /// Area holding a captured signature image.
    SignatureField,
}

impl ElementKind {
    pub const ALL: [Self; 4] = [Self::TextField, Self::Checkbox, Self::Dropdown, Self::SignatureField];

    /// Wire name, as used in the element list encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextField => "text-field",
            Self::Checkbox => "checkbox",
            Self::Dropdown => "dropdown",
            Self::SignatureField => "signature-field",
        }
    }

    /// Default `(width, height)` in page-space points.
    #[must_use]
    pub fn default_size(self) -> (f64, f64) {
        match self {
            Self::TextField => TEXT_FIELD_SIZE,
            Self::Checkbox => CHECKBOX_SIZE,
            Self::Dropdown => DROPDOWN_SIZE,
            Self::SignatureField => SIGNATURE_SIZE,
        }
    }

    /// Property template for a freshly created element of this kind.
    #[must_use]
    pub fn default_props(self) -> ElementProps {
        match self {
            Self::TextField => ElementProps::TextField(TextFieldProps::default()),
            Self::Checkbox => ElementProps::Checkbox(CheckboxProps::default()),
            Self::Dropdown => ElementProps::Dropdown(DropdownProps::default()),
            Self::SignatureField => ElementProps::SignatureField(SignatureProps::default()),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextFieldProps {
    pub value: String,
    pub placeholder: String,
    pub font_size: f64,
}

impl Default for TextFieldProps {
    fn default() -> Self {
        Self { value: String::new(), placeholder: "Enter text".into(), font_size: DEFAULT_FONT_SIZE }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckboxProps {
    pub checked: bool,
    pub label: String,
}

impl Default for CheckboxProps {
    fn default() -> Self {
        Self { checked: false, label: "Checkbox".into() }
    }
}

/// Dropdown properties. `selected_option` is empty or one of `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DropdownProps {
    pub options: Vec<String>,
    pub selected_option: String,
}

impl Default for DropdownProps {
    fn default() -> Self {
        Self {
            options: vec!["Option 1".into(), "Option 2".into(), "Option 3".into()],
            selected_option: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignatureProps {
    /// Encoded signature image (e.g. a PNG data URL), if one was captured.
    pub signature_data: Option<String>,
}

/// Per-kind properties. The variant is the element's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "kebab-case")]
pub enum ElementProps {
    TextField(TextFieldProps),
    Checkbox(CheckboxProps),
    Dropdown(DropdownProps),
    SignatureField(SignatureProps),
}

impl ElementProps {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::TextField(_) => ElementKind::TextField,
            Self::Checkbox(_) => ElementKind::Checkbox,
            Self::Dropdown(_) => ElementKind::Dropdown,
            Self::SignatureField(_) => ElementKind::SignatureField,
        }
    }

    /// Merge a single property into this bag. Other keys are untouched.
    ///
    /// # Errors
    ///
    /// Returns `PropertyMismatch` if the key belongs to another kind,
    /// `UnknownOption` for a dropdown selection outside `options`, and
    /// `InvalidFontSize` for a non-positive font size.
    pub fn apply(&mut self, update: PropertyUpdate) -> Result<(), DocError> {
        let kind = self.kind();
        match (self, update) {
            (Self::TextField(p), PropertyUpdate::Value(v)) => p.value = v,
            (Self::TextField(p), PropertyUpdate::Placeholder(v)) => p.placeholder = v,
            (Self::TextField(p), PropertyUpdate::FontSize(v)) => {
                if !(v.is_finite() && v > 0.0) {
                    return Err(DocError::InvalidFontSize(v));
                }
                p.font_size = v;
            }
            (Self::Checkbox(p), PropertyUpdate::Checked(v)) => p.checked = v,
            (Self::Checkbox(p), PropertyUpdate::Label(v)) => p.label = v,
            (Self::Dropdown(p), PropertyUpdate::Options(v)) => {
                if !v.contains(&p.selected_option) {
                    p.selected_option.clear();
                }
                p.options = v;
            }
            (Self::Dropdown(p), PropertyUpdate::SelectedOption(v)) => {
                if !v.is_empty() && !p.options.contains(&v) {
                    return Err(DocError::UnknownOption(v));
                }
                p.selected_option = v;
            }
            (Self::SignatureField(p), PropertyUpdate::SignatureData(v)) => p.signature_data = v,
            (_, update) => return Err(DocError::PropertyMismatch { key: update.key(), kind }),
        }
        Ok(())
    }
}

/// A single typed property write.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyUpdate {
    Value(String),
    Placeholder(String),
    FontSize(f64),
    Checked(bool),
    Label(String),
    Options(Vec<String>),
    SelectedOption(String),
    SignatureData(Option<String>),
}

impl PropertyUpdate {
    /// Wire key of the property this update writes.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Placeholder(_) => "placeholder",
            Self::FontSize(_) => "fontSize",
            Self::Checked(_) => "checked",
            Self::Label(_) => "label",
            Self::Options(_) => "options",
            Self::SelectedOption(_) => "selectedOption",
            Self::SignatureData(_) => "signatureData",
        }
    }

    /// Build an update from a string key and a JSON value, for callers that
    /// only have the property name (property panels, the CLI).
    ///
    /// # Errors
    ///
    /// Returns `UnknownProperty` for an unrecognized key and
    /// `InvalidPropertyValue` when the value has the wrong shape.
    pub fn parse(key: &str, value: serde_json::Value) -> Result<Self, DocError> {
        fn typed<T: serde::de::DeserializeOwned>(key: &str, value: serde_json::Value) -> Result<T, DocError> {
            serde_json::from_value(value)
                .map_err(|source| DocError::InvalidPropertyValue { key: key.to_string(), source })
        }

        Ok(match key {
            "value" => Self::Value(typed(key, value)?),
            "placeholder" => Self::Placeholder(typed(key, value)?),
            "fontSize" => Self::FontSize(typed(key, value)?),
            "checked" => Self::Checked(typed(key, value)?),
            "label" => Self::Label(typed(key, value)?),
            "options" => Self::Options(typed(key, value)?),
            "selectedOption" => Self::SelectedOption(typed(key, value)?),
            "signatureData" => Self::SignatureData(typed(key, value)?),
            other => return Err(DocError::UnknownProperty(other.to_string())),
        })
    }
}

// =============================================================================
// ELEMENTS
// =============================================================================

/// A placed form control as stored in the document and in the layout file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormElement {
    /// Unique identifier, assigned at creation.
    pub id: ElementId,
    /// Human-readable label; not required to be unique.
    pub name: String,
    /// Kind tag and its properties (`type` + `properties` on the wire).
    #[serde(flatten)]
    pub props: ElementProps,
    /// Left edge of the bounding box in page-space points.
    pub x: f64,
    /// Top edge of the bounding box in page-space points.
    pub y: f64,
    /// Width in page-space points. Always positive.
    pub width: f64,
    /// Height in page-space points. Always positive.
    pub height: f64,
    /// 1-based page index.
    pub page: u32,
    /// Stacking order; higher values paint on top.
    pub z_index: i64,
}

impl FormElement {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.props.kind()
    }

    /// Bounding box in page space.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Z-index to paint with, lifted above everything while selected.
    #[must_use]
    pub fn paint_z_index(&self, selected: bool) -> i64 {
        if selected { self.z_index.saturating_add(SELECTED_Z_BOOST) } else { self.z_index }
    }

    /// Check the geometry and property invariants.
    ///
    /// # Errors
    ///
    /// Returns `InvalidElement` naming the first violated invariant.
    pub fn check(&self) -> Result<(), DocError> {
        let reason = if !is_positive(self.width) || !is_positive(self.height) {
            Some("width and height must be positive")
        } else if !self.x.is_finite() || !self.y.is_finite() {
            Some("position must be finite")
        } else if self.page < 1 {
            Some("page must be at least 1")
        } else if let ElementProps::Dropdown(p) = &self.props {
            (!p.selected_option.is_empty() && !p.options.contains(&p.selected_option))
                .then_some("selected option is not one of the options")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(DocError::InvalidElement { id: self.id, reason }),
            None => Ok(()),
        }
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Placement options for [`ElementStore::create`]. Unset fields fall back to
/// the kind's template.
#[derive(Debug, Clone, Default)]
pub struct ElementOptions {
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub page: Option<u32>,
    pub z_index: Option<i64>,
    pub properties: Vec<PropertyUpdate>,
}

impl ElementOptions {
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    #[must_use]
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_z_index(mut self, z_index: i64) -> Self {
        self.z_index = Some(z_index);
        self
    }

    #[must_use]
    pub fn with_property(mut self, update: PropertyUpdate) -> Self {
        self.properties.push(update);
        self
    }
}

/// Sparse update for an element. Only present fields are applied; property
/// updates merge into the existing bag.
#[derive(Debug, Clone, Default)]
pub struct ElementPatch {
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub page: Option<u32>,
    pub z_index: Option<i64>,
    pub properties: Vec<PropertyUpdate>,
}

impl ElementPatch {
    #[must_use]
    pub fn moved_to(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }

    #[must_use]
    pub fn property(update: PropertyUpdate) -> Self {
        Self { properties: vec![update], ..Self::default() }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// In-memory store of form elements, in insertion order.
pub struct ElementStore {
    elements: Vec<FormElement>,
    next_z: i64,
}

impl ElementStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { elements: Vec::new(), next_z: Z_INDEX_BASE }
    }

    /// Create an element of `kind`, filling anything `options` leaves unset
    /// from the kind's template, and append it to the store.
    ///
    /// Property updates that do not fit the kind are dropped with a warning.
    pub fn create(&mut self, kind: ElementKind, options: ElementOptions) -> FormElement {
        let id = Uuid::new_v4();
        let name = options.name.filter(|n| !n.is_empty()).unwrap_or_else(|| default_name(kind, id));
        let (default_w, default_h) = kind.default_size();
        let z_index = options.z_index.unwrap_or(self.next_z);
        self.next_z = self.next_z.saturating_add(Z_INDEX_STEP);

        let mut props = kind.default_props();
        for update in options.properties {
            if let Err(e) = props.apply(update) {
                tracing::warn!(error = %e, %kind, "ignoring property on create");
            }
        }

        let element = FormElement {
            id,
            name,
            props,
            x: options.x.filter(|v| v.is_finite()).unwrap_or(0.0),
            y: options.y.filter(|v| v.is_finite()).unwrap_or(0.0),
            width: options.width.filter(|v| is_positive(*v)).unwrap_or(default_w),
            height: options.height.filter(|v| is_positive(*v)).unwrap_or(default_h),
            page: options.page.filter(|p| *p >= 1).unwrap_or(1),
            z_index,
        };
        tracing::debug!(%id, %kind, z_index, "element created");
        self.elements.push(element.clone());
        element
    }

    /// Apply a partial update. Returns the updated element, or `None` if the
    /// id is unknown.
    ///
    /// Fields that would break an invariant (non-positive size, page 0,
    /// mismatched property) are skipped with a warning; the rest still apply.
    pub fn update(&mut self, id: &ElementId, patch: ElementPatch) -> Option<FormElement> {
        let el = self.elements.iter_mut().find(|e| e.id == *id)?;

        if let Some(name) = patch.name {
            el.name = name;
        }
        if let Some(x) = patch.x.filter(|v| v.is_finite()) {
            el.x = x;
        }
        if let Some(y) = patch.y.filter(|v| v.is_finite()) {
            el.y = y;
        }
        match patch.width {
            Some(w) if is_positive(w) => el.width = w,
            Some(w) => tracing::warn!(%id, width = w, "ignoring non-positive width"),
            None => {}
        }
        match patch.height {
            Some(h) if is_positive(h) => el.height = h,
            Some(h) => tracing::warn!(%id, height = h, "ignoring non-positive height"),
            None => {}
        }
        match patch.page {
            Some(0) => tracing::warn!(%id, "ignoring page 0"),
            Some(p) => el.page = p,
            None => {}
        }
        if let Some(z) = patch.z_index {
            el.z_index = z;
        }
        for update in patch.properties {
            if let Err(e) = el.props.apply(update) {
                tracing::warn!(%id, error = %e, "ignoring property update");
            }
        }
        Some(el.clone())
    }

    /// Write a single property. Shorthand for an [`ElementPatch`] holding one
    /// property update.
    pub fn update_property(&mut self, id: &ElementId, update: PropertyUpdate) -> Option<FormElement> {
        self.update(id, ElementPatch::property(update))
    }

    /// Remove an element. Returns false if it was not present.
    pub fn delete(&mut self, id: &ElementId) -> bool {
        let before = self.elements.len();
        self.elements.retain(|e| e.id != *id);
        self.elements.len() != before
    }

    /// Raise an element above every other one.
    pub fn bring_to_front(&mut self, id: &ElementId) -> Option<FormElement> {
        let current = self.get(id)?;
        if self.elements.len() == 1 {
            return Some(current.clone());
        }
        let top = self.elements.iter().map(|e| e.z_index).max().unwrap_or(Z_INDEX_BASE);
        let z_index = top.saturating_add(Z_INDEX_STEP);
        self.next_z = self.next_z.max(z_index.saturating_add(Z_INDEX_STEP));
        self.update(id, ElementPatch { z_index: Some(z_index), ..ElementPatch::default() })
    }

    /// Lower an element beneath every other one.
    pub fn send_to_back(&mut self, id: &ElementId) -> Option<FormElement> {
        let current = self.get(id)?;
        if self.elements.len() == 1 {
            return Some(current.clone());
        }
        let bottom = self.elements.iter().map(|e| e.z_index).min().unwrap_or(Z_INDEX_BASE);
        self.update(id, ElementPatch { z_index: Some(bottom.saturating_sub(Z_INDEX_STEP)), ..ElementPatch::default() })
    }

    /// Reassign z-indices as `base + i * step` in current paint order and
    /// reset the counter past the top.
    pub fn normalize_z_order(&mut self) {
        let order: Vec<ElementId> = self.sorted_by_z().iter().map(|e| e.id).collect();
        let mut z = Z_INDEX_BASE;
        for id in order {
            if let Some(el) = self.elements.iter_mut().find(|e| e.id == id) {
                el.z_index = z;
            }
            z = z.saturating_add(Z_INDEX_STEP);
        }
        self.next_z = z;
    }

    /// Elements on `page`, in insertion order.
    #[must_use]
    pub fn list_by_page(&self, page: u32) -> Vec<&FormElement> {
        self.elements.iter().filter(|e| e.page == page).collect()
    }

    /// All elements in paint order (ascending z-index, ties in insertion
    /// order).
    #[must_use]
    pub fn sorted_by_z(&self) -> Vec<&FormElement> {
        let mut sorted: Vec<&FormElement> = self.elements.iter().collect();
        sorted.sort_by_key(|e| e.z_index);
        sorted
    }

    /// Encode the element list.
    ///
    /// # Errors
    ///
    /// Returns `Json` if encoding fails.
    pub fn serialize(&self) -> Result<String, DocError> {
        Ok(serde_json::to_string(&self.elements)?)
    }

    /// Replace the whole list with a decoded one and move the z-index counter
    /// past the loaded elements.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed input, an element that breaks an
    /// invariant, or a repeated id. The store is left untouched on error.
    pub fn deserialize(&mut self, json: &str) -> Result<(), DocError> {
        match decode_elements(json) {
            Ok((elements, next_z)) => {
                self.next_z = next_z;
                tracing::debug!(count = elements.len(), next_z = self.next_z, "elements loaded");
                self.elements = elements;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to deserialize form elements");
                Err(e)
            }
        }
    }

    /// Remove every element and reset the z-index counter.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.next_z = Z_INDEX_BASE;
    }

    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&FormElement> {
        self.elements.iter().find(|e| e.id == *id)
    }

    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.get(id).is_some()
    }

    /// All elements in insertion order.
    #[must_use]
    pub fn elements(&self) -> &[FormElement] {
        &self.elements
    }

    /// Z-index the next created element will receive.
    #[must_use]
    pub fn next_z_index(&self) -> i64 {
        self.next_z
    }

    /// Highest page any element sits on, or 0 for an empty store.
    #[must_use]
    pub fn last_page(&self) -> u32 {
        self.elements.iter().map(|e| e.page).max().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::new()
    }
}

fn default_name(kind: ElementKind, id: ElementId) -> String {
    let simple = id.simple().to_string();
    let short: String = simple.chars().take(8).collect();
    format!("{kind}-{short}")
}

/// Decode and check an element list, returning it with the z-index counter
/// that follows it.
fn decode_elements(json: &str) -> Result<(Vec<FormElement>, i64), DocError> {
    let elements: Vec<FormElement> = serde_json::from_str(json)?;
    let mut seen = HashSet::with_capacity(elements.len());
    let mut next_z: Option<i64> = None;
    for el in &elements {
        el.check()?;
        if !seen.insert(el.id) {
            return Err(DocError::DuplicateId(el.id));
        }
        let after = el
            .z_index
            .checked_add(Z_INDEX_STEP)
            .ok_or(DocError::InvalidElement { id: el.id, reason: "z-index leaves no room above it" })?;
        next_z = Some(next_z.map_or(after, |z| z.max(after)));
    }
    Ok((elements, next_z.unwrap_or(Z_INDEX_BASE)))
}
