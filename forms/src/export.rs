//! Export: turn form elements into the field descriptors the PDF field writer
//! consumes.
//!
//! The writer itself (loading the source PDF, adding the AcroForm widgets,
//! saving) lives outside this crate behind [`FieldWriter`]. This module only
//! builds the descriptors and assigns the per-type export names
//! (`TextField1`, `Checkbox1`, `Dropdown1`, `Signature1`, ...).

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::doc::{ElementId, ElementKind, ElementProps, FormElement};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no form fields to export")]
    Empty,
    #[error("failed to write fields to {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("field manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Field type tag understood by the PDF field writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Checkbox,
    Dropdown,
    Signature,
}

impl FieldType {
    /// Prefix of the sequential export name.
    #[must_use]
    pub fn name_prefix(self) -> &'static str {
        match self {
            Self::Text => "TextField",
            Self::Checkbox => "Checkbox",
            Self::Dropdown => "Dropdown",
            Self::Signature => "Signature",
        }
    }
}

impl From<ElementKind> for FieldType {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::TextField => Self::Text,
            ElementKind::Checkbox => Self::Checkbox,
            ElementKind::Dropdown => Self::Dropdown,
            ElementKind::SignatureField => Self::Signature,
        }
    }
}

/// One interactive field for the PDF field writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: ElementId,
    /// Export name, unique per type (`TextField1`, `TextField2`, ...).
    pub name: String,
    pub field_type: FieldType,
    /// Initial value; `None` for signature fields.
    pub value: Option<String>,
    /// `[x1, y1, x2, y2]` in page-space points.
    pub rect: [f64; 4],
    /// 1-based page index.
    pub page: u32,
    /// Every element property, stringified. Null values are omitted.
    pub properties: BTreeMap<String, String>,
}

/// The collaborator that bakes descriptors into a PDF.
pub trait FieldWriter {
    /// Write `fields` into a copy of `source` saved at `output`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExportError`] describing why the write failed.
    fn write_fields(&self, source: &Path, fields: &[FieldDescriptor], output: &Path) -> Result<(), ExportError>;
}

// =============================================================================
// DESCRIPTORS
// =============================================================================

/// Build a descriptor for one element. Its `name` is the element's own name;
/// [`build_descriptors`] replaces it with the sequential export name.
#[must_use]
pub fn descriptor_for(element: &FormElement) -> FieldDescriptor {
    let mut properties = BTreeMap::new();
    let value = match &element.props {
        ElementProps::TextField(p) => {
            properties.insert("value".into(), p.value.clone());
            properties.insert("placeholder".into(), p.placeholder.clone());
            properties.insert("fontSize".into(), p.font_size.to_string());
            Some(p.value.clone())
        }
        ElementProps::Checkbox(p) => {
            properties.insert("checked".into(), p.checked.to_string());
            properties.insert("label".into(), p.label.clone());
            Some(p.checked.to_string())
        }
        ElementProps::Dropdown(p) => {
            properties.insert("options".into(), p.options.join(","));
            properties.insert("selectedOption".into(), p.selected_option.clone());
            Some(p.selected_option.clone())
        }
        ElementProps::SignatureField(p) => {
            if let Some(data) = &p.signature_data {
                properties.insert("signatureData".into(), data.clone());
            }
            None
        }
    };

    FieldDescriptor {
        id: element.id,
        name: if element.name.is_empty() { element.id.to_string() } else { element.name.clone() },
        field_type: element.kind().into(),
        value,
        rect: [element.x, element.y, element.x + element.width, element.y + element.height],
        page: element.page,
        properties,
    }
}

/// Build descriptors for `elements` in list order and name them with one
/// counter per field type.
#[must_use]
pub fn build_descriptors(elements: &[FormElement]) -> Vec<FieldDescriptor> {
    let mut fields: Vec<FieldDescriptor> = elements.iter().map(descriptor_for).collect();
    assign_sequential_names(&mut fields);
    fields
}

/// Rename fields to `<Prefix><n>`, counting separately per type in slice
/// order.
pub fn assign_sequential_names(fields: &mut [FieldDescriptor]) {
    let mut counters: BTreeMap<FieldType, u32> = BTreeMap::new();
    for field in fields {
        let n = counters.entry(field.field_type).or_insert(0);
        *n += 1;
        field.name = format!("{}{n}", field.field_type.name_prefix());
    }
}

/// Build descriptors and hand them to `writer`. The elements are only read,
/// so a failed write leaves the caller's state as it was.
///
/// # Errors
///
/// Returns `Empty` when there is nothing to export, otherwise whatever the
/// writer reports.
pub fn export_with<W: FieldWriter + ?Sized>(
    writer: &W,
    elements: &[FormElement],
    source: &Path,
    output: &Path,
) -> Result<Vec<FieldDescriptor>, ExportError> {
    if elements.is_empty() {
        return Err(ExportError::Empty);
    }
    let fields = build_descriptors(elements);
    writer.write_fields(source, &fields, output).inspect_err(|e| {
        tracing::warn!(error = %e, output = %output.display(), "field export failed");
    })?;
    tracing::info!(count = fields.len(), output = %output.display(), "form fields exported");
    Ok(fields)
}
