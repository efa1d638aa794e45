#![allow(clippy::float_cmp)]

use std::cell::RefCell;
use std::path::PathBuf;

use super::*;
use crate::doc::{ElementOptions, ElementStore, PropertyUpdate};

/// Records what it was asked to write, or fails on demand.
#[derive(Default)]
struct RecordingWriter {
    fail: bool,
    calls: RefCell<Vec<(PathBuf, usize, PathBuf)>>,
}

impl FieldWriter for RecordingWriter {
    fn write_fields(&self, source: &Path, fields: &[FieldDescriptor], output: &Path) -> Result<(), ExportError> {
        if self.fail {
            return Err(ExportError::Write { path: output.to_path_buf(), message: "disk full".into() });
        }
        self.calls.borrow_mut().push((source.to_path_buf(), fields.len(), output.to_path_buf()));
        Ok(())
    }
}

fn sample_store() -> ElementStore {
    let mut store = ElementStore::new();
    store.create(ElementKind::TextField, ElementOptions::at(10.0, 20.0).named("first"));
    store.create(ElementKind::Checkbox, ElementOptions::at(0.0, 0.0).on_page(2));
    store.create(ElementKind::TextField, ElementOptions::default());
    store.create(ElementKind::Dropdown, ElementOptions::default());
    store.create(ElementKind::SignatureField, ElementOptions::default());
    store.create(ElementKind::Checkbox, ElementOptions::default());
    store
}

#[test]
fn field_type_serde_lowercase() {
    assert_eq!(serde_json::to_string(&FieldType::Signature).unwrap(), "\"signature\"");
    assert_eq!(serde_json::to_string(&FieldType::Text).unwrap(), "\"text\"");
}

#[test]
fn sequential_names_per_type_in_list_order() {
    let store = sample_store();
    let names: Vec<String> = build_descriptors(store.elements()).into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["TextField1", "Checkbox1", "TextField2", "Dropdown1", "Signature1", "Checkbox2"]);
}

#[test]
fn naming_is_deterministic() {
    let store = sample_store();
    assert_eq!(build_descriptors(store.elements()), build_descriptors(store.elements()));
}

#[test]
fn descriptor_rect_is_two_corners() {
    let store = sample_store();
    let field = descriptor_for(&store.elements()[0]);
    assert_eq!(field.rect, [10.0, 20.0, 210.0, 60.0]);
    assert_eq!(field.page, 1);
    assert_eq!(field.name, "first");
    assert_eq!(field.field_type, FieldType::Text);
}

#[test]
fn descriptor_values_per_type() {
    let mut store = ElementStore::new();
    let text = store.create(ElementKind::TextField, ElementOptions::default()).id;
    let check = store.create(ElementKind::Checkbox, ElementOptions::default()).id;
    let drop = store.create(ElementKind::Dropdown, ElementOptions::default()).id;
    let sig = store.create(ElementKind::SignatureField, ElementOptions::default()).id;
    store.update_property(&text, PropertyUpdate::Value("Ada".into()));
    store.update_property(&check, PropertyUpdate::Checked(true));
    store.update_property(&drop, PropertyUpdate::SelectedOption("Option 2".into()));
    store.update_property(&sig, PropertyUpdate::SignatureData(Some("data:image/png;base64,AA".into())));

    let fields = build_descriptors(store.elements());
    assert_eq!(fields[0].value.as_deref(), Some("Ada"));
    assert_eq!(fields[1].value.as_deref(), Some("true"));
    assert_eq!(fields[2].value.as_deref(), Some("Option 2"));
    assert_eq!(fields[3].value, None);
    assert_eq!(fields[3].properties["signatureData"], "data:image/png;base64,AA");
}

#[test]
fn descriptor_properties_are_stringified() {
    let store = sample_store();
    let fields = build_descriptors(store.elements());
    assert_eq!(fields[0].properties["fontSize"], "14");
    assert_eq!(fields[0].properties["placeholder"], "Enter text");
    assert_eq!(fields[1].properties["checked"], "false");
    assert_eq!(fields[3].properties["options"], "Option 1,Option 2,Option 3");
    assert!(!fields[4].properties.contains_key("signatureData"));
}

#[test]
fn unchecked_checkbox_value_is_false() {
    let store = sample_store();
    assert_eq!(descriptor_for(&store.elements()[1]).value.as_deref(), Some("false"));
}

#[test]
fn export_with_hands_fields_to_writer() {
    let store = sample_store();
    let writer = RecordingWriter::default();
    let fields = export_with(&writer, store.elements(), Path::new("in.pdf"), Path::new("out.pdf")).unwrap();
    assert_eq!(fields.len(), 6);
    let calls = writer.calls.borrow();
    assert_eq!(calls.as_slice(), &[(PathBuf::from("in.pdf"), 6, PathBuf::from("out.pdf"))]);
}

#[test]
fn export_with_failure_leaves_elements_untouched() {
    let store = sample_store();
    let before = store.elements().to_vec();
    let writer = RecordingWriter { fail: true, ..Default::default() };
    let err = export_with(&writer, store.elements(), Path::new("in.pdf"), Path::new("out.pdf")).unwrap_err();
    assert!(matches!(err, ExportError::Write { .. }));
    assert_eq!(store.elements(), before.as_slice());
}

#[test]
fn export_with_empty_list_is_an_error() {
    let writer = RecordingWriter::default();
    let err = export_with(&writer, &[], Path::new("in.pdf"), Path::new("out.pdf")).unwrap_err();
    assert!(matches!(err, ExportError::Empty));
    assert!(writer.calls.borrow().is_empty());
}
