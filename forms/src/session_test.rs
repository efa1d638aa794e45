#![allow(clippy::float_cmp)]

use std::cell::Cell;

use uuid::Uuid;

use super::*;
use crate::coords::{PageDimensions, Rotation};
use crate::export::FieldType;

fn session_with(kinds: &[ElementKind]) -> (FormSession, Vec<ElementId>) {
    let mut session = FormSession::with_validators(ValidatorRegistry::with_builtins());
    let ids = kinds.iter().map(|k| session.create(*k, ElementOptions::default()).id).collect();
    session.drain_changes();
    (session, ids)
}

struct CountingWriter {
    calls: Cell<usize>,
}

impl FieldWriter for CountingWriter {
    fn write_fields(&self, _source: &Path, _fields: &[FieldDescriptor], _output: &Path) -> Result<(), ExportError> {
        self.calls.set(self.calls.get() + 1);
        Ok(())
    }
}

// =============================================================
// mutation keeps values in sync
// =============================================================

#[test]
fn create_syncs_value_map() {
    let (session, ids) = session_with(&[ElementKind::TextField, ElementKind::Checkbox]);
    assert_eq!(session.data().value(&ids[0]), Some(&FieldValue::from("")));
    assert_eq!(session.data().value(&ids[1]), Some(&FieldValue::Bool(false)));
}

#[test]
fn update_property_resyncs_and_revalidates() {
    let (mut session, ids) = session_with(&[ElementKind::TextField]);
    session.set_rules(ids[0], vec![ValidationRule::min_length(3, "Too short")]);
    session.update_property(&ids[0], PropertyUpdate::Value("hello".into()));
    assert!(session.validate_field(&ids[0]).is_empty());
    session.update_property(&ids[0], PropertyUpdate::Value("hi".into()));
    assert_eq!(session.validate_field(&ids[0]), vec!["Too short"]);
}

#[test]
fn update_unknown_id_is_none_and_records_nothing() {
    let (mut session, _) = session_with(&[ElementKind::TextField]);
    assert!(session.update(&Uuid::new_v4(), ElementPatch::moved_to(1.0, 1.0)).is_none());
    assert!(session.drain_changes().is_empty());
}

#[test]
fn set_field_value_writes_property_and_value() {
    let (mut session, ids) = session_with(&ElementKind::ALL);
    session.set_field_value(&ids[0], FieldValue::from("Ada"));
    session.set_field_value(&ids[1], FieldValue::Bool(true));
    session.set_field_value(&ids[2], FieldValue::from("Option 1"));
    session.set_field_value(&ids[3], FieldValue::from("sig"));

    let data = session.data();
    assert_eq!(data.value(&ids[0]), Some(&FieldValue::from("Ada")));
    assert_eq!(data.value(&ids[1]), Some(&FieldValue::Bool(true)));
    assert_eq!(data.value(&ids[2]), Some(&FieldValue::from("Option 1")));
    assert_eq!(data.value(&ids[3]), Some(&FieldValue::from("sig")));

    let ElementProps::TextField(p) = &session.store().elements()[0].props else {
        panic!("expected text field props");
    };
    assert_eq!(p.value, "Ada");
}

#[test]
fn set_field_value_wrong_shape_is_ignored() {
    let (mut session, ids) = session_with(&[ElementKind::Checkbox]);
    let el = session.set_field_value(&ids[0], FieldValue::from("yes")).unwrap();
    assert_eq!(el.props, ElementKind::Checkbox.default_props());
    assert_eq!(session.data().value(&ids[0]), Some(&FieldValue::Bool(false)));
    assert!(session.set_field_value(&Uuid::new_v4(), FieldValue::Null).is_none());
}

#[test]
fn clearing_signature_sets_null() {
    let (mut session, ids) = session_with(&[ElementKind::SignatureField]);
    session.set_field_value(&ids[0], FieldValue::from("sig"));
    session.set_field_value(&ids[0], FieldValue::Null);
    assert_eq!(session.data().value(&ids[0]), Some(&FieldValue::Null));
}

// =============================================================
// delete
// =============================================================

#[test]
fn delete_clears_rules_selection_and_value() {
    let (mut session, ids) = session_with(&[ElementKind::TextField, ElementKind::Checkbox]);
    session.set_rules(ids[0], vec![ValidationRule::required("r")]);
    assert!(session.select(&ids[0]));
    session.drain_changes();

    assert!(session.delete(&ids[0]));
    assert_eq!(session.selection(), None);
    assert!(session.data().rules(&ids[0]).is_empty());
    assert!(session.data().value(&ids[0]).is_none());
    assert!(session.validate_all().valid);
    assert_eq!(session.drain_changes(), vec![Change::SelectionChanged(None), Change::Deleted(ids[0])]);
}

#[test]
fn delete_keeps_other_selection() {
    let (mut session, ids) = session_with(&[ElementKind::TextField, ElementKind::Checkbox]);
    session.select(&ids[1]);
    session.delete(&ids[0]);
    assert_eq!(session.selection(), Some(ids[1]));
}

#[test]
fn delete_unknown_is_false() {
    let (mut session, _) = session_with(&[ElementKind::TextField]);
    assert!(!session.delete(&Uuid::new_v4()));
    assert!(session.drain_changes().is_empty());
}

// =============================================================
// selection
// =============================================================

#[test]
fn select_unknown_id_is_rejected() {
    let (mut session, _) = session_with(&[ElementKind::TextField]);
    assert!(!session.select(&Uuid::new_v4()));
    assert_eq!(session.selection(), None);
}

#[test]
fn select_and_deselect_record_changes_once() {
    let (mut session, ids) = session_with(&[ElementKind::TextField]);
    session.select(&ids[0]);
    session.select(&ids[0]);
    session.deselect();
    session.deselect();
    assert_eq!(session.drain_changes(), vec![Change::SelectionChanged(Some(ids[0])), Change::SelectionChanged(None)]);
}

#[test]
fn selected_element_lookup() {
    let (mut session, ids) = session_with(&[ElementKind::Dropdown]);
    assert!(session.selected_element().is_none());
    session.select(&ids[0]);
    assert_eq!(session.selected_element().map(|e| e.id), Some(ids[0]));
}

// =============================================================
// paint order and hit testing
// =============================================================

#[test]
fn paint_order_lifts_selection() {
    let (mut session, ids) = session_with(&[ElementKind::TextField, ElementKind::Checkbox]);
    let order: Vec<ElementId> = session.paint_order(1).iter().map(|e| e.id).collect();
    assert_eq!(order, vec![ids[0], ids[1]]);
    session.select(&ids[0]);
    let order: Vec<ElementId> = session.paint_order(1).iter().map(|e| e.id).collect();
    assert_eq!(order, vec![ids[1], ids[0]]);
}

#[test]
fn hit_test_returns_topmost() {
    let mut session = FormSession::new();
    let below = session.create(ElementKind::SignatureField, ElementOptions::at(0.0, 0.0)).id;
    let above = session.create(ElementKind::Checkbox, ElementOptions::at(10.0, 10.0)).id;
    assert_eq!(session.hit_test(1, Point::new(20.0, 20.0)), Some(above));
    assert_eq!(session.hit_test(1, Point::new(250.0, 90.0)), Some(below));
    assert_eq!(session.hit_test(1, Point::new(500.0, 500.0)), None);
    assert_eq!(session.hit_test(2, Point::new(20.0, 20.0)), None);

    session.bring_to_front(&below);
    assert_eq!(session.hit_test(1, Point::new(20.0, 20.0)), Some(below));
}

// =============================================================
// drop_at
// =============================================================

#[test]
fn drop_at_converts_screen_to_page() {
    let (mut session, ids) = session_with(&[ElementKind::TextField]);
    let view = Viewport::new(PageDimensions::letter()).with_scale(2.0).with_offset(Point::new(100.0, 50.0));
    let el = session.drop_at(&ids[0], Point::new(300.0, 250.0), &view).unwrap();
    assert_eq!((el.x, el.y), (100.0, 100.0));
    assert_eq!((el.width, el.height), (200.0, 40.0));
}

#[test]
fn drop_at_constrains_to_page() {
    let (mut session, ids) = session_with(&[ElementKind::TextField]);
    let view = Viewport::new(PageDimensions::letter());
    let el = session.drop_at(&ids[0], Point::new(-30.0, 780.0), &view).unwrap();
    assert_eq!((el.x, el.y), (0.0, 752.0));
}

#[test]
fn drop_at_on_rotated_page() {
    let (mut session, ids) = session_with(&[ElementKind::Checkbox]);
    let view = Viewport::new(PageDimensions::new(612.0, 792.0, Rotation::Deg180));
    let el = session.drop_at(&ids[0], Point::new(500.0, 700.0), &view).unwrap();
    assert_eq!((el.x, el.y), (112.0, 92.0));
}

// =============================================================
// persistence and export
// =============================================================

#[test]
fn load_elements_resyncs_and_drops_stale_selection() {
    let (source, _) = session_with(&[ElementKind::TextField, ElementKind::Checkbox]);
    let json = source.save_elements().unwrap();

    let (mut session, ids) = session_with(&[ElementKind::Dropdown]);
    session.select(&ids[0]);
    session.load_elements(&json).unwrap();
    assert_eq!(session.selection(), None);
    assert_eq!(session.store().len(), 2);
    assert_eq!(session.data().values().len(), 2);
    assert!(session.data().value(&ids[0]).is_none());
}

#[test]
fn load_elements_garbage_keeps_everything() {
    let (mut session, ids) = session_with(&[ElementKind::TextField, ElementKind::Checkbox]);
    session.select(&ids[1]);
    session.drain_changes();
    assert!(session.load_elements("not json").is_err());
    assert_eq!(session.store().len(), 2);
    assert_eq!(session.selection(), Some(ids[1]));
    assert!(session.drain_changes().is_empty());
}

#[test]
fn form_data_round_trip_through_session() {
    let (mut session, ids) = session_with(&[ElementKind::TextField]);
    session.set_rules(ids[0], vec![ValidationRule::required("r")]);
    let json = session.save_form_data().unwrap();

    let mut other = FormSession::new();
    other.load_form_data(&json).unwrap();
    assert_eq!(other.data().rules(&ids[0]), &[ValidationRule::required("r")]);
    assert!(other.load_form_data("[").is_err());
    assert_eq!(other.data().rule_count(), 1);
}

#[test]
fn export_does_not_mutate_session() {
    let (session, _) = session_with(&[ElementKind::TextField, ElementKind::Dropdown]);
    let before = session.store().elements().to_vec();
    let writer = CountingWriter { calls: Cell::new(0) };
    let fields = session.export(&writer, Path::new("a.pdf"), Path::new("b.pdf")).unwrap();
    assert_eq!(writer.calls.get(), 1);
    assert_eq!(fields[1].field_type, FieldType::Dropdown);
    assert_eq!(session.store().elements(), before.as_slice());
}

#[test]
fn clear_resets_session() {
    let (mut session, ids) = session_with(&[ElementKind::TextField]);
    session.set_rules(ids[0], vec![ValidationRule::required("r")]);
    session.select(&ids[0]);
    session.clear();
    assert!(session.store().is_empty());
    assert_eq!(session.data().rule_count(), 0);
    assert_eq!(session.selection(), None);
    assert_eq!(session.drain_changes().last(), Some(&Change::Cleared));
}

#[test]
fn drain_changes_empties_queue() {
    let mut session = FormSession::new();
    let el = session.create(ElementKind::Checkbox, ElementOptions::default());
    assert_eq!(session.drain_changes(), vec![Change::Created(el)]);
    assert!(session.drain_changes().is_empty());
}

#[test]
fn load_elements_drops_rules_of_missing_elements() {
    let (source, kept) = session_with(&[ElementKind::TextField]);
    let layout = source.save_elements().unwrap();

    let mut session = FormSession::new();
    let gone = Uuid::new_v4();
    session.set_rules(kept[0], vec![ValidationRule::min_length(3, "Too short")]);
    session.set_rules(gone, vec![ValidationRule::required("r")]);
    session.drain_changes();

    session.load_elements(&layout).unwrap();
    assert!(session.data().rules(&gone).is_empty());
    assert_eq!(session.data().rules(&kept[0]), &[ValidationRule::min_length(3, "Too short")]);
    assert_eq!(session.validate_all().errors.keys().copied().collect::<Vec<_>>(), vec![kept[0]]);
    assert_eq!(session.drain_changes(), vec![Change::RulesChanged(gone), Change::Loaded { count: 1 }]);
}

#[test]
fn undrained_changes_are_capped() {
    let (mut session, ids) = session_with(&[ElementKind::Checkbox]);
    for _ in 0..MAX_PENDING_CHANGES + 5 {
        session.bring_to_front(&ids[0]);
    }
    session.deselect();
    session.select(&ids[0]);
    assert_eq!(session.pending_changes(), MAX_PENDING_CHANGES);
    let drained = session.drain_changes();
    assert_eq!(drained.last(), Some(&Change::SelectionChanged(Some(ids[0]))));
    assert_eq!(session.pending_changes(), 0);
}
