//! Session: one open document's element store, form data, and selection.
//!
//! DESIGN
//! ======
//! A `FormSession` is created and owned by whoever hosts the document (a
//! window, a command invocation); there is no process-wide instance. Every
//! structural mutation goes through the session, which applies it to the
//! store and then resyncs the form data before returning, so the derived
//! values can never lag the element list. Deleting an element also drops its
//! rules and clears the selection if it pointed at it.
//!
//! Each mutation records a [`Change`]. The host drains them with
//! [`FormSession::drain_changes`] to decide what to repaint or persist.
//! At most [`MAX_PENDING_CHANGES`] are held; a host that never drains loses
//! the oldest ones rather than growing without bound.
//!
//! Loading an element list drops the rules of ids it does not contain, so
//! rules saved for an element deleted elsewhere do not outlive it.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::VecDeque;
use std::path::Path;

use crate::consts::MAX_PENDING_CHANGES;
use crate::coords::{Point, Rect, Viewport, constrain_to_page};
use crate::doc::{
    DocError, ElementId, ElementKind, ElementOptions, ElementPatch, ElementProps, ElementStore, FormElement,
    PropertyUpdate,
};
use crate::export::{self, ExportError, FieldDescriptor, FieldWriter};
use crate::form_data::{FormData, FormDataError, ValidationResult};
use crate::rules::{FieldValue, ValidationRule, ValidatorRegistry};

/// What a session mutation did, for the host to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Created(FormElement),
    Updated(FormElement),
    Deleted(ElementId),
    SelectionChanged(Option<ElementId>),
    RulesChanged(ElementId),
    Loaded { count: usize },
    Cleared,
}

/// Element store, form data, and selection for one open document.
///
/// Call [`FormSession::drain_changes`] after handling input; undrained
/// changes beyond [`MAX_PENDING_CHANGES`] are discarded oldest first.
#[derive(Default)]
pub struct FormSession {
    store: ElementStore,
    data: FormData,
    selected: Option<ElementId>,
    changes: VecDeque<Change>,
}

impl FormSession {
    /// A session with an empty validator registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose `custom` rules resolve against `validators`.
    #[must_use]
    pub fn with_validators(validators: ValidatorRegistry) -> Self {
        Self { data: FormData::with_validators(validators), ..Self::default() }
    }

    // --- Element mutations ---

    /// Create an element and resync form values.
    pub fn create(&mut self, kind: ElementKind, options: ElementOptions) -> FormElement {
        let element = self.store.create(kind, options);
        self.resync();
        self.record(Change::Created(element.clone()));
        element
    }

    /// Apply a patch and resync form values. `None` if the id is unknown.
    pub fn update(&mut self, id: &ElementId, patch: ElementPatch) -> Option<FormElement> {
        let element = self.store.update(id, patch)?;
        self.resync();
        self.record(Change::Updated(element.clone()));
        Some(element)
    }

    pub fn update_property(&mut self, id: &ElementId, update: PropertyUpdate) -> Option<FormElement> {
        self.update(id, ElementPatch::property(update))
    }

    /// Delete an element along with its rules and any selection of it.
    pub fn delete(&mut self, id: &ElementId) -> bool {
        if !self.store.delete(id) {
            return false;
        }
        self.data.clear_rules(id);
        if self.selected == Some(*id) {
            self.selected = None;
            self.record(Change::SelectionChanged(None));
        }
        self.resync();
        self.record(Change::Deleted(*id));
        true
    }

    pub fn bring_to_front(&mut self, id: &ElementId) -> Option<FormElement> {
        let element = self.store.bring_to_front(id)?;
        self.record(Change::Updated(element.clone()));
        Some(element)
    }

    pub fn send_to_back(&mut self, id: &ElementId) -> Option<FormElement> {
        let element = self.store.send_to_back(id)?;
        self.record(Change::Updated(element.clone()));
        Some(element)
    }

    /// Move an element so its top-left corner lands under `screen_pt`,
    /// keeping it on the page shown by `view`.
    pub fn drop_at(&mut self, id: &ElementId, screen_pt: Point, view: &Viewport) -> Option<FormElement> {
        let current = self.store.get(id)?;
        let origin = view.to_page(screen_pt);
        let placed = constrain_to_page(Rect::new(origin.x, origin.y, current.width, current.height), &view.page);
        self.update(
            id,
            ElementPatch {
                x: Some(placed.x),
                y: Some(placed.y),
                width: Some(placed.width),
                height: Some(placed.height),
                ..ElementPatch::default()
            },
        )
    }

    /// Write a field value through to the element's property and the value
    /// map. A value of the wrong shape for the element's kind is ignored.
    pub fn set_field_value(&mut self, id: &ElementId, value: FieldValue) -> Option<FormElement> {
        let current = self.store.get(id)?;
        let update = match (&current.props, value) {
            (ElementProps::TextField(_), FieldValue::Text(s)) => PropertyUpdate::Value(s),
            (ElementProps::Checkbox(_), FieldValue::Bool(b)) => PropertyUpdate::Checked(b),
            (ElementProps::Dropdown(_), FieldValue::Text(s)) => PropertyUpdate::SelectedOption(s),
            (ElementProps::SignatureField(_), FieldValue::Text(s)) => PropertyUpdate::SignatureData(Some(s)),
            (ElementProps::SignatureField(_), FieldValue::Null) => PropertyUpdate::SignatureData(None),
            (props, value) => {
                tracing::warn!(%id, kind = %props.kind(), ?value, "value does not fit field kind");
                return Some(current.clone());
            }
        };
        self.update_property(id, update)
    }

    // --- Selection ---

    /// Select an element. Returns false (and leaves the selection alone) if
    /// the id is unknown.
    pub fn select(&mut self, id: &ElementId) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        if self.selected != Some(*id) {
            self.selected = Some(*id);
            self.record(Change::SelectionChanged(self.selected));
        }
        true
    }

    pub fn deselect(&mut self) {
        if self.selected.take().is_some() {
            self.record(Change::SelectionChanged(None));
        }
    }

    #[must_use]
    pub fn selection(&self) -> Option<ElementId> {
        self.selected
    }

    #[must_use]
    pub fn selected_element(&self) -> Option<&FormElement> {
        self.selected.and_then(|id| self.store.get(&id))
    }

    // --- Rules and validation ---

    pub fn set_rules(&mut self, id: ElementId, rules: Vec<ValidationRule>) {
        self.data.set_rules(id, rules);
        self.record(Change::RulesChanged(id));
    }

    pub fn clear_rules(&mut self, id: &ElementId) {
        self.data.clear_rules(id);
        self.record(Change::RulesChanged(*id));
    }

    #[must_use]
    pub fn validate_field(&self, id: &ElementId) -> Vec<String> {
        self.data.validate_field(id)
    }

    #[must_use]
    pub fn validate_all(&self) -> ValidationResult {
        self.data.validate_all()
    }

    // --- Queries ---

    #[must_use]
    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    #[must_use]
    pub fn data(&self) -> &FormData {
        &self.data
    }

    /// Elements on `page` in paint order, bottom first.
    #[must_use]
    pub fn paint_order(&self, page: u32) -> Vec<&FormElement> {
        let mut on_page = self.store.list_by_page(page);
        on_page.sort_by_key(|e| e.paint_z_index(self.selected == Some(e.id)));
        on_page
    }

    /// Topmost element on `page` whose box contains the page-space point.
    #[must_use]
    pub fn hit_test(&self, page: u32, page_pt: Point) -> Option<ElementId> {
        self.paint_order(page).into_iter().rev().find(|e| e.rect().contains(page_pt)).map(|e| e.id)
    }

    // --- Persistence ---

    /// Encode the element list.
    ///
    /// # Errors
    ///
    /// Returns `Json` if encoding fails.
    pub fn save_elements(&self) -> Result<String, DocError> {
        self.store.serialize()
    }

    /// Replace the element list. On success values are resynced, rules and a
    /// selection of vanished elements are cleared; on failure nothing changes.
    ///
    /// # Errors
    ///
    /// Whatever [`ElementStore::deserialize`] reports.
    pub fn load_elements(&mut self, json: &str) -> Result<(), DocError> {
        self.store.deserialize(json)?;
        if self.selected.is_some_and(|id| !self.store.contains(&id)) {
            self.selected = None;
            self.record(Change::SelectionChanged(None));
        }
        let store = &self.store;
        let orphaned = self.data.retain_rules(|id| store.contains(id));
        for id in orphaned {
            tracing::debug!(%id, "dropping rules of missing element");
            self.record(Change::RulesChanged(id));
        }
        self.resync();
        self.record(Change::Loaded { count: self.store.len() });
        Ok(())
    }

    /// Encode values and rules.
    ///
    /// # Errors
    ///
    /// Returns `Json` if encoding fails.
    pub fn save_form_data(&self) -> Result<String, FormDataError> {
        self.data.serialize()
    }

    /// Replace values and rules. Values are taken as loaded; the next
    /// structural mutation resyncs them from the elements.
    ///
    /// # Errors
    ///
    /// Whatever [`FormData::deserialize`] reports.
    pub fn load_form_data(&mut self, json: &str) -> Result<(), FormDataError> {
        self.data.deserialize(json)
    }

    /// Export every element through `writer`. The session is not modified.
    ///
    /// # Errors
    ///
    /// Whatever [`export::export_with`] reports.
    pub fn export<W: FieldWriter + ?Sized>(
        &self,
        writer: &W,
        source: &Path,
        output: &Path,
    ) -> Result<Vec<FieldDescriptor>, ExportError> {
        export::export_with(writer, self.store.elements(), source, output)
    }

    /// Empty the store, the form data, and the selection.
    pub fn clear(&mut self) {
        self.store.clear();
        self.data.clear();
        self.selected = None;
        self.record(Change::Cleared);
    }

    /// Take the changes recorded since the last call.
    pub fn drain_changes(&mut self) -> Vec<Change> {
        self.changes.drain(..).collect()
    }

    /// Number of changes recorded and not yet drained.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    fn record(&mut self, change: Change) {
        if self.changes.len() >= MAX_PENDING_CHANGES {
            self.changes.pop_front();
            tracing::warn!(limit = MAX_PENDING_CHANGES, "change queue full; dropping oldest change");
        }
        self.changes.push_back(change);
    }

    fn resync(&mut self) {
        self.data.sync_from_elements(self.store.elements());
    }
}
