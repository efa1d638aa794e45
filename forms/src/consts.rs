//! Shared numeric constants for the forms crate.

// ── Z-order ─────────────────────────────────────────────────────

/// Z-index assigned to the first element of an empty store.
pub const Z_INDEX_BASE: i64 = 100;

/// Spacing between consecutive z-index assignments.
pub const Z_INDEX_STEP: i64 = 10;

/// Added to an element's z-index while it is selected so it paints above
/// everything else without touching the stored value.
pub const SELECTED_Z_BOOST: i64 = 1000;

// ── Default element sizes (page-space points) ───────────────────

pub const TEXT_FIELD_SIZE: (f64, f64) = (200.0, 40.0);
pub const CHECKBOX_SIZE: (f64, f64) = (150.0, 30.0);
pub const DROPDOWN_SIZE: (f64, f64) = (200.0, 40.0);
pub const SIGNATURE_SIZE: (f64, f64) = (300.0, 100.0);

/// Default text field font size in points.
pub const DEFAULT_FONT_SIZE: f64 = 14.0;

// ── Math ────────────────────────────────────────────────────────

/// Tolerance used when comparing transformed coordinates.
pub const COORD_EPSILON: f64 = 1e-6;

// ── Session ─────────────────────────────────────────────────────

/// Most undrained changes a session holds; older ones are dropped first.
pub const MAX_PENDING_CHANGES: usize = 1024;
