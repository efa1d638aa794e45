//! Form element model, validation engine, and page/screen coordinate mapping
//! for the PDF form designer.
//!
//! Everything in this crate is pure and synchronous. The host (a desktop
//! shell, or the `formforge` command line) owns the file dialogs, the page
//! renderer, and the PDF field writer; it calls into this crate in response to
//! user input and feeds the results back to those collaborators.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Caller-owned context tying the store, engine, and selection together |
//! | [`doc`] | Form element types and the in-memory element store |
//! | [`form_data`] | Derived value map and rule evaluation |
//! | [`rules`] | Validation rules, field values, and named custom validators |
//! | [`coords`] | Page-space / screen-space conversions under zoom and rotation |
//! | [`export`] | Field descriptors handed to the PDF field writer |
//! | [`consts`] | Shared numeric constants (z-index spacing, default sizes, etc.) |

pub mod consts;
pub mod coords;
pub mod doc;
pub mod export;
pub mod form_data;
pub mod rules;
pub mod session;
