//! lakescope miller-columns picker.
//!
//! A headless, incremental hierarchical selection component: columns of scope
//! nodes loaded page by page from a [`lakescope_api::ScopeApi`], with selection
//! and disable state synchronised from the embedding view. Rendering is left to
//! the caller; [`shell::render_text`] is a plain-text fallback.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod selection;
pub mod shell;
pub mod source;

pub use config::PickerConfig;
pub use error::{PickerError, PickerResult};
pub use selection::{derive_id_set, SelectionState};
pub use shell::{render_text, ClickOutcome, ColumnView, MillerColumns, PickerView, RowView, ScrollPosition};
pub use source::{Applied, Listing, ScopeSource};
