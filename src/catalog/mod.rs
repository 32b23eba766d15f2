//! Course catalog CRDT module.
//!
//! This module provides:
//! - `model`: Data structures for the catalog (Subject, Course, Module, Content, ContentItem)
//! - `manager`: CatalogManager with sequenced inserts, re-numbering and O(1) targeted updates
//! - `wasm`: WASM bindings for browser usage (JsCatalogManager)

pub mod manager;
pub mod model;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use manager::{CatalogManager, IntegrityReport, Orphan};
pub use model::*;

#[cfg(feature = "wasm")]
pub use wasm::JsCatalogManager;
