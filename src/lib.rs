//! Coursebook - course catalog document with scope-ordered modules and contents.
//!
//! This crate stores a catalog of subjects, courses, modules and content items
//! in an Automerge document, using Autosurgeon for automatic CRDT serialization:
//!
//! - **Scoped ordering**: modules are numbered per course and contents per
//!   module, starting at 0 and continuing after the highest position in use
//! - **Explicit positions**: a caller-supplied position is kept as is, and the
//!   next appended record continues after it
//! - **Uniqueness backstop**: a position already taken in its scope fails the
//!   write; duplicates introduced by merging replicas are reported by
//!   `verify_integrity`
//!
//! # Example
//!
//! ```rust
//! use coursebook::{CatalogManager, Course, Module, Subject};
//!
//! let mut manager = CatalogManager::new();
//! let subject = manager.create_subject(Subject::new("Programming", "programming")).unwrap();
//! let course = manager
//!     .create_course(Course::new("ana", &subject.id, "Rust 101", "rust-101"))
//!     .unwrap();
//!
//! let intro = manager.create_module("ana", Module::new(&course.id, "Intro")).unwrap();
//! let pinned = manager
//!     .create_module("ana", Module::new(&course.id, "Pinned").with_order(5))
//!     .unwrap();
//! let next = manager.create_module("ana", Module::new(&course.id, "Next")).unwrap();
//!
//! assert_eq!(intro.order, Some(0));
//! assert_eq!(pinned.order, Some(5));
//! assert_eq!(next.order, Some(6));
//!
//! let bytes = manager.save();
//! ```

pub mod error;

// Ordering primitives
pub mod ordering;

// Catalog document
pub mod catalog;

// Re-exports for convenience
pub use catalog::{
    CatalogManager, CatalogRoot, Content, ContentItem, ContentKind, Course, IntegrityReport,
    ItemBody, Module, Orphan, Subject,
};
pub use error::{CatalogError, CatalogResult};
pub use ordering::{OrderedRecord, ScopeFilter, ScopeValue, ScopedSequencer};

#[cfg(feature = "wasm")]
pub use catalog::wasm::JsCatalogManager;
