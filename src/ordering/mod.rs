//! Scoped ordering of records.
//!
//! This module provides:
//! - `sequencer`: ScopedSequencer, the OrderedRecord trait and scope filters
//! - `constraint`: the `(scope, position)` uniqueness backstop

pub mod constraint;
pub mod sequencer;

pub use constraint::{ensure_unique, find_duplicates, DuplicatePosition};
pub use sequencer::{
    max_position_in, OrderedRecord, PositionSource, ScopeFilter, ScopeValue, ScopedSequencer,
};
