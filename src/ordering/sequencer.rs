//! Scoped auto-ordering for records that live in a parent's sequence.
//!
//! A [`ScopedSequencer`] hands out the next position inside a partition
//! (all modules of one course, all contents of one module). It is called
//! explicitly right before a record is inserted:
//!
//! ```rust
//! use coursebook::ordering::{OrderedRecord, ScopeValue, ScopedSequencer};
//!
//! #[derive(Clone)]
//! struct Lesson {
//!     course: String,
//!     order: Option<u32>,
//! }
//!
//! impl OrderedRecord for Lesson {
//!     fn position(&self) -> Option<u32> {
//!         self.order
//!     }
//!     fn set_position(&mut self, position: u32) {
//!         self.order = Some(position);
//!     }
//!     fn attribute(&self, name: &str) -> Option<ScopeValue> {
//!         (name == "course").then(|| ScopeValue::from(self.course.as_str()))
//!     }
//! }
//!
//! let sequencer = ScopedSequencer::new(&["course"]);
//! let mut stored: Vec<Lesson> = Vec::new();
//!
//! let mut first = Lesson { course: "c1".into(), order: None };
//! sequencer.assign(&mut first, stored.as_slice()).unwrap();
//! stored.push(first);
//!
//! let mut second = Lesson { course: "c1".into(), order: None };
//! assert_eq!(sequencer.assign(&mut second, stored.as_slice()).unwrap(), 1);
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;

use tracing::debug;

// =============================================================================
// SCOPE VALUES
// =============================================================================

/// Value of one scope attribute (a parent ID), compared by equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeValue(String);

impl fmt::Display for ScopeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeValue {
    fn from(value: &str) -> Self {
        ScopeValue(value.to_string())
    }
}

impl From<String> for ScopeValue {
    fn from(value: String) -> Self {
        ScopeValue(value)
    }
}

// =============================================================================
// ORDERED RECORD
// =============================================================================

/// A persisted record that carries a position within its scope.
pub trait OrderedRecord {
    /// Current position, `None` until one is assigned.
    fn position(&self) -> Option<u32>;

    /// Writes the position attribute.
    fn set_position(&mut self, position: u32);

    /// Resolves a scope attribute by name. Unknown names resolve to `None`.
    fn attribute(&self, name: &str) -> Option<ScopeValue>;
}

// =============================================================================
// SCOPE FILTER
// =============================================================================

/// Equality filter over the scope attributes of a candidate record.
///
/// An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeFilter {
    terms: Vec<(String, Option<ScopeValue>)>,
}

impl ScopeFilter {
    /// Builds the filter from `record`'s values for `fields`, in field order.
    pub fn for_record<R: OrderedRecord + ?Sized>(record: &R, fields: &[&str]) -> Self {
        Self {
            terms: fields
                .iter()
                .map(|field| (field.to_string(), record.attribute(field)))
                .collect(),
        }
    }

    /// Returns true if `record` has the same value for every term.
    pub fn matches<R: OrderedRecord + ?Sized>(&self, record: &R) -> bool {
        self.terms
            .iter()
            .all(|(field, value)| record.attribute(field) == *value)
    }

    /// Returns true if the filter has no terms.
    pub fn is_unscoped(&self) -> bool {
        self.terms.is_empty()
    }

    /// The `(attribute, value)` terms of this filter.
    pub fn terms(&self) -> &[(String, Option<ScopeValue>)] {
        &self.terms
    }
}

impl fmt::Display for ScopeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unscoped() {
            return f.write_str("*");
        }
        for (i, (field, value)) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match value {
                Some(v) => write!(f, "{field}={v}")?,
                None => write!(f, "{field}=null")?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// POSITION SOURCE
// =============================================================================

/// Read side of the persistence layer the sequencer consults.
pub trait PositionSource<R: OrderedRecord> {
    type Error;

    /// Highest position among stored records matching `scope`.
    fn max_position(&self, scope: &ScopeFilter) -> Result<Option<u32>, Self::Error>;
}

/// Highest position held by a record of `records` that matches `scope`.
pub fn max_position_in<'a, R, I>(records: I, scope: &ScopeFilter) -> Option<u32>
where
    R: OrderedRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .filter(|record| scope.matches(*record))
        .filter_map(|record| record.position())
        .max()
}

impl<R: OrderedRecord> PositionSource<R> for [R] {
    type Error = Infallible;

    fn max_position(&self, scope: &ScopeFilter) -> Result<Option<u32>, Infallible> {
        Ok(max_position_in(self, scope))
    }
}

impl<R: OrderedRecord> PositionSource<R> for Vec<R> {
    type Error = Infallible;

    fn max_position(&self, scope: &ScopeFilter) -> Result<Option<u32>, Infallible> {
        Ok(max_position_in(self, scope))
    }
}

impl<R: OrderedRecord> PositionSource<R> for HashMap<String, R> {
    type Error = Infallible;

    fn max_position(&self, scope: &ScopeFilter) -> Result<Option<u32>, Infallible> {
        Ok(max_position_in(self.values(), scope))
    }
}

// =============================================================================
// SEQUENCER
// =============================================================================

/// Computes the position of a new record within the scope named by
/// `for_fields`.
///
/// Stateless: every call reads the source once and never locks. Two callers
/// racing on one scope can compute the same position, so writers must pair
/// it with [`ensure_unique`](super::constraint::ensure_unique).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedSequencer {
    for_fields: &'static [&'static str],
}

impl ScopedSequencer {
    /// Creates a sequencer partitioned by `for_fields`.
    /// An empty list numbers every record of the type in one sequence.
    pub const fn new(for_fields: &'static [&'static str]) -> Self {
        Self { for_fields }
    }

    /// Attribute names that define the scope.
    pub fn for_fields(&self) -> &'static [&'static str] {
        self.for_fields
    }

    /// Builds the scope filter for `record`.
    pub fn scope_of<R: OrderedRecord + ?Sized>(&self, record: &R) -> ScopeFilter {
        ScopeFilter::for_record(record, self.for_fields)
    }

    /// Returns the position `record` should be stored with and writes it onto
    /// the record.
    ///
    /// An explicit position is returned untouched. Otherwise the result is one
    /// past the highest stored position in the record's scope, or 0 for an
    /// empty scope.
    pub fn assign<R, S>(&self, record: &mut R, source: &S) -> Result<u32, S::Error>
    where
        R: OrderedRecord,
        S: PositionSource<R> + ?Sized,
    {
        if let Some(position) = record.position() {
            return Ok(position);
        }

        let scope = self.scope_of(record);
        // u32::MAX saturates into a collision, which the uniqueness check rejects.
        let position = match source.max_position(&scope)? {
            Some(last) => last.saturating_add(1),
            None => 0,
        };

        debug!(%scope, position, "assigned position");
        record.set_position(position);
        Ok(position)
    }

    /// [`assign`](Self::assign) for sources that cannot fail.
    pub fn assign_local<R, S>(&self, record: &mut R, source: &S) -> u32
    where
        R: OrderedRecord,
        S: PositionSource<R, Error = Infallible> + ?Sized,
    {
        match self.assign(record, source) {
            Ok(position) => position,
            Err(never) => match never {},
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
