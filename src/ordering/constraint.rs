//! Uniqueness of `(scope, position)` at write time.
//!
//! The sequencer never locks, so this check is what stops two records of one
//! scope from sharing a position. It runs on every insert and re-numbering,
//! and again over the whole document after replicas are merged.

use std::collections::BTreeMap;

use tracing::warn;

use super::sequencer::{OrderedRecord, ScopeFilter};
use crate::error::{CatalogError, CatalogResult};

/// A position held by more than one record of a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePosition {
    pub scope: ScopeFilter,
    pub position: u32,
    pub count: usize,
}

/// Fails with [`CatalogError::Integrity`] if a record of `existing` in `scope`
/// already holds `position`.
///
/// `existing` must not contain the record being written.
pub fn ensure_unique<'a, R, I>(
    entity: &'static str,
    existing: I,
    scope: &ScopeFilter,
    position: u32,
) -> CatalogResult<()>
where
    R: OrderedRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let taken = existing
        .into_iter()
        .any(|record| record.position() == Some(position) && scope.matches(record));

    if taken {
        warn!(entity, %scope, position, "rejected duplicate position");
        return Err(CatalogError::integrity(entity, scope.to_string(), position));
    }
    Ok(())
}

/// Every `(scope, position)` pair held by two or more of `records`, sorted by
/// scope then position. Records without a position are ignored.
pub fn find_duplicates<'a, R, I>(records: I, fields: &[&str]) -> Vec<DuplicatePosition>
where
    R: OrderedRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut counts: BTreeMap<(ScopeFilter, u32), usize> = BTreeMap::new();
    for record in records {
        if let Some(position) = record.position() {
            let scope = ScopeFilter::for_record(record, fields);
            *counts.entry((scope, position)).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((scope, position), count)| DuplicatePosition {
            scope,
            position,
            count,
        })
        .collect()
}
