//! Error types for the course catalog.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while reading or writing the catalog document.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Automerge error during document operations.
    #[error("Automerge error: {0}")]
    Automerge(#[from] automerge::AutomergeError),

    /// Autosurgeon hydration error.
    #[error("Hydration error: {0}")]
    Hydrate(#[from] autosurgeon::HydrateError),

    /// Autosurgeon reconcile error.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] autosurgeon::ReconcileError),

    /// Record not found in the document.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Two records of one scope hold the same position.
    #[error("Integrity error: {entity} position {position} already taken in scope {scope}")]
    Integrity {
        entity: &'static str,
        scope: String,
        position: u32,
    },

    /// Slug already used by another record of the same entity.
    #[error("Duplicate {entity} slug: {slug}")]
    DuplicateSlug { entity: &'static str, slug: String },

    /// Text field longer than its column allows.
    #[error("Field '{field}' is {length} chars, max is {max}")]
    FieldTooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },

    /// Caller does not own the record it tried to change.
    #[error("Permission denied: {owner} does not own {entity} {id}")]
    PermissionDenied {
        entity: &'static str,
        id: String,
        owner: String,
    },

    /// Content kind name outside text/file/image/video.
    #[error("Unknown content kind: {0}")]
    UnknownContentKind(String),

    /// Schema violation - document structure is invalid.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// A record whose parent no longer exists, typically after a merge
    /// where one replica deleted the parent while another added to it.
    #[error("Orphaned {entity} {id}: missing {parent}")]
    Orphaned {
        entity: &'static str,
        id: String,
        parent: String,
    },

    /// JSON snapshot serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CatalogError {
    /// Creates a NotFound error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an Integrity error.
    pub fn integrity(entity: &'static str, scope: impl Into<String>, position: u32) -> Self {
        Self::Integrity {
            entity,
            scope: scope.into(),
            position,
        }
    }

    /// Creates a DuplicateSlug error.
    pub fn duplicate_slug(entity: &'static str, slug: impl Into<String>) -> Self {
        Self::DuplicateSlug {
            entity,
            slug: slug.into(),
        }
    }

    /// Creates a PermissionDenied error.
    pub fn permission_denied(
        entity: &'static str,
        id: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::PermissionDenied {
            entity,
            id: id.into(),
            owner: owner.into(),
        }
    }

    /// Creates a SchemaViolation error.
    pub fn schema_violation(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }

    /// True for uniqueness failures raised at write time.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
