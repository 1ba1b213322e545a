use uuid::Uuid;

/// Errors raised by the storage layer behind the repository traits.
///
/// Both the in-memory store and the PostgreSQL store report constraint
/// failures through the same variants so the services above them can map
/// them without knowing which backend is wired in.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Version conflict on {entity} {id}: expected version {expected}")]
    VersionConflict {
        entity: &'static str,
        id: Uuid,
        expected: i64,
    },

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
