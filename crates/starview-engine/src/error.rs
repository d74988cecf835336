use starview_rules::CatalogError;
use starview_types::BadgeSlug;
use thiserror::Error;

/// Failure of a collaborator read or write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("no {table} row with id {id}")]
    NotFound { table: &'static str, id: i64 },
    #[error("corrupt {table} row: {reason}")]
    Corrupt { table: &'static str, reason: String },
    #[error("invalid badge definition '{slug}': {reason}")]
    InvalidDefinition { slug: String, reason: String },
}

impl StoreError {
    pub(crate) fn corrupt(table: &'static str, reason: impl ToString) -> Self {
        Self::Corrupt {
            table,
            reason: reason.to_string(),
        }
    }
}

/// Errors surfaced to the caller of the engine.
///
/// Aggregate and ledger failures inside a trigger are not part of this type;
/// they are logged and reported in the outcome instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    /// An unreadable definition row is a catalog problem, not a storage one.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidDefinition { slug, reason } => {
                Self::Catalog(CatalogError::InvalidDefinition { slug, reason })
            }
            err => Self::Store(err),
        }
    }
}

/// Rejected pin request. Nothing is written when any of these is returned.
#[derive(Debug, Error)]
pub enum PinError {
    #[error("cannot pin {requested} badges, the limit is {max}")]
    TooMany { requested: usize, max: usize },
    #[error("badge '{0}' requested more than once")]
    Duplicate(BadgeSlug),
    #[error("unknown badge '{0}'")]
    UnknownBadge(String),
    #[error("badge '{0}' is not held")]
    NotHeld(BadgeSlug),
    #[error(transparent)]
    Catalog(CatalogError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<EngineError> for PinError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Catalog(err) => Self::Catalog(err),
            EngineError::Store(err) => Self::Store(err),
        }
    }
}
