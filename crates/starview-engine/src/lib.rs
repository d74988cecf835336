mod catalog_cache;
mod config;
mod engine;
mod error;
mod pins;
mod progress_cache;
mod reconcile;
mod sqlite;
mod store;

pub use catalog_cache::CatalogCache;
pub use config::{EngineConfig, MAX_PINNED_BADGES};
pub use engine::{BadgeChange, BadgeEngine, Collaborators, EvaluationFailure, TriggerOutcome};
pub use error::{EngineError, PinError, StoreError};
pub use progress_cache::{Generation, ProgressCache};
pub use reconcile::{ReconcileFailure, ReconcileReport};
pub use sqlite::{Recorded, SqliteStore};
pub use store::{
    AppliedChange, AuditTrail, CatalogSource, FactStore, Ledger, PinStore, aggregate_for,
};
