//! Pure badge rules: catalog validation, tier sweeps, progress partitioning
//! and the activity trigger table. No storage, no clocks beyond what callers
//! pass in.

pub mod anomaly;
pub mod catalog;
pub mod error;
pub mod invariants;
pub mod progress;
pub mod seed;
pub mod sweep;
pub mod triggers;

pub use anomaly::BurstPolicy;
pub use catalog::BadgeCatalog;
pub use error::{CatalogError, CatalogViolation};
pub use invariants::validate_catalog;
pub use progress::{MAX_UNEARNED_PERCENT, build_snapshot, progress_percentage};
pub use seed::default_catalog;
pub use sweep::{SweepMode, SweepPlan, plan_sweep, stale_holdings};
pub use triggers::{Binding, Target, TriggerPlan, binding_table, plan_for};
