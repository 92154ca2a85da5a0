//! Alerting Core
//!
//! Provides threshold policies, per-entity alert state, and the engine that
//! decides whether an observed signal warrants a new notification.

mod engine;
mod error;
mod policy;
mod snapshot;
mod store;

pub use engine::{AlertEngine, Cadence, Evaluation, Notification};
pub use error::{PolicyError, SnapshotError};
pub use policy::{
    BandedPolicy, FlagPolicy, GateClosed, GlobalGate, OrdinalPolicy, ThresholdPolicy, Tier,
    Tracking,
};
pub use snapshot::{Signal, Snapshot};
pub use store::AlertStore;
