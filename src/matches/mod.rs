//! Match state and lifecycle
//!
//! `record` holds the per-match state machine, `store` the scope-keyed
//! registry, `assignment` the pure lane-selection rules, and `controller` the
//! orchestration that ties them to the platform gateway.

pub mod assignment;
pub mod controller;
pub mod record;
pub mod store;

pub use controller::MatchController;
pub use record::{LaneEntry, MatchPhase, MatchRecord};
pub use store::MatchStore;
