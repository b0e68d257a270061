//! Simulation rules for the Sentinel world.
//!
//! Everything in this crate is synchronous and free of I/O. It operates on
//! the snapshot types from `sentinel-types`; the tick loop, sync and
//! persistence live in `sentinel-core` and `sentinel-store`.
//!
//! # Modules
//!
//! - [`anomaly`] -- Per-tick anomaly spawning ([`AnomalyGenerator`])
//! - [`bounded`] -- Newest-first capped logs
//! - [`breach`] -- Breach minigame state machine ([`BreachSession`])
//! - [`error`] -- Error types ([`BreachError`])
//! - [`reputation`] -- Faction score deltas and tiers
//! - [`world`] -- Initial snapshot and agent helpers

pub mod anomaly;
pub mod bounded;
pub mod breach;
pub mod error;
pub mod reputation;
pub mod world;

pub use anomaly::{AnomalyGenerator, SpawnedAnomaly, insert_anomaly};
pub use breach::{
    BREACH_SOURCE, BreachResolution, BreachSession, BreachStatus, InputOutcome,
};
pub use error::BreachError;
pub use reputation::{ReputationChange, apply_breach_failure, apply_breach_success, tier_of};
pub use world::{
    Repairs, enforce_bounds, ensure_agent, initial_state, normalize, sweep_narrative, touch_agent,
};
