//! Error types for the sentinel-sim crate.

use sentinel_types::AnomalyId;

/// Errors raised by the breach minigame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BreachError {
    /// A breach is already armed; only one may run at a time.
    #[error("breach already armed on {target}")]
    AlreadyArmed {
        /// The anomaly the armed breach targets.
        target: AnomalyId,
    },
}
