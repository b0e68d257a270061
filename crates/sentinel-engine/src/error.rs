//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode that can stop startup. Nothing after startup is fatal except a
//! tick counter overflow, surfaced through [`EngineError::Runner`].

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: sentinel_core::config::ConfigError,
    },

    /// The tick schedule in the configuration is invalid.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: sentinel_core::clock::ClockError,
    },

    /// Advisory configuration in the environment is invalid.
    #[error("advisor error: {source}")]
    Advisor {
        /// The underlying advisor error.
        #[from]
        source: sentinel_advisor::AdvisorError,
    },

    /// The instance runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: sentinel_core::runner::RunnerError,
    },

    /// The API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: sentinel_observer::ServerError,
    },

    /// The instance task panicked or was cancelled.
    #[error("instance task failed: {message}")]
    Join {
        /// Description of the join failure.
        message: String,
    },
}
