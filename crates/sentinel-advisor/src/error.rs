//! Error types for the advisory client.
//!
//! None of these reach the world: [`Advisor::analyze_or_fallback`]
//! replaces any failure with the fixed fallback text.
//!
//! [`Advisor::analyze_or_fallback`]: crate::Advisor::analyze_or_fallback

/// Errors that can occur while requesting an advisory.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    /// No backend is configured.
    #[error("advisor offline: no backend configured")]
    Offline,

    /// The backend returned an error or was unreachable.
    #[error("advisor backend error: {0}")]
    Backend(String),

    /// The backend did not answer in time.
    #[error("advisor timed out after {0} ms")]
    Timeout(u64),

    /// Configuration is invalid.
    #[error("advisor config error: {0}")]
    Config(String),
}
