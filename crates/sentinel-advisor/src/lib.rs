//! AI advisory client for the Sentinel simulation.
//!
//! Given an anomaly, asks an LLM for a short tactical read. The call may
//! fail or time out; callers that must not fail use
//! [`Advisor::analyze_or_fallback`], which substitutes
//! [`FALLBACK_ADVISORY`]. The only effect an advisory has on the world is
//! the INTEL notification the instance emits when it completes.
//!
//! # Modules
//!
//! - [`config`] -- Environment configuration ([`AdvisorConfig`])
//! - [`error`] -- Error types ([`AdvisorError`])
//! - [`llm`] -- HTTP backends ([`LlmBackend`])

pub mod config;
pub mod error;
pub mod llm;

use std::time::Duration;

use sentinel_types::Anomaly;
use serde::Serialize;
use tracing::{debug, warn};

pub use config::{AdvisorConfig, BackendConfig, BackendType};
pub use error::AdvisorError;
pub use llm::{LlmBackend, Prompt};

/// Text used whenever the advisory service cannot answer.
pub const FALLBACK_ADVISORY: &str =
    "Advisory uplink unavailable. Proceed with standard breach protocol.";

const SYSTEM_PROMPT: &str = "You are a terse tactical intelligence analyst. \
Given a detected anomaly, state in two sentences what it most likely is \
and how an operative should approach it.";

/// A completed advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    /// Advisory text.
    pub text: String,
    /// Whether the text is the fallback rather than a model answer.
    pub fallback: bool,
}

/// Advisory client.
#[derive(Debug, Clone)]
pub enum Advisor {
    /// Calls an LLM backend with a timeout.
    Remote {
        /// The backend.
        backend: LlmBackend,
        /// Per-request timeout.
        timeout: Duration,
    },
    /// No backend; every request falls back.
    Offline,
}

impl Advisor {
    /// Build an advisor from configuration.
    pub fn from_config(config: &AdvisorConfig) -> Self {
        config.backend.as_ref().map_or(Self::Offline, |backend| Self::Remote {
            backend: LlmBackend::new(backend),
            timeout: config.timeout,
        })
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Remote { backend, .. } => backend.name(),
            Self::Offline => "offline",
        }
    }

    /// Ask for an advisory on `anomaly`.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Offline`] without a backend,
    /// [`AdvisorError::Timeout`] if the backend is too slow, or
    /// [`AdvisorError::Backend`] if the call fails.
    pub async fn analyze(&self, anomaly: &Anomaly) -> Result<String, AdvisorError> {
        let Self::Remote { backend, timeout } = self else {
            return Err(AdvisorError::Offline);
        };
        let prompt = build_prompt(anomaly);
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let text = tokio::time::timeout(*timeout, backend.complete(&prompt))
            .await
            .map_err(|_elapsed| AdvisorError::Timeout(millis))??;
        let text = text.trim().to_owned();
        if text.is_empty() {
            return Err(AdvisorError::Backend("empty advisory".to_owned()));
        }
        Ok(text)
    }

    /// Ask for an advisory, substituting [`FALLBACK_ADVISORY`] on failure.
    pub async fn analyze_or_fallback(&self, anomaly: &Anomaly) -> Advisory {
        match self.analyze(anomaly).await {
            Ok(text) => {
                debug!(anomaly = %anomaly.id, backend = self.name(), "Advisory received");
                Advisory {
                    text,
                    fallback: false,
                }
            }
            Err(e) => {
                warn!(anomaly = %anomaly.id, error = %e, "Advisory failed, using fallback");
                Advisory {
                    text: FALLBACK_ADVISORY.to_owned(),
                    fallback: true,
                }
            }
        }
    }
}

/// Render the prompt for one anomaly.
pub fn build_prompt(anomaly: &Anomaly) -> Prompt {
    let faction = anomaly
        .faction
        .map_or_else(|| "unknown".to_owned(), |faction| faction.to_string());
    Prompt {
        system: SYSTEM_PROMPT.to_owned(),
        user: format!(
            "Anomaly {id}\nType: {kind}\nSeverity: {severity}/5\nSuspected faction: {faction}\nReport: {description}",
            id = anomaly.id,
            kind = anomaly.kind.label(),
            severity = anomaly.severity,
            description = anomaly.description,
        ),
    }
}
