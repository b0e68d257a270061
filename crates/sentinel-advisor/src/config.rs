//! Configuration types for the advisory client.
//!
//! Loaded from environment variables. If no backend is configured the
//! advisor runs offline and every request falls back.

use std::time::Duration;

use crate::error::AdvisorError;

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 8_000;

/// Advisor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisorConfig {
    /// Backend to call; `None` means offline.
    pub backend: Option<BackendConfig>,
    /// Maximum time to wait for a response.
    pub timeout: Duration,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl AdvisorConfig {
    /// An offline configuration.
    pub const fn offline() -> Self {
        Self {
            backend: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `ADVISOR_BACKEND` -- `openai`, `deepseek`, `ollama`, `anthropic`
    /// - `ADVISOR_API_URL` -- API base URL
    /// - `ADVISOR_API_KEY` -- API key
    /// - `ADVISOR_MODEL` -- model name
    /// - `ADVISOR_TIMEOUT_MS` -- request timeout (default 8000)
    ///
    /// If `ADVISOR_BACKEND` is unset the advisor is offline.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Config`] if a backend is named but its
    /// settings are incomplete or malformed.
    pub fn from_env() -> Result<Self, AdvisorError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`AdvisorConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AdvisorError> {
        let timeout_ms = match lookup("ADVISOR_TIMEOUT_MS") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AdvisorError::Config(format!("invalid ADVISOR_TIMEOUT_MS: {e}")))?,
            None => DEFAULT_TIMEOUT_MS,
        };
        let timeout = Duration::from_millis(timeout_ms);

        let Some(backend_str) = lookup("ADVISOR_BACKEND") else {
            return Ok(Self {
                backend: None,
                timeout,
            });
        };

        let backend_type = match backend_str.to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => BackendType::OpenAi,
            "anthropic" | "claude" => BackendType::Anthropic,
            other => {
                return Err(AdvisorError::Config(format!("unknown backend type: {other}")));
            }
        };
        let required = |name: &str| {
            lookup(name).ok_or_else(|| AdvisorError::Config(format!("missing required env var {name}")))
        };

        Ok(Self {
            backend: Some(BackendConfig {
                backend_type,
                api_url: required("ADVISOR_API_URL")?,
                api_key: required("ADVISOR_API_KEY")?,
                model: required("ADVISOR_MODEL")?,
            }),
            timeout,
        })
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self::offline()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn no_backend_means_offline() {
        let config = AdvisorConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.backend.is_none());
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn full_backend_parses() {
        let config = AdvisorConfig::from_lookup(lookup(&[
            ("ADVISOR_BACKEND", "Claude"),
            ("ADVISOR_API_URL", "https://api.anthropic.com/v1"),
            ("ADVISOR_API_KEY", "k"),
            ("ADVISOR_MODEL", "m"),
            ("ADVISOR_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();
        let backend = config.backend.unwrap();
        assert_eq!(backend.backend_type, BackendType::Anthropic);
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn incomplete_backend_is_rejected() {
        let result = AdvisorConfig::from_lookup(lookup(&[("ADVISOR_BACKEND", "ollama")]));
        assert!(matches!(result, Err(AdvisorError::Config(_))));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let result = AdvisorConfig::from_lookup(lookup(&[("ADVISOR_BACKEND", "oracle")]));
        assert!(matches!(result, Err(AdvisorError::Config(_))));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let result = AdvisorConfig::from_lookup(lookup(&[("ADVISOR_TIMEOUT_MS", "soon")]));
        assert!(matches!(result, Err(AdvisorError::Config(_))));
    }
}
