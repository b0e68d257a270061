//! Server startup helper for embedding in the engine binary.
//!
//! [`spawn_observer`] binds eagerly, so a taken port fails startup instead
//! of a background task, then serves on its own Tokio task.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Bind and spawn the API server on a background task.
///
/// The returned handle resolves when the server stops; abort it on
/// shutdown.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, ServerError> {
    let listener = server::bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "API server exited with error");
        }
    });

    tracing::info!(host = %config.host, port = config.port, "API server spawned on background task");

    Ok(handle)
}
