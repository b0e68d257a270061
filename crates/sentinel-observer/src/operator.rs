//! Operator REST API handlers for runtime instance control.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause ticking |
//! | `POST` | `/api/operator/resume` | Resume ticking |
//! | `POST` | `/api/operator/speed` | Set tick interval (ms) |
//! | `GET` | `/api/operator/status` | Current instance status |
//! | `POST` | `/api/operator/stop` | Trigger clean shutdown |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use sentinel_core::operator::MIN_TICK_INTERVAL_MS;

use crate::error::ObserverError;
use crate::state::AppState;

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds (minimum 100).
    pub tick_interval_ms: u64,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

/// Pause ticking. Player commands and peer merges are still served.
pub async fn pause(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.world.operator().pause();
    Json(OperatorResponse {
        ok: true,
        message: "Ticking paused".to_owned(),
    })
}

/// Resume ticking after a pause.
pub async fn resume(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.world.operator().resume();
    Json(OperatorResponse {
        ok: true,
        message: "Ticking resumed".to_owned(),
    })
}

/// Change the tick interval at runtime.
///
/// The new interval takes effect from the next tick. Values below
/// [`MIN_TICK_INTERVAL_MS`] are rejected.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let prev = state
        .world
        .operator()
        .set_tick_interval_ms(body.tick_interval_ms)
        .ok_or_else(|| {
            ObserverError::InvalidRequest(format!(
                "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            ))
        })?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("Tick interval changed from {}ms to {}ms", prev, body.tick_interval_ms),
        "previous_interval_ms": prev,
        "new_interval_ms": body.tick_interval_ms,
    })))
}

/// Return the current instance status.
///
/// Still answers after the instance has ended, reporting the last tick
/// broadcast.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tick = match state.world.view().await {
        Ok(view) => view.state.tick,
        Err(_closed) => state.last_tick(),
    };
    Json(state.world.operator().status(tick).await)
}

/// Trigger a clean shutdown. The server keeps answering afterwards.
pub async fn stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.world.stop();
    Json(OperatorResponse {
        ok: true,
        message: "Stop requested".to_owned(),
    })
}
