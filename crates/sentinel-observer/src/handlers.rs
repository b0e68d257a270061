//! REST API endpoint handlers.
//!
//! Every handler goes through the shared [`WorldHandle`], so a response is
//! built from one consistent view of the instance.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/world` | Snapshot, selection, breach and notifications |
//! | `GET` | `/api/factions` | Faction standings |
//! | `GET` | `/api/anomalies` | Open anomalies (`?min_severity=N`) |
//! | `GET` | `/api/intel` | Intel entries (`?limit=N`) |
//! | `GET` | `/api/notifications` | Recent notifications (`?tier=T&limit=N`) |
//! | `POST` | `/api/anomalies/{id}/select` | Select an anomaly |
//! | `POST` | `/api/anomalies/{id}/analyze` | Select and request an advisory |
//! | `GET` | `/api/breach` | Breach session status |
//! | `POST` | `/api/breach` | Arm a breach (`{"anomalyId": ...}`) |
//! | `POST` | `/api/breach/input` | Enter one symbol (`{"color": ...}`) |
//!
//! [`WorldHandle`]: sentinel_core::WorldHandle

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use sentinel_types::{AnomalyId, NotificationTier, SignalColor};

use crate::error::ObserverError;
use crate::state::AppState;

/// Default page size for list endpoints.
const DEFAULT_LIMIT: usize = 50;

/// Upper bound on page size for list endpoints.
const MAX_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Query and body structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/anomalies`.
#[derive(Debug, serde::Deserialize)]
pub struct AnomaliesQuery {
    /// Only return anomalies at or above this severity.
    pub min_severity: Option<u8>,
}

/// Query parameters for `GET /api/intel`.
#[derive(Debug, serde::Deserialize)]
pub struct IntelQuery {
    /// Maximum number of entries to return (default 50, max 100).
    pub limit: Option<usize>,
}

/// Query parameters for `GET /api/notifications`.
#[derive(Debug, serde::Deserialize)]
pub struct NotificationsQuery {
    /// Only return notifications of this tier.
    pub tier: Option<NotificationTier>,
    /// Maximum number of notifications to return (default 50, max 100).
    pub limit: Option<usize>,
}

/// Request body for `POST /api/breach`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateBreachRequest {
    /// Anomaly to breach.
    pub anomaly_id: AnomalyId,
}

/// Request body for `POST /api/breach/input`.
#[derive(Debug, serde::Deserialize)]
pub struct BreachInputRequest {
    /// The symbol entered.
    pub color: SignalColor,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing instance status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    let view = state.world.view().await?;
    let tick = view.state.tick;
    let threat = view.state.threat_level;
    let anomaly_count = view.state.anomalies.len();
    let intel_count = view.state.intel_entries.len();
    let agent_count = view.state.agents.len();
    let agent = &view.self_agent.name;
    let breach = if view.breach.armed { "ARMED" } else { "IDLE" };

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Sentinel</title>
    <style>
        body {{
            background: #05080a;
            color: #b5f5c8;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #3dffa0; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #5f8f72; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #0b1410;
            border: 1px solid #1d3a2a;
            border-radius: 4px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #5f8f72; font-size: 0.85rem; }}
        .metric .value {{ color: #3dffa0; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #3dffa0; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        hr {{ border: none; border-top: 1px solid #1d3a2a; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Sentinel</h1>
    <p class="subtitle">Operative: {agent}</p>

    <div>
        <div class="metric"><div class="label">Tick</div><div class="value">{tick}</div></div>
        <div class="metric"><div class="label">Threat</div><div class="value">{threat}</div></div>
        <div class="metric"><div class="label">Anomalies</div><div class="value">{anomaly_count}</div></div>
        <div class="metric"><div class="label">Intel</div><div class="value">{intel_count}</div></div>
        <div class="metric"><div class="label">Agents</div><div class="value">{agent_count}</div></div>
        <div class="metric"><div class="label">Breach</div><div class="value">{breach}</div></div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/world">/api/world</a> -- Full instance view</li>
        <li><a href="/api/factions">/api/factions</a> -- Faction standings</li>
        <li><a href="/api/anomalies">/api/anomalies</a> -- Open anomalies</li>
        <li><a href="/api/intel">/api/intel</a> -- Intel reports</li>
        <li><a href="/api/notifications">/api/notifications</a> -- Recent notifications</li>
        <li><a href="/api/breach">/api/breach</a> -- Breach status</li>
        <li><a href="/api/operator/status">/api/operator/status</a> -- Operator status</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/ticks</code> -- Live tick summary stream</li>
    </ul>
</body>
</html>"#
    )))
}

// ---------------------------------------------------------------------------
// World reads
// ---------------------------------------------------------------------------

/// Return the full instance view: snapshot, selection, breach status and
/// recent notifications.
pub async fn get_world(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let view = state.world.view().await?;
    Ok(Json(serde_json::to_value(view)?))
}

/// Return faction standings.
pub async fn list_factions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let view = state.world.view().await?;
    Ok(Json(serde_json::json!({
        "count": view.state.factions.len(),
        "factions": view.state.factions,
    })))
}

/// List open anomalies, newest first.
///
/// # Query Parameters
///
/// - `min_severity`: only anomalies at or above this severity.
pub async fn list_anomalies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnomaliesQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let view = state.world.view().await?;
    let min = params.min_severity.unwrap_or(0);
    let anomalies: Vec<_> = view
        .state
        .anomalies
        .into_iter()
        .filter(|a| a.severity >= min)
        .collect();

    Ok(Json(serde_json::json!({
        "count": anomalies.len(),
        "selected": view.selected,
        "anomalies": anomalies,
    })))
}

/// List intel entries, newest first.
pub async fn list_intel(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IntelQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let view = state.world.view().await?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let intel: Vec<_> = view.state.intel_entries.into_iter().take(limit).collect();

    Ok(Json(serde_json::json!({
        "count": intel.len(),
        "intel": intel,
    })))
}

/// List recent notifications, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NotificationsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let view = state.world.view().await?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let notifications: Vec<_> = view
        .notifications
        .into_iter()
        .filter(|n| params.tier.is_none_or(|tier| n.tier == tier))
        .take(limit)
        .collect();

    Ok(Json(serde_json::json!({
        "count": notifications.len(),
        "notifications": notifications,
    })))
}

// ---------------------------------------------------------------------------
// Player actions
// ---------------------------------------------------------------------------

/// Select an anomaly.
pub async fn select_anomaly(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let anomaly = state.world.select(AnomalyId(id)).await?;
    Ok(Json(serde_json::json!({
        "selected": anomaly,
    })))
}

/// Select an anomaly and request an advisory for it.
///
/// Returns `202 Accepted`; the advisory arrives later as an INTEL
/// notification.
pub async fn analyze_anomaly(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    state.world.select(AnomalyId(id)).await?;
    let anomaly = state.world.analyze_selected().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "requested",
            "anomaly": anomaly,
        })),
    ))
}

/// Return the breach session status.
pub async fn get_breach(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let view = state.world.view().await?;
    Ok(Json(view.breach))
}

/// Arm a breach against an anomaly.
///
/// Returns `409 Conflict` if a breach is already armed.
pub async fn initiate_breach(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InitiateBreachRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let status = state.world.initiate_hack(body.anomaly_id).await?;
    Ok(Json(status))
}

/// Enter one breach symbol.
///
/// Input while no breach is armed returns `{"outcome": "ignored"}`.
pub async fn breach_input(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BreachInputRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let outcome = state.world.hack_input(body.color).await?;
    Ok(Json(outcome))
}
