//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin renderer access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/ticks` -- `WebSocket` tick summary stream
/// - `GET /api/world` -- consistent instance view
/// - `GET /api/factions`, `/api/anomalies`, `/api/intel`,
///   `/api/notifications` -- snapshot sections
/// - `POST /api/anomalies/{id}/select` and `/analyze`
/// - `GET|POST /api/breach`, `POST /api/breach/input`
/// - `/api/operator/*` -- operator controls
///
/// CORS is configured to allow any origin for development.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/ticks", get(ws::ws_ticks))
        // World reads
        .route("/api/world", get(handlers::get_world))
        .route("/api/factions", get(handlers::list_factions))
        .route("/api/anomalies", get(handlers::list_anomalies))
        .route("/api/intel", get(handlers::list_intel))
        .route("/api/notifications", get(handlers::list_notifications))
        // Player actions
        .route("/api/anomalies/{id}/select", post(handlers::select_anomaly))
        .route("/api/anomalies/{id}/analyze", post(handlers::analyze_anomaly))
        .route(
            "/api/breach",
            get(handlers::get_breach).post(handlers::initiate_breach),
        )
        .route("/api/breach/input", post(handlers::breach_input))
        // Operator
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/stop", post(operator::stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
