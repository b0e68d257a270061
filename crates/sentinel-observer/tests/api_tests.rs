//! Integration tests for the API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Each test runs a real paused instance with sync
//! disabled and an offline advisor, so nothing external is needed.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use sentinel_advisor::Advisor;
use sentinel_core::{
    InstanceSettings, NoOpCallback, OperatorState, Services, SyncTransport, WorldClock,
    WorldInstance, spawn_instance,
};
use sentinel_observer::router::build_router;
use sentinel_observer::state::{AppState, TickBroadcast};
use sentinel_sim::{AnomalyGenerator, world};
use sentinel_types::{Agent, Anomaly, AnomalyId, AnomalyKind, Faction, Position, SignalColor};
use serde_json::Value;
use tower::ServiceExt;

fn anomaly(tick: u64, severity: u8, faction: Option<Faction>) -> Anomaly {
    Anomaly {
        id: AnomalyId::for_tick(tick),
        kind: AnomalyKind::DevicePing,
        description: "Unregistered device answering pings.".to_owned(),
        severity,
        faction,
    }
}

async fn make_test_state() -> Arc<AppState> {
    let me = Agent::new("TestOperative", Position::default());
    let mut state = world::initial_state(&me);
    state.tick = 12;
    state.anomalies = vec![
        anomaly(11, 4, Some(Faction::StreetCollective)),
        anomaly(7, 2, None),
    ];
    let settings = InstanceSettings {
        clock: WorldClock::default(),
        generator: AnomalyGenerator::new(0.0),
        seed: Some(3),
    };
    let (instance, effects) = WorldInstance::new(state, me, settings);
    let services = Services {
        transport: SyncTransport::Disabled,
        store: None,
        advisor: Advisor::Offline,
    };
    let operator = Arc::new(OperatorState::new(1_000, 0));
    operator.pause();
    let (handle, _join) =
        spawn_instance(instance, effects, services, operator, Box::new(NoOpCallback))
            .await
            .unwrap();
    Arc::new(AppState::new(handle))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(router: &Router, path: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn colors(sequence: &Value) -> Vec<SignalColor> {
    serde_json::from_value(sequence.clone()).unwrap()
}

// =========================================================================
// Reads
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let router = build_router(make_test_state().await);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_get_world() {
    let router = build_router(make_test_state().await);
    let (status, json) = get(&router, "/api/world").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"]["tick"], 12);
    assert_eq!(json["state"]["threatLevel"], "green");
    assert_eq!(json["selfAgent"]["name"], "TestOperative");
    assert_eq!(json["breach"]["armed"], false);
    assert!(json["selected"].is_null());
}

#[tokio::test]
async fn test_list_factions() {
    let router = build_router(make_test_state().await);
    let (status, json) = get(&router, "/api/factions").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    let broker = json["factions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "Information Broker")
        .unwrap();
    assert_eq!(broker["score"], 10);
    assert_eq!(broker["tier"], "Neutral");
}

#[tokio::test]
async fn test_list_anomalies_filters_by_severity() {
    let router = build_router(make_test_state().await);

    let (_, all) = get(&router, "/api/anomalies").await;
    assert_eq!(all["count"], 2);

    let (status, severe) = get(&router, "/api/anomalies?min_severity=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(severe["count"], 1);
    assert_eq!(severe["anomalies"][0]["id"], "ANOM-11");
}

#[tokio::test]
async fn test_list_intel_starts_empty() {
    let router = build_router(make_test_state().await);
    let (status, json) = get(&router, "/api/intel?limit=5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
}

// =========================================================================
// Player actions
// =========================================================================

#[tokio::test]
async fn test_select_anomaly() {
    let router = build_router(make_test_state().await);
    let (status, json) = post(&router, "/api/anomalies/ANOM-7/select", Value::Null).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["selected"]["severity"], 2);
    let (_, world) = get(&router, "/api/world").await;
    assert_eq!(world["selected"], "ANOM-7");
}

#[tokio::test]
async fn test_select_unknown_anomaly_is_404() {
    let router = build_router(make_test_state().await);
    let (status, json) = post(&router, "/api/anomalies/ANOM-999/select", Value::Null).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_analyze_is_accepted() {
    let router = build_router(make_test_state().await);
    let (status, json) = post(&router, "/api/anomalies/ANOM-11/analyze", Value::Null).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["anomaly"]["id"], "ANOM-11");
}

#[tokio::test]
async fn test_breach_success_flow() {
    let router = build_router(make_test_state().await);

    let (status, armed) = post(
        &router,
        "/api/breach",
        serde_json::json!({ "anomalyId": "ANOM-11" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(armed["armed"], true);
    let sequence = colors(&armed["sequence"]);
    assert_eq!(sequence.len(), 4);

    let mut last = Value::Null;
    for color in sequence {
        let (status, outcome) = post(
            &router,
            "/api/breach/input",
            serde_json::json!({ "color": color }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        last = outcome;
    }
    assert_eq!(last["outcome"], "success");
    assert_eq!(last["anomalyRemoved"], true);

    let (_, intel) = get(&router, "/api/intel").await;
    assert_eq!(intel["count"], 1);
    assert_eq!(intel["intel"][0]["classification"], "CONFIDENTIAL");

    let (_, breach) = get(&router, "/api/breach").await;
    assert_eq!(breach["armed"], false);
}

#[tokio::test]
async fn test_second_breach_is_conflict() {
    let router = build_router(make_test_state().await);
    let body = serde_json::json!({ "anomalyId": "ANOM-7" });

    let (first, _) = post(&router, "/api/breach", body.clone()).await;
    assert_eq!(first, StatusCode::OK);
    let (second, _) = post(&router, "/api/breach", body).await;
    assert_eq!(second, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_input_while_idle_is_ignored() {
    let router = build_router(make_test_state().await);
    let (status, json) = post(
        &router,
        "/api/breach/input",
        serde_json::json!({ "color": "RED" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "ignored");
}

#[tokio::test]
async fn test_armed_breach_chirps() {
    let router = build_router(make_test_state().await);
    post(
        &router,
        "/api/breach",
        serde_json::json!({ "anomalyId": "ANOM-7" }),
    )
    .await;

    let (status, json) = get(&router, "/api/notifications?tier=CHIRP").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["notifications"][0]["tier"], "CHIRP");
}

// =========================================================================
// Operator
// =========================================================================

#[tokio::test]
async fn test_operator_status_reports_paused() {
    let router = build_router(make_test_state().await);
    let (status, json) = get(&router, "/api/operator/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tick"], 12);
    assert_eq!(json["paused"], true);
    assert_eq!(json["tick_interval_ms"], 1000);
}

#[tokio::test]
async fn test_operator_speed_rejects_too_fast() {
    let router = build_router(make_test_state().await);
    let (status, _) = post(
        &router,
        "/api/operator/speed",
        serde_json::json!({ "tick_interval_ms": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post(
        &router,
        "/api/operator/speed",
        serde_json::json!({ "tick_interval_ms": 250 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["previous_interval_ms"], 1000);
}

#[tokio::test]
async fn test_operator_stop_closes_instance() {
    let state = make_test_state().await;
    let router = build_router(Arc::clone(&state));

    let (status, _) = post(&router, "/api/operator/stop", Value::Null).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while state.world.is_running() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let (status, _) = get(&router, "/api/world").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, json) = get(&router, "/api/operator/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["end_reason"], "OperatorStop");
}

// =========================================================================
// Broadcast
// =========================================================================

#[tokio::test]
async fn test_broadcast_with_no_receivers() {
    let state = make_test_state().await;
    let summary = TickBroadcast {
        tick: 13,
        threat_level: sentinel_types::ThreatLevel::Green,
        spawned: None,
        swept: false,
        threat_decayed: false,
        anomaly_count: 2,
        intel_count: 0,
        agent_count: 1,
    };
    assert_eq!(state.broadcast(&summary), 0);
    assert_eq!(state.last_tick(), 13);
}

#[tokio::test]
async fn test_broadcast_reaches_subscriber() {
    let state = make_test_state().await;
    let mut rx = state.subscribe();
    let summary = TickBroadcast {
        tick: 14,
        threat_level: sentinel_types::ThreatLevel::Amber,
        spawned: Some(AnomalyId::for_tick(14)),
        swept: false,
        threat_decayed: false,
        anomaly_count: 3,
        intel_count: 0,
        agent_count: 1,
    };
    assert_eq!(state.broadcast(&summary), 1);
    assert_eq!(rx.recv().await.unwrap(), summary);
}
