//! Integration tests for running instances side by side.
//!
//! Two instances share an in-process [`LocalBus`] the way two windows of
//! the same session share a broadcast channel. Nothing external is needed.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::sync::Arc;
use std::time::Duration;

use sentinel_advisor::Advisor;
use sentinel_core::config::{SyncConfig, TransportKind};
use sentinel_core::sync::LOCAL_BUS_CAPACITY;
use sentinel_core::{
    InstanceSettings, LocalBus, NoOpCallback, OperatorState, Services, SyncTransport,
    WorldClock, WorldHandle, WorldInstance, WorldView, spawn_instance,
};
use sentinel_sim::{AnomalyGenerator, InputOutcome, world};
use sentinel_types::{
    Agent, Anomaly, AnomalyId, AnomalyKind, Classification, Faction, NotificationTier, Position,
    RepTier, ThreatLevel,
};

const WAIT: Duration = Duration::from_secs(5);

fn settings(probability: f64) -> InstanceSettings {
    InstanceSettings {
        clock: WorldClock::default(),
        generator: AnomalyGenerator::new(probability),
        seed: Some(7),
    }
}

async fn local_transport(bus: &LocalBus) -> SyncTransport {
    let config = SyncConfig {
        transport: TransportKind::Local,
        ..SyncConfig::default()
    };
    SyncTransport::connect(&config, bus).await
}

async fn start(
    bus: &LocalBus,
    name: &str,
    anomalies: Vec<Anomaly>,
    operator: Arc<OperatorState>,
) -> WorldHandle {
    let me = Agent::new(name, Position::default());
    let mut state = world::initial_state(&me);
    state.anomalies = anomalies;
    let (instance, effects) = WorldInstance::new(state, me, settings(0.0));
    let services = Services {
        transport: local_transport(bus).await,
        store: None,
        advisor: Advisor::Offline,
    };
    let (handle, _join) =
        spawn_instance(instance, effects, services, operator, Box::new(NoOpCallback))
            .await
            .unwrap();
    handle
}

fn paused() -> Arc<OperatorState> {
    let operator = Arc::new(OperatorState::new(1_000, 0));
    operator.pause();
    operator
}

async fn wait_for(handle: &WorldHandle, check: impl Fn(&WorldView) -> bool) -> WorldView {
    tokio::time::timeout(WAIT, async {
        loop {
            let view = handle.view().await.unwrap();
            if check(&view) {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}

fn anomaly(tick: u64, severity: u8, faction: Option<Faction>) -> Anomaly {
    Anomaly {
        id: AnomalyId::for_tick(tick),
        kind: AnomalyKind::SignalAnomaly,
        description: "Encrypted burst on a dead frequency.".to_owned(),
        severity,
        faction,
    }
}

#[tokio::test]
async fn ticking_instance_drives_paused_peer() {
    let bus = LocalBus::new("sentinel-world-sync", LOCAL_BUS_CAPACITY);
    let follower = start(&bus, "Wraith", Vec::new(), paused()).await;
    let leader = start(&bus, "Ghost", Vec::new(), Arc::new(OperatorState::new(5, 3))).await;

    let view = wait_for(&follower, |v| v.state.tick == 3).await;
    assert!(view.state.agent(leader.self_id()).is_some());
    assert!(view.state.agent(follower.self_id()).is_some());
    assert_eq!(view.self_agent.id, follower.self_id());
}

#[tokio::test]
async fn breach_success_reaches_peer() {
    let bus = LocalBus::new("sentinel-world-sync", LOCAL_BUS_CAPACITY);
    let target = anomaly(4, 3, Some(Faction::InformationBroker));
    let peer = start(&bus, "Wraith", vec![target.clone()], paused()).await;
    let player = start(&bus, "Ghost", vec![target.clone()], paused()).await;

    let status = player.initiate_hack(target.id.clone()).await.unwrap();
    assert_eq!(status.sequence.len(), 3);
    let mut outcome = InputOutcome::Ignored;
    for color in status.sequence {
        outcome = player.hack_input(color).await.unwrap();
    }
    assert!(matches!(outcome, InputOutcome::Success(_)));

    let view = wait_for(&peer, |v| v.state.intel_entries.len() == 1).await;
    assert!(view.state.anomaly(&target.id).is_none());
    let intel = &view.state.intel_entries[0];
    assert_eq!(intel.classification, Classification::Confidential);
    // Broker starts at 10 and takes the -10; the others gain 5 each.
    let broker = view.state.faction(Faction::InformationBroker).unwrap();
    assert_eq!(broker.score(), 0);
    assert_eq!(broker.tier(), RepTier::Neutral);
    for other in [Faction::CorporateSecurity, Faction::StreetCollective] {
        assert_eq!(view.state.faction(other).unwrap().score(), 5);
    }
    assert!(
        view.notifications
            .iter()
            .any(|n| n.tier == NotificationTier::Chirp)
    );
}

#[tokio::test]
async fn breach_failure_locks_down_every_instance() {
    let bus = LocalBus::new("sentinel-world-sync", LOCAL_BUS_CAPACITY);
    let target = anomaly(9, 5, None);
    let peer = start(&bus, "Wraith", vec![target.clone()], paused()).await;
    let player = start(&bus, "Ghost", vec![target.clone()], paused()).await;

    let status = player.initiate_hack(target.id.clone()).await.unwrap();
    assert_eq!(status.sequence.len(), 5);
    let first = status.sequence[0];
    let wrong = sentinel_types::SignalColor::ALL
        .into_iter()
        .find(|c| *c != first)
        .unwrap();
    assert!(matches!(
        player.hack_input(wrong).await.unwrap(),
        InputOutcome::Failure(_)
    ));

    let view = wait_for(&peer, |v| v.state.threat_level == ThreatLevel::Hot).await;
    assert!(view.state.anomaly(&target.id).is_some());
    assert!(
        view.notifications
            .iter()
            .any(|n| n.tier == NotificationTier::Lockdown)
    );
}

#[tokio::test]
async fn offline_advisory_arrives_as_intel_notification() {
    let bus = LocalBus::new("sentinel-world-sync", LOCAL_BUS_CAPACITY);
    let target = anomaly(2, 2, None);
    let player = start(&bus, "Ghost", vec![target.clone()], paused()).await;

    player.select(target.id.clone()).await.unwrap();
    player.analyze_selected().await.unwrap();

    let view = wait_for(&player, |v| {
        v.notifications.iter().any(|n| n.tier == NotificationTier::Intel)
    })
    .await;
    let intel = view
        .notifications
        .iter()
        .find(|n| n.tier == NotificationTier::Intel)
        .unwrap();
    assert!(intel.message.contains(sentinel_advisor::FALLBACK_ADVISORY));
    // Advisories never touch the snapshot.
    assert!(view.state.intel_entries.is_empty());
}
