//! Shared application state for the API server.
//!
//! [`AppState`] holds the [`TickFeed`] for tick summaries and the
//! [`WorldHandle`] every endpoint talks to.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sentinel_core::{TickSummary, WorldHandle};
use sentinel_types::{AnomalyId, ThreatLevel, WorldState};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel for tick summaries.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// JSON-serializable tick summary pushed over the `WebSocket`.
///
/// A lightweight projection of [`TickSummary`] plus a few counts from the
/// snapshot the tick produced.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickBroadcast {
    /// The tick number.
    pub tick: u64,
    /// Threat level after the tick.
    pub threat_level: ThreatLevel,
    /// Anomaly spawned this tick, if any.
    pub spawned: Option<AnomalyId>,
    /// Whether a periodic sweep narrative was written.
    pub swept: bool,
    /// Whether the threat level decayed this tick.
    pub threat_decayed: bool,
    /// Open anomalies after the tick.
    pub anomaly_count: usize,
    /// Intel entries after the tick.
    pub intel_count: usize,
    /// Known agents after the tick.
    pub agent_count: usize,
}

impl TickBroadcast {
    /// Project a tick summary and its resulting snapshot.
    pub fn new(summary: &TickSummary, state: &WorldState) -> Self {
        Self {
            tick: summary.tick,
            threat_level: summary.threat_level,
            spawned: summary.spawned.as_ref().map(|anomaly| anomaly.id.clone()),
            swept: summary.swept,
            threat_decayed: summary.threat_step.is_some(),
            anomaly_count: state.anomalies.len(),
            intel_count: state.intel_entries.len(),
            agent_count: state.agents.len(),
        }
    }
}

/// Broadcast side of the tick stream.
///
/// Created before the instance is spawned so the tick callback can hold
/// one end while [`AppState`] holds the other.
#[derive(Debug, Clone)]
pub struct TickFeed {
    tx: broadcast::Sender<TickBroadcast>,
    last_tick: Arc<AtomicU64>,
}

impl TickFeed {
    /// Create a feed with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            last_tick: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to tick broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<TickBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a tick summary to all connected clients.
    ///
    /// Returns the number of receivers that received the message.
    /// Returns 0 if no clients are connected (this is not an error).
    pub fn broadcast(&self, summary: &TickBroadcast) -> usize {
        self.last_tick.store(summary.tick, Ordering::Release);
        self.tx.send(summary.clone()).unwrap_or(0)
    }

    /// Tick number of the most recent broadcast.
    pub fn last_tick(&self) -> u64 {
        self.last_tick.load(Ordering::Acquire)
    }
}

impl Default for TickFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Tick stream for `WebSocket` clients.
    pub feed: TickFeed,
    /// Handle to the running instance.
    pub world: WorldHandle,
}

impl AppState {
    /// Create application state with a fresh tick feed.
    pub fn new(world: WorldHandle) -> Self {
        Self::with_feed(world, TickFeed::new())
    }

    /// Create application state around an existing tick feed.
    pub const fn with_feed(world: WorldHandle, feed: TickFeed) -> Self {
        Self { feed, world }
    }

    /// Subscribe to the tick broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TickBroadcast> {
        self.feed.subscribe()
    }

    /// Publish a tick summary to all connected clients.
    pub fn broadcast(&self, summary: &TickBroadcast) -> usize {
        self.feed.broadcast(summary)
    }

    /// Tick number of the most recent broadcast.
    pub fn last_tick(&self) -> u64 {
        self.feed.last_tick()
    }
}
