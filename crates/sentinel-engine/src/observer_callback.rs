//! Tick callback that feeds the API server.
//!
//! After each tick, this callback pushes a [`TickBroadcast`] to all
//! connected `WebSocket` clients.

use sentinel_core::runner::TickCallback;
use sentinel_core::tick::TickSummary;
use sentinel_observer::state::{TickBroadcast, TickFeed};
use sentinel_types::WorldState;
use tracing::debug;

/// Callback that bridges the tick loop to the API server.
pub struct ObserverCallback {
    feed: TickFeed,
}

impl ObserverCallback {
    /// Create a callback publishing on `feed`.
    pub const fn new(feed: TickFeed) -> Self {
        Self { feed }
    }
}

impl TickCallback for ObserverCallback {
    fn on_tick(&mut self, summary: &TickSummary, world: &WorldState) {
        let broadcast = TickBroadcast::new(summary, world);
        let receivers = self.feed.broadcast(&broadcast);
        debug!(tick = summary.tick, receivers, "Tick broadcast sent");
    }
}
