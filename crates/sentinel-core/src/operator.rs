//! Operator control state for runtime instance management.
//!
//! Shared between the runner task and the observer API handlers. The
//! operator can pause and resume the tick loop, change its speed and
//! request a clean shutdown without stopping the process.
//!
//! Control fields are atomics wrapped in [`Arc`](std::sync::Arc) by the
//! caller, so handlers never take a lock on the tick path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

/// Smallest tick interval the operator may set at runtime.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Reason why an instance stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// An operator issued a stop command.
    OperatorStop,
    /// Every [`WorldHandle`](crate::runner::WorldHandle) was dropped.
    HandlesDropped,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether ticking is currently paused.
    paused: AtomicBool,

    /// Wakes the runner when pause state changes.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes the runner when a stop is requested.
    stop_notify: Notify,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Bumped on every interval change so the runner rebuilds its timer.
    interval_generation: AtomicU64,

    /// Wall-clock time when the instance started.
    started_at: DateTime<Utc>,

    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,

    /// Reason the instance ended, if it has.
    end_reason: Mutex<Option<InstanceEndReason>>,
}

impl OperatorState {
    /// Create operator state with the configured interval and tick bound.
    ///
    /// The initial interval is not subject to [`MIN_TICK_INTERVAL_MS`]; tests
    /// run with very short intervals.
    pub fn new(tick_interval_ms: u64, max_ticks: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            tick_interval_ms: AtomicU64::new(tick_interval_ms.max(1)),
            interval_generation: AtomicU64::new(0),
            started_at: Utc::now(),
            max_ticks,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether ticking is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause ticking. Commands are still served while paused.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume ticking and wake the runner.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_waiters();
    }

    /// Wait until ticking is no longer paused.
    ///
    /// Returns immediately if not paused.
    pub async fn wait_if_paused(&self) {
        loop {
            let notified = self.resume_notify.notified();
            if !self.paused.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wait until a stop is requested.
    pub async fn stopped(&self) {
        loop {
            let notified = self.stop_notify.notified();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Record the reason the instance ended.
    pub async fn set_end_reason(&self, reason: InstanceEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the instance ended, if it has.
    pub async fn end_reason(&self) -> Option<InstanceEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Get the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval in milliseconds. Must be at least
    /// [`MIN_TICK_INTERVAL_MS`].
    ///
    /// Returns the previous interval on success, or `None` if the value was
    /// rejected.
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        let prev = self.tick_interval_ms.swap(ms, Ordering::AcqRel);
        self.interval_generation.fetch_add(1, Ordering::AcqRel);
        // Wake a paused-or-sleeping runner so it picks up the new interval.
        self.resume_notify.notify_waiters();
        Some(prev)
    }

    /// Counter bumped on every accepted interval change.
    pub fn interval_generation(&self) -> u64 {
        self.interval_generation.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether the tick limit has been reached.
    ///
    /// Returns `true` if `max_ticks > 0` and `ticks_run >= max_ticks`.
    pub const fn tick_limit_reached(&self, ticks_run: u64) -> bool {
        self.max_ticks > 0 && ticks_run >= self.max_ticks
    }

    /// Get the configured max ticks.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Build the JSON status for the operator API.
    pub async fn status(&self, tick: u64) -> InstanceStatus {
        InstanceStatus {
            tick,
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            tick_interval_ms: self.tick_interval_ms(),
            elapsed_seconds: self.elapsed_seconds(),
            max_ticks: self.max_ticks,
            end_reason: self.end_reason().await,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// JSON-serializable status of an instance for the operator API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStatus {
    /// Current tick number.
    pub tick: u64,
    /// Whether ticking is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured maximum ticks (0 = unlimited).
    pub max_ticks: u64,
    /// The reason the instance ended, if applicable.
    pub end_reason: Option<InstanceEndReason>,
    /// ISO 8601 timestamp of when the instance started.
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn initial_state_is_not_paused() {
        let state = OperatorState::new(1000, 0);
        assert!(!state.is_paused());
        assert!(!state.is_stop_requested());
    }

    #[test]
    fn pause_and_resume() {
        let state = OperatorState::new(1000, 0);
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn set_tick_interval() {
        let state = OperatorState::new(1000, 0);
        assert_eq!(state.set_tick_interval_ms(2000), Some(1000));
        assert_eq!(state.tick_interval_ms(), 2000);
        assert_eq!(state.interval_generation(), 1);
    }

    #[test]
    fn reject_sub_100ms_interval() {
        let state = OperatorState::new(1000, 0);
        assert!(state.set_tick_interval_ms(50).is_none());
        assert_eq!(state.tick_interval_ms(), 1000);
        assert_eq!(state.interval_generation(), 0);
    }

    #[test]
    fn tick_limit_zero_means_unlimited() {
        let state = OperatorState::new(1000, 0);
        assert!(!state.tick_limit_reached(999_999));
    }

    #[test]
    fn tick_limit_reached() {
        let state = OperatorState::new(1000, 100);
        assert!(!state.tick_limit_reached(99));
        assert!(state.tick_limit_reached(100));
    }

    #[tokio::test]
    async fn wait_if_paused_returns_after_resume() {
        let state = Arc::new(OperatorState::new(1000, 0));
        state.pause();
        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.wait_if_paused().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        state.resume();
        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn stopped_resolves_on_request() {
        let state = Arc::new(OperatorState::new(1000, 0));
        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.stopped().await })
        };
        state.request_stop();
        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn end_reason_round_trips() {
        let state = OperatorState::new(1000, 0);
        assert_eq!(state.end_reason().await, None);
        state.set_end_reason(InstanceEndReason::OperatorStop).await;
        let status = state.status(12).await;
        assert_eq!(status.end_reason, Some(InstanceEndReason::OperatorStop));
        assert_eq!(status.tick, 12);
    }
}
