//! Tick cycle: one step of simulated time.
//!
//! Each tick runs these steps against the snapshot, with no await points
//! in between:
//!
//! 1. **Advance** -- increment `tick`.
//! 2. **Spawn** -- one anomaly generator draw; a hit is prepended to
//!    `anomalies` with an ALERT notice.
//! 3. **Sweep** -- on sweep ticks, prepend a routine-sweep narrative.
//! 4. **Decay** -- on decay ticks, step the threat level down once.
//! 5. **Bound** -- trim anomalies, narratives and intel to their caps.
//!
//! Faction scores never change here. Broadcasting and persisting the
//! resulting snapshot is the caller's job.

use rand::Rng;
use sentinel_sim::{AnomalyGenerator, bounded, insert_anomaly, sweep_narrative, world};
use sentinel_types::{Anomaly, MAX_NARRATIVES, Notice, ThreatLevel, WorldState};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::{ClockError, WorldClock};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// A one-level threat decay that happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThreatStep {
    /// Level before the step.
    pub from: ThreatLevel,
    /// Level after the step.
    pub to: ThreatLevel,
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Threat level at the end of the tick.
    pub threat_level: ThreatLevel,
    /// Anomaly spawned this tick, if the draw hit.
    pub spawned: Option<Anomaly>,
    /// Whether a sweep narrative was recorded.
    pub swept: bool,
    /// Threat decay applied this tick, if any.
    pub threat_step: Option<ThreatStep>,
    /// Entries dropped by the size bounds.
    pub evicted: usize,
    /// Notices the caller should emit.
    #[serde(skip)]
    pub notices: Vec<Notice>,
}

/// Run one tick against `state`.
///
/// # Errors
///
/// Returns [`TickError::Clock`] if the tick counter cannot advance. The
/// snapshot is untouched in that case.
pub fn run_tick(
    state: &mut WorldState,
    clock: &WorldClock,
    generator: &AnomalyGenerator,
    rng: &mut impl Rng,
) -> Result<TickSummary, TickError> {
    let tick = clock.advance(state)?;
    let mut notices = Vec::new();
    let mut evicted: usize = 0;

    let spawned = generator.generate(tick, rng).map(|spawned| {
        info!(
            tick,
            anomaly = %spawned.anomaly.id,
            kind = ?spawned.anomaly.kind,
            severity = spawned.anomaly.severity,
            "Anomaly spawned"
        );
        evicted = evicted.saturating_add(insert_anomaly(
            &mut state.anomalies,
            spawned.anomaly.clone(),
        ));
        notices.push(spawned.notice);
        spawned.anomaly
    });

    let swept = clock.is_sweep_tick(tick);
    if swept {
        let line = sweep_narrative(tick, state.threat_level);
        evicted = evicted.saturating_add(bounded::push_front_bounded(
            &mut state.narratives,
            line,
            MAX_NARRATIVES,
        ));
        debug!(tick, "Routine sweep recorded");
    }

    let threat_step = if clock.is_decay_tick(tick) && state.threat_level != ThreatLevel::Green {
        let from = state.threat_level;
        state.threat_level = from.stepped_down();
        info!(tick, from = %from, to = %state.threat_level, "Threat level decayed");
        Some(ThreatStep {
            from,
            to: state.threat_level,
        })
    } else {
        None
    };

    evicted = evicted.saturating_add(world::enforce_bounds(state));

    Ok(TickSummary {
        tick,
        threat_level: state.threat_level,
        spawned,
        swept,
        threat_step,
        evicted,
        notices,
    })
}
