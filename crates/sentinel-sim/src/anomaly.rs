//! Anomaly generator.
//!
//! Called once per tick. Each call makes a single Bernoulli draw against
//! the spawn probability; on success it produces exactly one anomaly with
//! an independently sampled kind, faction and severity.
//!
//! The random source is always passed in, so tests can seed it and assert
//! exact outcomes.

use rand::Rng;
use sentinel_types::{
    Anomaly, AnomalyId, AnomalyKind, Faction, MAX_ANOMALIES, Notice, NotificationTier,
};

use crate::bounded;

/// Default per-tick spawn probability.
pub const DEFAULT_SPAWN_PROBABILITY: f64 = 0.15;

/// Lowest severity a generated anomaly can have.
pub const MIN_SEVERITY: u8 = 2;

/// Highest severity a generated anomaly can have.
pub const MAX_SEVERITY: u8 = 5;

/// Result of a successful spawn draw.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedAnomaly {
    /// The new anomaly.
    pub anomaly: Anomaly,
    /// The ALERT notice announcing it.
    pub notice: Notice,
}

/// Per-tick anomaly generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyGenerator {
    spawn_probability: f64,
}

impl AnomalyGenerator {
    /// Create a generator. The probability is clamped to [0, 1]; NaN is
    /// treated as 0.
    pub fn new(spawn_probability: f64) -> Self {
        let spawn_probability = if spawn_probability.is_nan() {
            0.0
        } else {
            spawn_probability.clamp(0.0, 1.0)
        };
        Self { spawn_probability }
    }

    /// The effective spawn probability.
    pub const fn spawn_probability(&self) -> f64 {
        self.spawn_probability
    }

    /// Run one spawn draw for `tick`.
    ///
    /// Returns `None` on the ticks where the draw fails.
    pub fn generate(&self, tick: u64, rng: &mut impl Rng) -> Option<SpawnedAnomaly> {
        let draw: f64 = rng.random();
        if draw >= self.spawn_probability {
            return None;
        }

        let kind = pick(rng, &AnomalyKind::ALL)?;
        let faction = pick(rng, &Faction::ALL)?;
        let severity = rng.random_range(MIN_SEVERITY..=MAX_SEVERITY);

        let anomaly = Anomaly {
            id: AnomalyId::for_tick(tick),
            kind,
            description: describe(kind, Some(faction)),
            severity,
            faction: Some(faction),
        };
        let notice = Notice::new(
            NotificationTier::Alert,
            format!(
                "{} detected: {} (severity {severity})",
                capitalize(kind.label()),
                anomaly.id
            ),
            f64::from(severity) / 10.0,
        );

        Some(SpawnedAnomaly { anomaly, notice })
    }
}

impl Default for AnomalyGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SPAWN_PROBABILITY)
    }
}

/// Prepend an anomaly, evicting the oldest beyond [`MAX_ANOMALIES`].
///
/// Returns the number of evicted anomalies.
pub fn insert_anomaly(anomalies: &mut Vec<Anomaly>, anomaly: Anomaly) -> usize {
    bounded::push_front_bounded(anomalies, anomaly, MAX_ANOMALIES)
}

/// Synthesize a description from the anomaly kind and blamed faction.
pub fn describe(kind: AnomalyKind, faction: Option<Faction>) -> String {
    let owner = faction.map_or("an unattributed", Faction::name);
    match kind {
        AnomalyKind::SignalAnomaly => {
            format!("Unidentified carrier burst traced to {owner} relay.")
        }
        AnomalyKind::DevicePing => {
            format!("Unregistered device answering pings inside {owner} subnet.")
        }
        AnomalyKind::OsintLeak => {
            format!("Credentials tied to {owner} operation surfaced on a public board.")
        }
    }
}

/// Uniformly pick one element.
fn pick<T: Copy>(rng: &mut impl Rng, items: &[T]) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.random_range(0..items.len())).copied()
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
