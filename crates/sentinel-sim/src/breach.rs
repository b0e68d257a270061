//! Breach minigame state machine.
//!
//! ```text
//! Idle --initiate--> Armed --wrong input--> Failure --> Idle
//!                      |  \--right input, incomplete--> Armed
//!                      \----right input, complete-----> Success --> Idle
//! ```
//!
//! A session holds at most one armed breach. Resolution mutates the world
//! snapshot directly and reports what changed so the caller can emit the
//! notice, broadcast the snapshot and log.
//!
//! # Consequences
//!
//! - **Failure**: threat level forced to `hot`, blamed faction -15,
//!   LOCKDOWN notice. The anomaly stays open for a retry.
//! - **Success**: anomaly removed, one CONFIDENTIAL intel entry filed,
//!   blamed faction -10, every other faction +5, CHIRP notice.

use chrono::Utc;
use rand::Rng;
use sentinel_types::{
    Anomaly, AnomalyId, Classification, Faction, IntelEntry, IntelId, MAX_INTEL_ENTRIES, Notice,
    NotificationTier, SignalColor, ThreatLevel, WorldState,
};
use serde::Serialize;

use crate::bounded;
use crate::error::BreachError;
use crate::reputation::{self, ReputationChange};

/// Source stamped on intel produced by a successful breach.
pub const BREACH_SOURCE: &str = "Breach-V5";

/// Urgency of the notice announcing an armed breach.
const ARMED_URGENCY: f64 = 0.3;
/// Urgency of the notice announcing a successful breach.
const SUCCESS_URGENCY: f64 = 0.4;
/// Urgency of the lockdown notice after a failed breach.
const FAILURE_URGENCY: f64 = 0.9;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// An armed breach waiting for player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedBreach {
    target: Anomaly,
    sequence: Vec<SignalColor>,
    entered: Vec<SignalColor>,
}

impl ArmedBreach {
    /// The anomaly under attack (as it was when the breach was armed).
    pub const fn target(&self) -> &Anomaly {
        &self.target
    }

    /// The full challenge sequence.
    pub fn sequence(&self) -> &[SignalColor] {
        &self.sequence
    }

    /// Inputs matched so far.
    pub fn entered(&self) -> &[SignalColor] {
        &self.entered
    }
}

/// Serializable view of a session, for the player API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachStatus {
    /// Whether a breach is armed.
    pub armed: bool,
    /// Target anomaly when armed.
    pub target: Option<AnomalyId>,
    /// Challenge sequence when armed.
    pub sequence: Vec<SignalColor>,
    /// Number of symbols matched so far.
    pub progress: usize,
}

/// Outcome of feeding one input to the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum InputOutcome {
    /// No breach was armed. Nothing changed.
    Ignored,
    /// Correct symbol, sequence not yet complete. Nothing else changed.
    Progress {
        /// Symbols matched so far.
        matched: usize,
        /// Symbols still expected.
        remaining: usize,
    },
    /// Sequence completed.
    Success(BreachResolution),
    /// Wrong symbol.
    Failure(BreachResolution),
}

/// What a resolved breach changed in the world.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachResolution {
    /// The anomaly that was targeted.
    pub target: AnomalyId,
    /// The faction blamed for it.
    pub faction: Option<Faction>,
    /// Whether the anomaly was removed from the snapshot.
    pub anomaly_removed: bool,
    /// Intel filed on success.
    pub intel: Option<IntelEntry>,
    /// Faction score changes applied.
    pub reputation: Vec<ReputationChange>,
    /// Notice to emit.
    pub notice: Notice,
}

/// Breach session for one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreachSession {
    armed: Option<ArmedBreach>,
}

impl BreachSession {
    /// Create an idle session.
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Whether a breach is currently armed.
    pub const fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// The armed breach, if any.
    pub const fn armed(&self) -> Option<&ArmedBreach> {
        self.armed.as_ref()
    }

    /// Serializable view of the session.
    pub fn status(&self) -> BreachStatus {
        self.armed.as_ref().map_or_else(
            || BreachStatus {
                armed: false,
                target: None,
                sequence: Vec::new(),
                progress: 0,
            },
            |armed| BreachStatus {
                armed: true,
                target: Some(armed.target.id.clone()),
                sequence: armed.sequence.clone(),
                progress: armed.entered.len(),
            },
        )
    }

    /// Arm a breach against `target`.
    ///
    /// The challenge has `target.severity` symbols, each drawn uniformly
    /// and independently. Returns the CHIRP notice to emit.
    ///
    /// # Errors
    ///
    /// Returns [`BreachError::AlreadyArmed`] if another breach is armed;
    /// the session is left unchanged.
    pub fn initiate(&mut self, target: &Anomaly, rng: &mut impl Rng) -> Result<Notice, BreachError> {
        if let Some(armed) = &self.armed {
            return Err(BreachError::AlreadyArmed {
                target: armed.target.id.clone(),
            });
        }

        let sequence = challenge_sequence(usize::from(target.severity), rng);
        let notice = Notice::new(
            NotificationTier::Chirp,
            format!(
                "Breach armed on {}: {}-step sequence",
                target.id,
                sequence.len()
            ),
            ARMED_URGENCY,
        );
        self.armed = Some(ArmedBreach {
            target: target.clone(),
            sequence,
            entered: Vec::new(),
        });
        Ok(notice)
    }

    /// Feed one player input.
    ///
    /// Input while idle is ignored. A wrong symbol resolves to failure
    /// immediately; the symbol that completes the sequence resolves to
    /// success and is never also reported as progress.
    pub fn input(&mut self, color: SignalColor, world: &mut WorldState) -> InputOutcome {
        let Some(armed) = self.armed.as_mut() else {
            return InputOutcome::Ignored;
        };
        let Some(&expected) = armed.sequence.get(armed.entered.len()) else {
            return InputOutcome::Ignored;
        };

        if color != expected {
            let target = armed.target.clone();
            self.armed = None;
            return InputOutcome::Failure(resolve_failure(&target, world));
        }

        armed.entered.push(color);
        if armed.entered.len() < armed.sequence.len() {
            return InputOutcome::Progress {
                matched: armed.entered.len(),
                remaining: armed.sequence.len().saturating_sub(armed.entered.len()),
            };
        }

        let target = armed.target.clone();
        self.armed = None;
        InputOutcome::Success(resolve_success(&target, world))
    }
}

/// Draw a challenge of `len` symbols.
pub fn challenge_sequence(len: usize, rng: &mut impl Rng) -> Vec<SignalColor> {
    (0..len)
        .filter_map(|_| {
            SignalColor::ALL
                .get(rng.random_range(0..SignalColor::ALL.len()))
                .copied()
        })
        .collect()
}

fn resolve_failure(target: &Anomaly, world: &mut WorldState) -> BreachResolution {
    world.threat_level = ThreatLevel::Hot;
    let reputation = reputation::apply_breach_failure(&mut world.factions, target.faction);

    let blame = target
        .faction
        .map_or_else(String::new, |faction| format!(" {faction} alerted."));
    BreachResolution {
        target: target.id.clone(),
        faction: target.faction,
        anomaly_removed: false,
        intel: None,
        reputation,
        notice: Notice::new(
            NotificationTier::Lockdown,
            format!("Breach failed on {}. Lockdown engaged.{blame}", target.id),
            FAILURE_URGENCY,
        ),
    }
}

fn resolve_success(target: &Anomaly, world: &mut WorldState) -> BreachResolution {
    let before = world.anomalies.len();
    world.anomalies.retain(|anomaly| anomaly.id != target.id);
    let anomaly_removed = world.anomalies.len() < before;

    let intel = IntelEntry {
        id: IntelId::new(),
        title: format!("Breach report {}", target.id),
        content: target.description.clone(),
        classification: Classification::Confidential,
        source: BREACH_SOURCE.to_owned(),
        timestamp: Utc::now(),
    };
    bounded::push_front_bounded(&mut world.intel_entries, intel.clone(), MAX_INTEL_ENTRIES);

    let reputation = reputation::apply_breach_success(&mut world.factions, target.faction);

    BreachResolution {
        target: target.id.clone(),
        faction: target.faction,
        anomaly_removed,
        intel: Some(intel),
        reputation,
        notice: Notice::new(
            NotificationTier::Chirp,
            format!("Breach complete on {}. Intel filed.", target.id),
            SUCCESS_URGENCY,
        ),
    }
}
