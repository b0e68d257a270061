//! Core entity structs: the world snapshot and everything it contains.
//!
//! Field names serialize in camelCase because the snapshot is exchanged
//! verbatim with peers and the renderer; see [`crate::messages`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    AnomalyKind, Classification, Faction, NotificationTier, RepTier, ThreatLevel,
};
use crate::ids::{AgentId, AnomalyId, IntelId, NotificationId};

/// Lowest reachable faction score.
pub const MIN_SCORE: i32 = -100;
/// Highest reachable faction score.
pub const MAX_SCORE: i32 = 100;

/// Maximum anomalies held in a snapshot. The oldest is evicted first.
pub const MAX_ANOMALIES: usize = 10;
/// Maximum narrative lines held in a snapshot.
pub const MAX_NARRATIVES: usize = 20;
/// Maximum intel entries held in a snapshot.
pub const MAX_INTEL_ENTRIES: usize = 100;
/// Maximum notifications held in an instance's local ring buffer.
pub const MAX_NOTIFICATIONS: usize = 50;

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// A 2D map coordinate. Cosmetic only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// The presence record of one running instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Agent {
    /// Unique per running instance.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Map position.
    pub pos: Position,
    /// Last time the owning instance acted.
    pub last_active: DateTime<Utc>,
}

impl Agent {
    /// Create a fresh agent record with a new identifier.
    pub fn new(name: impl Into<String>, pos: Position) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            pos,
            last_active: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// Reputation standing with one faction.
///
/// The tier is derived from the score. Fields are private so the only
/// ways to change the score go through constructors that re-derive it;
/// snapshots arriving from outside are checked with
/// [`FactionRep::rederive_tier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FactionRep {
    name: Faction,
    score: i32,
    tier: RepTier,
    description: String,
}

impl FactionRep {
    /// Create a standing with the given score, clamped to
    /// [[`MIN_SCORE`], [`MAX_SCORE`]].
    pub fn new(name: Faction, score: i32) -> Self {
        let score = score.clamp(MIN_SCORE, MAX_SCORE);
        Self {
            name,
            score,
            tier: RepTier::from_score(score),
            description: name.description().to_owned(),
        }
    }

    /// Return a copy with a new score (clamped), tier re-derived.
    #[must_use]
    pub fn with_score(&self, score: i32) -> Self {
        let score = score.clamp(MIN_SCORE, MAX_SCORE);
        Self {
            name: self.name,
            score,
            tier: RepTier::from_score(score),
            description: self.description.clone(),
        }
    }

    /// The faction this standing belongs to.
    pub const fn name(&self) -> Faction {
        self.name
    }

    /// Current score.
    pub const fn score(&self) -> i32 {
        self.score
    }

    /// Tier derived from the current score.
    pub const fn tier(&self) -> RepTier {
        self.tier
    }

    /// Static description of the faction.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Re-clamp the score and recompute the tier.
    ///
    /// Returns `true` if the stored tier (or score) disagreed with the
    /// derived value and had to be corrected.
    pub fn rederive_tier(&mut self) -> bool {
        let score = self.score.clamp(MIN_SCORE, MAX_SCORE);
        let tier = RepTier::from_score(score);
        let stale = score != self.score || tier != self.tier;
        self.score = score;
        self.tier = tier;
        stale
    }
}

// ---------------------------------------------------------------------------
// Anomalies and intel
// ---------------------------------------------------------------------------

/// A spawned, detectable target for the breach minigame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Anomaly {
    /// `ANOM-<tick>`.
    pub id: AnomalyId,
    /// What was detected.
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    /// Generated description.
    pub description: String,
    /// 2..=5. Also the breach challenge length.
    pub severity: u8,
    /// Faction blamed for the anomaly, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction: Option<Faction>,
}

/// An intel report produced by a successful breach. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct IntelEntry {
    /// Unique identifier.
    pub id: IntelId,
    /// Short headline.
    pub title: String,
    /// Report body.
    pub content: String,
    /// Classification stamp.
    pub classification: Classification,
    /// Producing system.
    pub source: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A transient notification. Never part of the world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NotificationEvent {
    /// Fresh random identifier.
    pub id: NotificationId,
    /// Delivery tier.
    pub tier: NotificationTier,
    /// Human-readable message.
    pub message: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Advisory urgency, 0.0 to 1.0.
    pub urgency: f64,
}

/// A request to emit a notification, produced by pure simulation code and
/// turned into a [`NotificationEvent`] by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    /// Delivery tier.
    pub tier: NotificationTier,
    /// Human-readable message.
    pub message: String,
    /// Advisory urgency, 0.0 to 1.0.
    pub urgency: f64,
}

impl Notice {
    /// Build a notice.
    pub fn new(tier: NotificationTier, message: impl Into<String>, urgency: f64) -> Self {
        Self {
            tier,
            message: message.into(),
            urgency,
        }
    }
}

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

/// The full shared world snapshot.
///
/// Collections are ordered newest-first. Exactly one writer mutates a
/// given instance's copy; peers receive whole copies, never references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct WorldState {
    /// Monotonic tick counter.
    pub tick: u64,
    /// Global escalation state.
    pub threat_level: ThreatLevel,
    /// Open anomalies, newest first, at most [`MAX_ANOMALIES`].
    pub anomalies: Vec<Anomaly>,
    /// Narrative log, newest first, at most [`MAX_NARRATIVES`].
    pub narratives: Vec<String>,
    /// Exactly one standing per faction.
    pub factions: Vec<FactionRep>,
    /// Intel reports, newest first, at most [`MAX_INTEL_ENTRIES`].
    pub intel_entries: Vec<IntelEntry>,
    /// Known agents. Always contains the local instance's agent.
    pub agents: Vec<Agent>,
}

impl WorldState {
    /// Look up a faction's standing.
    pub fn faction(&self, name: Faction) -> Option<&FactionRep> {
        self.factions.iter().find(|rep| rep.name() == name)
    }

    /// Look up an open anomaly.
    pub fn anomaly(&self, id: &AnomalyId) -> Option<&Anomaly> {
        self.anomalies.iter().find(|anomaly| anomaly.id == *id)
    }

    /// Look up an agent record.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    /// Re-derive every faction tier. Returns how many were stale.
    pub fn rederive_tiers(&mut self) -> usize {
        self.factions
            .iter_mut()
            .map(FactionRep::rederive_tier)
            .filter(|stale| *stale)
            .count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn faction_rep_clamps_and_derives_tier() {
        let rep = FactionRep::new(Faction::StreetCollective, 250);
        assert_eq!(rep.score(), MAX_SCORE);
        assert_eq!(rep.tier(), RepTier::Exalted);

        let lowered = rep.with_score(-61);
        assert_eq!(lowered.score(), -61);
        assert_eq!(lowered.tier(), RepTier::Hostile);
        assert_eq!(lowered.name(), Faction::StreetCollective);
    }

    #[test]
    fn stale_tier_from_wire_is_corrected() {
        let json = r#"{
            "name": "Corporate Security",
            "score": 75,
            "tier": "Neutral",
            "description": "x"
        }"#;
        let mut rep: FactionRep = serde_json::from_str(json).unwrap();
        assert!(rep.rederive_tier());
        assert_eq!(rep.tier(), RepTier::Exalted);
        assert!(!rep.rederive_tier());
    }

    #[test]
    fn world_state_uses_camel_case_on_the_wire() {
        let state = WorldState {
            tick: 3,
            threat_level: ThreatLevel::Hot,
            anomalies: Vec::new(),
            narratives: vec!["line".to_owned()],
            factions: vec![FactionRep::new(Faction::InformationBroker, 10)],
            intel_entries: Vec::new(),
            agents: vec![Agent::new("Ghost", Position { x: 1.0, y: 2.0 })],
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["threatLevel"], "hot");
        assert!(value["intelEntries"].is_array());
        assert!(value["agents"][0]["lastActive"].is_string());
        assert_eq!(value["factions"][0]["name"], "Information Broker");
    }

    #[test]
    fn anomaly_kind_serializes_under_type() {
        let anomaly = Anomaly {
            id: AnomalyId::for_tick(5),
            kind: AnomalyKind::OsintLeak,
            description: "leak".to_owned(),
            severity: 3,
            faction: None,
        };
        let value = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(value["type"], "osint_leak");
        assert!(value.get("faction").is_none());
    }
}
