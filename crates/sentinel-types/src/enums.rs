//! Enumeration types for the Sentinel simulation.
//!
//! Every enum here crosses the sync wire, so the serde representation is
//! part of the contract with peers and with the renderer.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Threat level
// ---------------------------------------------------------------------------

/// Global escalation state.
///
/// Ordered `Green < Amber < Hot`, but transitions are not a ladder: a
/// breach failure jumps straight to [`ThreatLevel::Hot`] from any level,
/// while decay steps down exactly one level at a time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ThreatLevel {
    /// Nominal.
    #[default]
    Green,
    /// Elevated.
    Amber,
    /// Active lockdown conditions.
    Hot,
}

impl ThreatLevel {
    /// The level one step below this one. `Green` is a fixed point.
    pub const fn stepped_down(self) -> Self {
        match self {
            Self::Hot => Self::Amber,
            Self::Amber | Self::Green => Self::Green,
        }
    }

    /// Wire name of the level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Amber => "amber",
            Self::Hot => "hot",
        }
    }
}

impl core::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// One of the three fixed factions. The name is the faction's identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Faction {
    /// Private security contractors guarding corporate infrastructure.
    #[serde(rename = "Corporate Security")]
    CorporateSecurity,
    /// Loose network of street-level operators and fixers.
    #[serde(rename = "Street Collective")]
    StreetCollective,
    /// Brokers trading in leaked data and favours.
    #[serde(rename = "Information Broker")]
    InformationBroker,
}

impl Faction {
    /// All factions, in canonical order.
    pub const ALL: [Self; 3] = [
        Self::CorporateSecurity,
        Self::StreetCollective,
        Self::InformationBroker,
    ];

    /// Display name, identical to the wire representation.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CorporateSecurity => "Corporate Security",
            Self::StreetCollective => "Street Collective",
            Self::InformationBroker => "Information Broker",
        }
    }

    /// Static description shown alongside the faction's standing.
    pub const fn description(self) -> &'static str {
        match self {
            Self::CorporateSecurity => {
                "Private contractors hardening corporate grids. Notice every intrusion."
            }
            Self::StreetCollective => {
                "Fixers and runners working the underside of the city. Value discretion."
            }
            Self::InformationBroker => {
                "Neutral dealers in leaked data. Pay well for anything fresh."
            }
        }
    }
}

impl core::fmt::Display for Faction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Reputation tiers
// ---------------------------------------------------------------------------

/// Score above which a faction is [`RepTier::Exalted`].
pub const EXALTED_ABOVE: i32 = 60;
/// Score above which a faction is [`RepTier::Friendly`].
pub const FRIENDLY_ABOVE: i32 = 20;
/// Score below which a faction is [`RepTier::Suspicious`].
pub const SUSPICIOUS_BELOW: i32 = -20;
/// Score below which a faction is [`RepTier::Hostile`].
pub const HOSTILE_BELOW: i32 = -60;

/// Standing derived from a faction score. Never stored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RepTier {
    /// Score below -60.
    Hostile,
    /// Score in [-60, -20).
    Suspicious,
    /// Score in [-20, 20].
    Neutral,
    /// Score in (20, 60].
    Friendly,
    /// Score above 60.
    Exalted,
}

impl RepTier {
    /// Derive the tier for a score.
    ///
    /// Thresholds are strict, so the boundary values 60, 20, -20 and -60
    /// fall on the side closer to neutral.
    pub const fn from_score(score: i32) -> Self {
        if score > EXALTED_ABOVE {
            Self::Exalted
        } else if score > FRIENDLY_ABOVE {
            Self::Friendly
        } else if score < HOSTILE_BELOW {
            Self::Hostile
        } else if score < SUSPICIOUS_BELOW {
            Self::Suspicious
        } else {
            Self::Neutral
        }
    }
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

/// Kind of detectable anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AnomalyKind {
    /// Unexplained radio-frequency signal.
    SignalAnomaly,
    /// Unregistered device answering on the network.
    DevicePing,
    /// Open-source intelligence leak.
    OsintLeak,
}

impl AnomalyKind {
    /// All anomaly kinds, sampled uniformly by the generator.
    pub const ALL: [Self; 3] = [Self::SignalAnomaly, Self::DevicePing, Self::OsintLeak];

    /// Short human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::SignalAnomaly => "signal anomaly",
            Self::DevicePing => "device ping",
            Self::OsintLeak => "OSINT leak",
        }
    }
}

// ---------------------------------------------------------------------------
// Intel
// ---------------------------------------------------------------------------

/// Classification stamped on an intel entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Classification {
    /// Freely shareable.
    #[serde(rename = "UNCLASSIFIED")]
    Unclassified,
    /// Restricted distribution.
    #[serde(rename = "CONFIDENTIAL")]
    Confidential,
    /// Highest restriction.
    #[serde(rename = "TOP SECRET")]
    TopSecret,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Delivery tier of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export, export_to = "bindings/")]
pub enum NotificationTier {
    /// Analysis or intel delivered.
    Intel,
    /// New anomaly detected.
    Alert,
    /// Low-priority status chirp.
    Chirp,
    /// Breach failed, lockdown in effect.
    Lockdown,
}

// ---------------------------------------------------------------------------
// Breach challenge symbols
// ---------------------------------------------------------------------------

/// One symbol of a breach challenge sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export, export_to = "bindings/")]
pub enum SignalColor {
    /// Red.
    Red,
    /// Blue.
    Blue,
    /// Green.
    Green,
    /// Yellow.
    Yellow,
}

impl SignalColor {
    /// All symbols, sampled uniformly for challenge sequences.
    pub const ALL: [Self; 4] = [Self::Red, Self::Blue, Self::Green, Self::Yellow];
}
