//! Shared type definitions for the Sentinel simulation.
//!
//! This crate is the single source of truth for the world snapshot, its
//! entities and the sync wire messages. Types defined here flow
//! downstream to `TypeScript` via `ts-rs` for the renderer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers
//! - [`enums`] -- Threat levels, factions, reputation tiers, notification tiers
//! - [`structs`] -- World snapshot and its entities
//! - [`messages`] -- Sync channel messages

pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;

pub use enums::{
    AnomalyKind, Classification, Faction, NotificationTier, RepTier, SignalColor, ThreatLevel,
};
pub use ids::{AgentId, AnomalyId, IntelId, NotificationId};
pub use messages::SyncMessage;
pub use structs::{
    Agent, Anomaly, FactionRep, IntelEntry, MAX_ANOMALIES, MAX_INTEL_ENTRIES, MAX_NARRATIVES,
    MAX_NOTIFICATIONS, MAX_SCORE, MIN_SCORE, Notice, NotificationEvent, Position, WorldState,
};
