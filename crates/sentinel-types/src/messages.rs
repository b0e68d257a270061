//! Messages exchanged between peers on the sync channel.
//!
//! There is no schema versioning: the payload is exactly a
//! [`WorldState`] or a [`NotificationEvent`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::{NotificationEvent, WorldState};

/// A message on the shared sync channel.
///
/// Serialized adjacently tagged:
/// `{"type": "WORLD_STATE_UPDATE", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum SyncMessage {
    /// A full world snapshot.
    WorldStateUpdate(WorldState),
    /// A relayed notification.
    #[serde(rename = "ACTION_NOTIF")]
    ActionNotif(NotificationEvent),
}

impl SyncMessage {
    /// Wire name of the message kind, for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::WorldStateUpdate(_) => "WORLD_STATE_UPDATE",
            Self::ActionNotif(_) => "ACTION_NOTIF",
        }
    }
}
