//! Type-safe identifier wrappers.
//!
//! Agents, notifications and intel entries carry UUID v7 identifiers
//! generated on the instance that created them. Anomaly identifiers are
//! derived from the tick that spawned them (`ANOM-<tick>`), so two peers
//! spawning on the same tick may collide. That collision is tolerated:
//! snapshots are reconciled last-writer-wins, never by anomaly id.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identifier of a running instance's agent. Generated once per process.
    AgentId
}

define_id! {
    /// Identifier of a transient notification event.
    NotificationId
}

define_id! {
    /// Identifier of an intel entry produced by a successful breach.
    IntelId
}

/// Prefix shared by every anomaly identifier.
pub const ANOMALY_ID_PREFIX: &str = "ANOM-";

/// Identifier of an anomaly, of the form `ANOM-<tick>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AnomalyId(pub String);

impl AnomalyId {
    /// Build the identifier for an anomaly spawned on `tick`.
    pub fn for_tick(tick: u64) -> Self {
        Self(format!("{ANOMALY_ID_PREFIX}{tick}"))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AnomalyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnomalyId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}
