//! World snapshot persistence.
//!
//! The store is keyed by a fixed storage key. Loading never fails the
//! caller at startup: [`load_or_initial`] falls back to a fresh world when
//! the snapshot is absent or unreadable.

use std::path::{Path, PathBuf};

use sentinel_sim::world;
use sentinel_types::{Agent, WorldState};
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// File-backed snapshot store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotStore {
    dir: PathBuf,
    key: String,
}

impl SnapshotStore {
    /// Create a store for `key` under `dir`. Nothing is touched on disk
    /// until the first save.
    pub fn new(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            key: key.into(),
        }
    }

    /// Storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", self.key))
    }

    /// Write `state` as the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if the state cannot be encoded,
    /// or [`StoreError::Io`] if the directory, temp file or rename fails.
    pub async fn save(&self, state: &WorldState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(state)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, self.path()).await?;
        debug!(key = %self.key, tick = state.tick, bytes = bytes.len(), "Snapshot saved");
        Ok(())
    }

    /// Read the current snapshot.
    ///
    /// Returns `Ok(None)` if no snapshot has been saved under this key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read, or
    /// [`StoreError::Serialization`] if it does not parse.
    pub async fn load(&self) -> Result<Option<WorldState>, StoreError> {
        let bytes = match tokio::fs::read(self.path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Remove the snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if removal fails for a reason other than
    /// the file being absent.
    pub async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Directory holding the snapshot.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Load the persisted world for this process, or start fresh.
///
/// - absent snapshot: initial state
/// - unreadable or corrupt snapshot: logged, initial state
/// - present snapshot: `local` is appended if missing, then the snapshot is
///   normalized (caps, one standing per faction, tiers from scores)
pub async fn load_or_initial(store: &SnapshotStore, local: &Agent) -> WorldState {
    match store.load().await {
        Ok(Some(mut state)) => {
            if world::ensure_agent(&mut state, local) {
                debug!(agent_id = %local.id, "Local agent added to restored snapshot");
            }
            let repairs = world::normalize(&mut state);
            if !repairs.is_clean() {
                warn!(
                    evicted = repairs.evicted,
                    factions_rebuilt = repairs.factions_rebuilt,
                    tiers_corrected = repairs.tiers_corrected,
                    "Restored snapshot violated world invariants, repaired"
                );
            }
            info!(key = %store.key(), tick = state.tick, "World restored from snapshot");
            state
        }
        Ok(None) => {
            info!(key = %store.key(), "No snapshot found, starting fresh world");
            world::initial_state(local)
        }
        Err(e) => {
            warn!(
                key = %store.key(),
                error = %e,
                "Snapshot unreadable, starting fresh world"
            );
            world::initial_state(local)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sentinel_types::{Faction, FactionRep, MAX_NARRATIVES, Position, RepTier, ThreatLevel};

    use super::*;

    fn temp_store() -> SnapshotStore {
        let dir = std::env::temp_dir().join(format!("sentinel-store-{}", uuid::Uuid::new_v4()));
        SnapshotStore::new(dir, "sentinel-world-state")
    }

    fn agent(name: &str) -> Agent {
        Agent::new(name, Position::default())
    }

    #[tokio::test]
    async fn missing_snapshot_loads_as_none() {
        let store = temp_store();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_returns_same_state() {
        let store = temp_store();
        let mut state = world::initial_state(&agent("Ghost"));
        state.tick = 41;
        state.threat_level = ThreatLevel::Hot;

        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(state));
        assert!(!store.temp_path().exists());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn absent_snapshot_yields_initial_state() {
        let store = temp_store();
        let me = agent("Ghost");
        let state = load_or_initial(&store, &me).await;
        assert_eq!(state, world::initial_state(&me));
    }

    #[tokio::test]
    async fn corrupt_snapshot_yields_initial_state() {
        let store = temp_store();
        tokio::fs::create_dir_all(store.dir()).await.unwrap();
        tokio::fs::write(store.path(), b"{ not json").await.unwrap();

        assert!(matches!(store.load().await, Err(StoreError::Serialization(_))));
        let me = agent("Ghost");
        let state = load_or_initial(&store, &me).await;
        assert_eq!(state.tick, 0);
        assert_eq!(state.agents, vec![me]);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn restored_snapshot_gains_current_agent() {
        let store = temp_store();
        let previous = agent("Ghost");
        let mut saved = world::initial_state(&previous);
        saved.tick = 12;
        store.save(&saved).await.unwrap();

        let me = agent("Ghost");
        let state = load_or_initial(&store, &me).await;
        assert_eq!(state.tick, 12);
        assert_eq!(state.agents.len(), 2);
        assert!(state.agent(me.id).is_some());
        assert!(state.agent(previous.id).is_some());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn restored_snapshot_rederives_tiers() {
        let store = temp_store();
        tokio::fs::create_dir_all(store.dir()).await.unwrap();
        let json = serde_json::json!({
            "tick": 3,
            "threatLevel": "amber",
            "anomalies": [],
            "narratives": [],
            "factions": [
                {"name": "Street Collective", "score": -70, "tier": "Exalted", "description": "x"}
            ],
            "intelEntries": [],
            "agents": []
        });
        tokio::fs::write(store.path(), serde_json::to_vec(&json).unwrap())
            .await
            .unwrap();

        let state = load_or_initial(&store, &agent("Ghost")).await;
        let rep = state.faction(Faction::StreetCollective).unwrap();
        assert_eq!(rep.tier(), RepTier::Hostile);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn restored_snapshot_is_brought_within_invariants() {
        let store = temp_store();
        let me = agent("Ghost");
        let mut saved = world::initial_state(&me);
        saved.narratives = (0..30).map(|n| format!("Archived chatter {n}.")).collect();
        saved.factions = vec![
            FactionRep::new(Faction::InformationBroker, 35),
            FactionRep::new(Faction::InformationBroker, -80),
        ];
        store.save(&saved).await.unwrap();

        let state = load_or_initial(&store, &me).await;
        assert_eq!(state.narratives.len(), MAX_NARRATIVES);
        assert_eq!(state.factions.len(), 3);
        let broker = state.faction(Faction::InformationBroker).unwrap();
        assert_eq!(broker.score(), 35);
        assert_eq!(broker.tier(), RepTier::Friendly);
        assert_eq!(state.faction(Faction::CorporateSecurity).unwrap().score(), 0);
        store.clear().await.unwrap();
    }
}
