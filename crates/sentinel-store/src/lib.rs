//! Snapshot persistence for the Sentinel simulation.
//!
//! One snapshot per storage key, stored as JSON at `<dir>/<key>.json`.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash mid-save leaves the previous snapshot intact.
//!
//! # Modules
//!
//! - [`snapshot_store`] -- Save/load and the startup fallback policy
//! - [`error`] -- Error types ([`StoreError`])

pub mod error;
pub mod snapshot_store;

pub use error::StoreError;
pub use snapshot_store::{SnapshotStore, load_or_initial};
