//! Tick engine, sync coordinator and instance runner for the Sentinel
//! simulation.
//!
//! Each instance owns one world snapshot and mutates it from a single task.
//! Ticks, player commands and peer snapshots all pass through that task, so
//! the snapshot is never written concurrently.
//!
//! # Modules
//!
//! - [`clock`] -- Tick schedule (sweep and threat decay intervals).
//! - [`config`] -- Configuration loading from `sentinel-config.yaml` with
//!   environment overrides.
//! - [`instance`] -- [`WorldInstance`], the single writer, and its commands.
//! - [`notify`] -- Bounded notification log.
//! - [`operator`] -- Pause, resume, speed and stop controls.
//! - [`runner`] -- [`spawn_instance`] and the [`WorldHandle`] API.
//! - [`sync`] -- Last-writer-wins merge and the sync transports.
//! - [`tick`] -- One tick of the world.
//!
//! [`WorldInstance`]: instance::WorldInstance
//! [`spawn_instance`]: runner::spawn_instance
//! [`WorldHandle`]: runner::WorldHandle

pub mod clock;
pub mod config;
pub mod instance;
pub mod notify;
pub mod operator;
pub mod runner;
pub mod sync;
pub mod tick;

pub use clock::{ClockError, WorldClock};
pub use config::{ConfigError, SimulationConfig};
pub use instance::{Command, CommandError, Effect, InstanceSettings, WorldInstance, WorldView};
pub use notify::NotificationBroker;
pub use operator::{InstanceEndReason, InstanceStatus, OperatorState};
pub use runner::{
    InstanceResult, NoOpCallback, RunnerError, Services, TickCallback, WorldHandle,
    spawn_instance,
};
pub use sync::{LocalBus, SyncError, SyncTransport, merge_snapshot};
pub use tick::{TickError, TickSummary, run_tick};
