//! Player and operator API server for the Sentinel simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Read endpoints** for the world snapshot, factions, anomalies, intel
//!   and notifications
//! - **Player endpoints** for selecting anomalies, requesting advisories
//!   and driving a breach
//! - **Operator endpoints** for pause, resume, speed, status and stop
//! - **`WebSocket` endpoint** (`/ws/ticks`) streaming a [`TickBroadcast`]
//!   per tick via [`tokio::sync::broadcast`]
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! Every request goes through the instance's [`WorldHandle`], so reads see
//! a consistent snapshot and writes are serialized with ticks and peer
//! merges. The server never holds the world itself.
//!
//! [`WorldHandle`]: sentinel_core::WorldHandle

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use startup::spawn_observer;
pub use state::{AppState, TickBroadcast, TickFeed};
