//! The single writer for one instance's world.
//!
//! A [`WorldInstance`] owns the snapshot, the breach session, the
//! notification broker and the RNG. Only the runner task touches it, so
//! ticks, player commands and peer merges are serialized without locks.
//!
//! Anything that may wait (publishing, saving, advisory calls) leaves the
//! instance as an [`Effect`] on an unbounded channel and is carried out by
//! the effects task in [`runner`](crate::runner).

use rand::SeedableRng;
use rand::rngs::StdRng;
use sentinel_advisor::Advisory;
use sentinel_sim::{
    AnomalyGenerator, BreachError, BreachSession, BreachStatus, InputOutcome, ensure_agent,
    touch_agent,
};
use sentinel_types::{
    Agent, Anomaly, AnomalyId, Notice, NotificationEvent, NotificationTier, SignalColor,
    SyncMessage, WorldState,
};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::clock::WorldClock;
use crate::notify::NotificationBroker;
use crate::sync::merge_snapshot;
use crate::tick::{self, TickError, TickSummary};

/// Urgency of the INTEL notification carrying an advisory.
const ADVISORY_URGENCY: f64 = 0.5;

/// Errors returned to callers of instance commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The anomaly is not in the current snapshot.
    #[error("anomaly not found: {0}")]
    AnomalyNotFound(AnomalyId),

    /// No anomaly is selected.
    #[error("no anomaly selected")]
    NoSelection,

    /// The breach session rejected the request.
    #[error(transparent)]
    Breach(#[from] BreachError),

    /// The instance has stopped and no longer accepts commands.
    #[error("instance closed")]
    InstanceClosed,
}

/// Work the instance hands to the effects task.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Send a message on the sync channel.
    Publish(SyncMessage),
    /// Save a snapshot.
    Persist(WorldState),
    /// Request an advisory for an anomaly.
    Analyze(Anomaly),
}

/// A request to the instance, answered on a oneshot where applicable.
#[derive(Debug)]
pub enum Command {
    /// Read a consistent view of the instance.
    View {
        /// Reply channel.
        reply: oneshot::Sender<WorldView>,
    },
    /// Select an anomaly.
    Select {
        /// Anomaly to select.
        id: AnomalyId,
        /// Reply channel.
        reply: oneshot::Sender<Result<Anomaly, CommandError>>,
    },
    /// Arm a breach against an anomaly.
    InitiateHack {
        /// Target anomaly.
        id: AnomalyId,
        /// Reply channel.
        reply: oneshot::Sender<Result<BreachStatus, CommandError>>,
    },
    /// Feed one breach input.
    HackInput {
        /// The symbol entered.
        color: SignalColor,
        /// Reply channel.
        reply: oneshot::Sender<InputOutcome>,
    },
    /// Request an advisory for the selected anomaly.
    AnalyzeSelected {
        /// Reply channel.
        reply: oneshot::Sender<Result<Anomaly, CommandError>>,
    },
    /// A message from a peer.
    Remote(SyncMessage),
    /// An advisory finished.
    AdvisoryComplete {
        /// Anomaly the advisory is about.
        anomaly_id: AnomalyId,
        /// The advisory.
        advisory: Advisory,
    },
}

/// Consistent read-only view of an instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldView {
    /// The world snapshot.
    pub state: WorldState,
    /// This instance's agent.
    pub self_agent: Agent,
    /// Selected anomaly, if any.
    pub selected: Option<AnomalyId>,
    /// Breach session status.
    pub breach: BreachStatus,
    /// Recent notifications, newest first.
    pub notifications: Vec<NotificationEvent>,
}

/// Tick rules and randomness for an instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceSettings {
    /// Tick schedule.
    pub clock: WorldClock,
    /// Anomaly generator.
    pub generator: AnomalyGenerator,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            clock: WorldClock::default(),
            generator: AnomalyGenerator::default(),
            seed: None,
        }
    }
}

/// Single-writer owner of one instance's world.
#[derive(Debug)]
pub struct WorldInstance {
    state: WorldState,
    self_agent: Agent,
    breach: BreachSession,
    broker: NotificationBroker,
    clock: WorldClock,
    generator: AnomalyGenerator,
    rng: StdRng,
    selected: Option<AnomalyId>,
    effects: mpsc::UnboundedSender<Effect>,
}

impl WorldInstance {
    /// Create an instance around a loaded or fresh snapshot.
    ///
    /// The local agent is added to the snapshot if missing. Returns the
    /// receiving end of the effects channel.
    pub fn new(
        mut state: WorldState,
        self_agent: Agent,
        settings: InstanceSettings,
    ) -> (Self, mpsc::UnboundedReceiver<Effect>) {
        ensure_agent(&mut state, &self_agent);
        let rng = settings
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let (effects, effects_rx) = mpsc::unbounded_channel();
        let instance = Self {
            state,
            self_agent,
            breach: BreachSession::new(),
            broker: NotificationBroker::new(),
            clock: settings.clock,
            generator: settings.generator,
            rng,
            selected: None,
            effects,
        };
        (instance, effects_rx)
    }

    /// The current snapshot.
    pub const fn state(&self) -> &WorldState {
        &self.state
    }

    /// This instance's agent as created at startup.
    pub const fn self_agent(&self) -> &Agent {
        &self.self_agent
    }

    /// Selected anomaly, if any.
    pub const fn selected(&self) -> Option<&AnomalyId> {
        self.selected.as_ref()
    }

    /// Breach session status.
    pub fn breach_status(&self) -> BreachStatus {
        self.breach.status()
    }

    /// Recent notifications, newest first.
    pub fn notifications(&self) -> Vec<NotificationEvent> {
        self.broker.recent()
    }

    /// Build a consistent view.
    pub fn view(&self) -> WorldView {
        WorldView {
            state: self.state.clone(),
            self_agent: self.self_agent.clone(),
            selected: self.selected.clone(),
            breach: self.breach.status(),
            notifications: self.broker.recent(),
        }
    }

    /// Apply a command.
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::View { reply } => {
                let _ = reply.send(self.view());
            }
            Command::Select { id, reply } => {
                let _ = reply.send(self.select(&id));
            }
            Command::InitiateHack { id, reply } => {
                let _ = reply.send(self.initiate_hack(&id));
            }
            Command::HackInput { color, reply } => {
                let _ = reply.send(self.hack_input(color));
            }
            Command::AnalyzeSelected { reply } => {
                let _ = reply.send(self.analyze_selected());
            }
            Command::Remote(message) => self.apply_remote(message),
            Command::AdvisoryComplete {
                anomaly_id,
                advisory,
            } => self.advisory_complete(&anomaly_id, &advisory),
        }
    }

    /// Run one tick, then publish and persist the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] if the tick counter cannot advance.
    pub fn tick(&mut self) -> Result<TickSummary, TickError> {
        let mut summary = tick::run_tick(
            &mut self.state,
            &self.clock,
            &self.generator,
            &mut self.rng,
        )?;
        for notice in std::mem::take(&mut summary.notices) {
            self.notify(notice);
        }
        self.broadcast_and_persist();
        debug!(
            tick = summary.tick,
            threat = %summary.threat_level,
            anomalies = self.state.anomalies.len(),
            "Tick complete"
        );
        Ok(summary)
    }

    /// Select an anomaly in the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::AnomalyNotFound`] if it is not present.
    pub fn select(&mut self, id: &AnomalyId) -> Result<Anomaly, CommandError> {
        let anomaly = self
            .state
            .anomaly(id)
            .cloned()
            .ok_or_else(|| CommandError::AnomalyNotFound(id.clone()))?;
        self.selected = Some(id.clone());
        touch_agent(&mut self.state, self.self_agent.id);
        self.broadcast_and_persist();
        Ok(anomaly)
    }

    /// Select an anomaly and arm a breach against it.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::AnomalyNotFound`] if the anomaly is not
    /// present, or [`CommandError::Breach`] if a breach is already armed.
    pub fn initiate_hack(&mut self, id: &AnomalyId) -> Result<BreachStatus, CommandError> {
        let target = self
            .state
            .anomaly(id)
            .cloned()
            .ok_or_else(|| CommandError::AnomalyNotFound(id.clone()))?;
        let notice = self.breach.initiate(&target, &mut self.rng)?;
        self.selected = Some(target.id.clone());
        info!(
            anomaly = %target.id,
            severity = target.severity,
            "Breach armed"
        );
        self.notify(notice);
        touch_agent(&mut self.state, self.self_agent.id);
        self.broadcast_and_persist();
        Ok(self.breach.status())
    }

    /// Feed one breach input.
    ///
    /// Input while no breach is armed is ignored. A resolution emits its
    /// notice and publishes and persists the snapshot immediately. Success
    /// also clears the selection, whatever is selected.
    pub fn hack_input(&mut self, color: SignalColor) -> InputOutcome {
        let outcome = self.breach.input(color, &mut self.state);
        match &outcome {
            InputOutcome::Ignored => {
                debug!(?color, "Breach input ignored, no breach armed");
            }
            InputOutcome::Progress { matched, remaining } => {
                debug!(matched, remaining, "Breach input accepted");
            }
            InputOutcome::Success(resolution) => {
                info!(
                    anomaly = %resolution.target,
                    removed = resolution.anomaly_removed,
                    "Breach succeeded"
                );
                self.log_reputation(resolution);
                self.selected = None;
                self.notify(resolution.notice.clone());
                touch_agent(&mut self.state, self.self_agent.id);
                self.broadcast_and_persist();
            }
            InputOutcome::Failure(resolution) => {
                warn!(
                    anomaly = %resolution.target,
                    threat = %self.state.threat_level,
                    "Breach failed, lockdown engaged"
                );
                self.log_reputation(resolution);
                self.notify(resolution.notice.clone());
                touch_agent(&mut self.state, self.self_agent.id);
                self.broadcast_and_persist();
            }
        }
        outcome
    }

    /// Hand the selected anomaly to the advisor.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NoSelection`] if nothing is selected, or
    /// [`CommandError::AnomalyNotFound`] if the selection is gone.
    pub fn analyze_selected(&mut self) -> Result<Anomaly, CommandError> {
        let id = self.selected.clone().ok_or(CommandError::NoSelection)?;
        let anomaly = self
            .state
            .anomaly(&id)
            .cloned()
            .ok_or(CommandError::AnomalyNotFound(id))?;
        debug!(anomaly = %anomaly.id, "Advisory requested");
        self.send(Effect::Analyze(anomaly.clone()));
        Ok(anomaly)
    }

    /// Apply a peer message.
    ///
    /// Snapshots are merged and persisted but not re-published, so merges
    /// never echo around the channel.
    pub fn apply_remote(&mut self, message: SyncMessage) {
        match message {
            SyncMessage::WorldStateUpdate(incoming) => {
                let incoming_tick = incoming.tick;
                self.state = merge_snapshot(&self.state, incoming, &self.self_agent);
                debug!(tick = incoming_tick, "Peer snapshot merged");
                self.send(Effect::Persist(self.state.clone()));
            }
            SyncMessage::ActionNotif(event) => {
                debug!(tier = ?event.tier, "Peer notification relayed");
                self.broker.record_relayed(event);
            }
        }
    }

    /// Record a finished advisory as an INTEL notification.
    pub fn advisory_complete(&mut self, anomaly_id: &AnomalyId, advisory: &Advisory) {
        info!(anomaly = %anomaly_id, fallback = advisory.fallback, "Advisory complete");
        self.notify(Notice::new(
            NotificationTier::Intel,
            format!("{anomaly_id}: {}", advisory.text),
            ADVISORY_URGENCY,
        ));
    }

    fn notify(&mut self, notice: Notice) {
        let event = self.broker.emit_notice(notice);
        self.send(Effect::Publish(SyncMessage::ActionNotif(event)));
    }

    fn broadcast_and_persist(&self) {
        self.send(Effect::Publish(SyncMessage::WorldStateUpdate(
            self.state.clone(),
        )));
        self.send(Effect::Persist(self.state.clone()));
    }

    fn send(&self, effect: Effect) {
        if self.effects.send(effect).is_err() {
            debug!("Effects channel closed, dropping effect");
        }
    }

    fn log_reputation(&self, resolution: &sentinel_sim::BreachResolution) {
        for change in &resolution.reputation {
            info!(
                faction = %change.faction,
                before = change.score_before,
                after = change.score_after,
                tier = ?change.tier_after,
                tier_changed = change.tier_changed(),
                tick = self.state.tick,
                "Faction reputation changed"
            );
        }
    }
}
