//! Instance runner with operator controls.
//!
//! [`spawn_instance`] moves a [`WorldInstance`] onto its own task and
//! returns a cloneable [`WorldHandle`]. The task is the only writer: it
//! multiplexes
//!
//! - **Ticks** on the operator's interval, unless paused
//! - **Commands** from handles (player actions, views)
//! - **Peer messages** forwarded from the sync transport
//! - **Advisory completions** from the effects task
//!
//! Two helper tasks run beside it. The inbound task turns sync traffic into
//! [`Command::Remote`]. The effects task publishes, saves and calls the
//! advisor in the order the instance produced the work, so the last snapshot
//! saved is always the newest one.
//!
//! The instance ends on an operator stop, when `max_ticks` is reached, or
//! when every handle has been dropped. Pending effects are flushed before
//! the join handle resolves.

use std::sync::Arc;
use std::time::Duration;

use sentinel_advisor::Advisor;
use sentinel_sim::{BreachStatus, InputOutcome};
use sentinel_store::SnapshotStore;
use sentinel_types::{AgentId, Anomaly, AnomalyId, SignalColor, WorldState};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::instance::{Command, CommandError, Effect, WorldInstance, WorldView};
use crate::operator::{InstanceEndReason, OperatorState};
use crate::sync::{SyncError, SyncTransport};
use crate::tick::{TickError, TickSummary};

/// Depth of the command queue between handles and the instance task.
const COMMAND_QUEUE_DEPTH: usize = 64;

/// Errors that can occur while running an instance.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },

    /// The sync subscription could not be opened.
    #[error("sync error: {source}")]
    Sync {
        /// The underlying sync error.
        #[from]
        source: SyncError,
    },
}

/// Result of an instance run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceResult {
    /// The reason the instance ended.
    pub end_reason: InstanceEndReason,
    /// Total number of ticks executed by this run.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
///
/// Implementations can use this to update the observer snapshot or
/// broadcast tick summaries.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &WorldState);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &WorldState) {}
}

/// Outside services the effects task talks to.
#[derive(Debug, Clone)]
pub struct Services {
    /// Sync transport for publishing and subscribing.
    pub transport: SyncTransport,
    /// Snapshot store; `None` disables persistence.
    pub store: Option<SnapshotStore>,
    /// Advisory client.
    pub advisor: Advisor,
}

/// Cloneable handle to a running instance.
#[derive(Debug, Clone)]
pub struct WorldHandle {
    commands: mpsc::Sender<Command>,
    operator: Arc<OperatorState>,
    self_id: AgentId,
}

impl WorldHandle {
    /// The instance's operator controls.
    pub const fn operator(&self) -> &Arc<OperatorState> {
        &self.operator
    }

    /// Identifier of the instance's agent.
    pub const fn self_id(&self) -> AgentId {
        self.self_id
    }

    /// Request a clean stop.
    pub fn stop(&self) {
        self.operator.request_stop();
    }

    /// Whether the instance task is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Read a consistent view of the instance.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InstanceClosed`] once the instance has ended.
    pub async fn view(&self) -> Result<WorldView, CommandError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::View { reply }).await?;
        response.await.map_err(|_closed| CommandError::InstanceClosed)
    }

    /// Select an anomaly.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::AnomalyNotFound`] or
    /// [`CommandError::InstanceClosed`].
    pub async fn select(&self, id: AnomalyId) -> Result<Anomaly, CommandError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Select { id, reply }).await?;
        response.await.map_err(|_closed| CommandError::InstanceClosed)?
    }

    /// Arm a breach against an anomaly.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::AnomalyNotFound`], [`CommandError::Breach`]
    /// if a breach is already armed, or [`CommandError::InstanceClosed`].
    pub async fn initiate_hack(&self, id: AnomalyId) -> Result<BreachStatus, CommandError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::InitiateHack { id, reply }).await?;
        response.await.map_err(|_closed| CommandError::InstanceClosed)?
    }

    /// Feed one breach input.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InstanceClosed`] once the instance has ended.
    pub async fn hack_input(&self, color: SignalColor) -> Result<InputOutcome, CommandError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::HackInput { color, reply }).await?;
        response.await.map_err(|_closed| CommandError::InstanceClosed)
    }

    /// Request an advisory for the selected anomaly. The advisory arrives
    /// later as an INTEL notification.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NoSelection`],
    /// [`CommandError::AnomalyNotFound`] or [`CommandError::InstanceClosed`].
    pub async fn analyze_selected(&self) -> Result<Anomaly, CommandError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::AnalyzeSelected { reply }).await?;
        response.await.map_err(|_closed| CommandError::InstanceClosed)?
    }

    async fn send(&self, command: Command) -> Result<(), CommandError> {
        self.commands
            .send(command)
            .await
            .map_err(|_closed| CommandError::InstanceClosed)
    }
}

/// Start an instance on its own task.
///
/// Opens the sync subscription, spawns the inbound and effects tasks, and
/// returns a handle plus the join handle of the instance task.
///
/// # Errors
///
/// Returns [`RunnerError::Sync`] if the sync subscription cannot be opened.
pub async fn spawn_instance(
    instance: WorldInstance,
    effects: mpsc::UnboundedReceiver<Effect>,
    services: Services,
    operator: Arc<OperatorState>,
    callback: Box<dyn TickCallback>,
) -> Result<(WorldHandle, JoinHandle<Result<InstanceResult, RunnerError>>), RunnerError> {
    let self_id = instance.self_agent().id;
    let mut inbound = services.transport.subscribe(self_id).await?;
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

    let forward = command_tx.downgrade();
    let inbound_task = tokio::spawn(async move {
        while let Some(message) = inbound.next().await {
            let Some(sender) = forward.upgrade() else {
                break;
            };
            if sender.send(Command::Remote(message)).await.is_err() {
                break;
            }
        }
    });

    let effects_task = tokio::spawn(run_effects(
        effects,
        services.clone(),
        self_id,
        command_tx.downgrade(),
    ));

    info!(
        agent_id = %self_id,
        agent = %instance.self_agent().name,
        transport = services.transport.label(),
        persistence = services.store.is_some(),
        advisor = services.advisor.name(),
        "Instance starting"
    );

    let handle = WorldHandle {
        commands: command_tx,
        operator: Arc::clone(&operator),
        self_id,
    };

    let join = tokio::spawn(async move {
        let mut callback = callback;
        let mut command_rx = command_rx;
        let outcome = drive(instance, &mut command_rx, &operator, callback.as_mut()).await;
        drop(command_rx);
        inbound_task.abort();
        if let Err(e) = effects_task.await {
            warn!(error = %e, "Effects task ended abnormally");
        }
        let result = outcome?;
        operator.set_end_reason(result.end_reason).await;
        log_instance_end(&result);
        Ok(result)
    });

    Ok((handle, join))
}

/// The single-writer loop. Consumes the instance so its effects sender is
/// dropped on return, which lets the effects task drain and finish.
async fn drive(
    mut instance: WorldInstance,
    commands: &mut mpsc::Receiver<Command>,
    operator: &OperatorState,
    callback: &mut dyn TickCallback,
) -> Result<InstanceResult, RunnerError> {
    let mut total_ticks: u64 = 0;
    let mut generation = operator.interval_generation();
    let mut interval = tick_interval(operator.tick_interval_ms());

    info!(
        tick = instance.state().tick,
        max_ticks = operator.max_ticks(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Tick loop starting"
    );

    let end_reason = loop {
        if operator.tick_limit_reached(total_ticks) {
            info!(
                tick = instance.state().tick,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            break InstanceEndReason::MaxTicksReached;
        }

        let paused = operator.is_paused();
        tokio::select! {
            biased;
            () = operator.stopped() => {
                info!("Operator stop requested");
                break InstanceEndReason::OperatorStop;
            }
            command = commands.recv() => match command {
                Some(command) => instance.handle(command),
                None => {
                    info!("All handles dropped");
                    break InstanceEndReason::HandlesDropped;
                }
            },
            () = operator.wait_if_paused(), if paused => {
                info!("Ticking resumed");
            }
            _ = interval.tick(), if !paused => {
                if operator.is_paused() {
                    info!("Ticking paused");
                    continue;
                }
                let summary = instance.tick()?;
                total_ticks = total_ticks.saturating_add(1);
                callback.on_tick(&summary, instance.state());
            }
        }

        let current = operator.interval_generation();
        if current != generation {
            generation = current;
            interval = tick_interval(operator.tick_interval_ms());
            debug!(tick_interval_ms = operator.tick_interval_ms(), "Tick interval changed");
        }
    };

    drop(instance);
    Ok(InstanceResult {
        end_reason,
        total_ticks,
    })
}

/// Carry out instance effects in order until the instance drops its sender.
async fn run_effects(
    mut effects: mpsc::UnboundedReceiver<Effect>,
    services: Services,
    origin: AgentId,
    commands: mpsc::WeakSender<Command>,
) {
    while let Some(effect) = effects.recv().await {
        match effect {
            Effect::Publish(message) => {
                if let Err(e) = services.transport.publish(origin, &message).await {
                    warn!(kind = message.kind(), error = %e, "Sync publish failed");
                }
            }
            Effect::Persist(state) => {
                if let Some(store) = &services.store {
                    if let Err(e) = store.save(&state).await {
                        warn!(tick = state.tick, error = %e, "Snapshot save failed");
                    }
                }
            }
            Effect::Analyze(anomaly) => {
                let advisor = services.advisor.clone();
                let commands = commands.clone();
                tokio::spawn(async move {
                    let advisory = advisor.analyze_or_fallback(&anomaly).await;
                    if let Some(sender) = commands.upgrade() {
                        let completed = Command::AdvisoryComplete {
                            anomaly_id: anomaly.id,
                            advisory,
                        };
                        if sender.send(completed).await.is_err() {
                            debug!("Instance closed before advisory completed");
                        }
                    }
                });
            }
        }
    }
    debug!("Effects drained");
}

fn tick_interval(ms: u64) -> Interval {
    let period = Duration::from_millis(ms.max(1));
    let now = Instant::now();
    let start = now.checked_add(period).unwrap_or(now);
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Log the end of an instance run.
pub fn log_instance_end(result: &InstanceResult) {
    if result.total_ticks == 0 {
        warn!(reason = ?result.end_reason, "Instance ended with no ticks executed");
    } else {
        info!(
            reason = ?result.end_reason,
            total_ticks = result.total_ticks,
            "Instance ended"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use sentinel_sim::{AnomalyGenerator, world};
    use sentinel_types::{Agent, Position};

    use super::*;
    use crate::clock::WorldClock;
    use crate::instance::InstanceSettings;

    struct CountCallback {
        count: Arc<AtomicU64>,
    }

    impl TickCallback for CountCallback {
        fn on_tick(&mut self, _summary: &TickSummary, _state: &WorldState) {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn services(store: Option<SnapshotStore>) -> Services {
        Services {
            transport: SyncTransport::Disabled,
            store,
            advisor: Advisor::Offline,
        }
    }

    fn instance() -> (WorldInstance, mpsc::UnboundedReceiver<Effect>) {
        let me = Agent::new("Ghost", Position::default());
        let settings = InstanceSettings {
            clock: WorldClock::default(),
            generator: AnomalyGenerator::new(0.0),
            seed: Some(9),
        };
        WorldInstance::new(world::initial_state(&me), me, settings)
    }

    #[tokio::test]
    async fn bounded_by_max_ticks() {
        let (instance, effects) = instance();
        let operator = Arc::new(OperatorState::new(1, 5));
        let count = Arc::new(AtomicU64::new(0));
        let callback = Box::new(CountCallback {
            count: Arc::clone(&count),
        });

        let (handle, join) = spawn_instance(instance, effects, services(None), operator, callback)
            .await
            .unwrap();
        let result = join.await.unwrap().unwrap();

        assert_eq!(result.end_reason, InstanceEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(count.load(Ordering::Relaxed), 5);
        assert_eq!(
            handle.operator().end_reason().await,
            Some(InstanceEndReason::MaxTicksReached)
        );
        assert!(matches!(handle.view().await, Err(CommandError::InstanceClosed)));
    }

    #[tokio::test]
    async fn operator_stop() {
        let (instance, effects) = instance();
        let operator = Arc::new(OperatorState::new(1, 0));
        operator.request_stop();

        let (_handle, join) =
            spawn_instance(instance, effects, services(None), operator, Box::new(NoOpCallback))
                .await
                .unwrap();
        let result = join.await.unwrap().unwrap();

        assert_eq!(result.end_reason, InstanceEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
    }

    #[tokio::test]
    async fn dropping_handles_ends_instance() {
        let (instance, effects) = instance();
        let operator = Arc::new(OperatorState::new(1_000, 0));
        let (handle, join) =
            spawn_instance(instance, effects, services(None), operator, Box::new(NoOpCallback))
                .await
                .unwrap();
        drop(handle);

        let result = join.await.unwrap().unwrap();
        assert_eq!(result.end_reason, InstanceEndReason::HandlesDropped);
    }

    #[tokio::test]
    async fn paused_instance_answers_commands_without_ticking() {
        let (instance, effects) = instance();
        let operator = Arc::new(OperatorState::new(1, 1));
        operator.pause();
        let (handle, join) =
            spawn_instance(instance, effects, services(None), operator, Box::new(NoOpCallback))
                .await
                .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let view = handle.view().await.unwrap();
        assert_eq!(view.state.tick, 0);
        assert!(matches!(
            handle.select(AnomalyId::for_tick(4)).await,
            Err(CommandError::AnomalyNotFound(_))
        ));

        handle.operator().resume();
        let result = join.await.unwrap().unwrap();
        assert_eq!(result.total_ticks, 1);
    }

    #[tokio::test]
    async fn final_snapshot_is_persisted() {
        let dir = std::env::temp_dir().join(format!("sentinel-runner-{}", uuid::Uuid::new_v4()));
        let store = SnapshotStore::new(&dir, "sentinel-world-state");
        let (instance, effects) = instance();
        let operator = Arc::new(OperatorState::new(1, 3));

        let (_handle, join) = spawn_instance(
            instance,
            effects,
            services(Some(store.clone())),
            operator,
            Box::new(NoOpCallback),
        )
        .await
        .unwrap();
        join.await.unwrap().unwrap();

        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.tick, 3);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn interval_change_is_picked_up() {
        let (instance, effects) = instance();
        let operator = Arc::new(OperatorState::new(60_000, 2));
        let (handle, join) =
            spawn_instance(instance, effects, services(None), operator, Box::new(NoOpCallback))
                .await
                .unwrap();

        assert!(handle.operator().set_tick_interval_ms(100).is_some());
        // The loop only notices the change after its next wakeup.
        handle.view().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), join)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(result.total_ticks, 2);
    }
}
