//! Sync coordinator: snapshot merge and the transports that carry it.
//!
//! Every instance publishes its full snapshot on a named channel after each
//! local mutation and merges whatever arrives from peers. Reconciliation is
//! last-writer-wins per whole snapshot, except that the local agent's own
//! record is never taken from a peer.
//!
//! Messages carry the sender's agent id so an instance can drop its own
//! echoes: an envelope field on the in-process bus, a
//! [`ORIGIN_HEADER`] header on NATS.
//!
//! Delivery is best effort. A transport that fails to come up degrades to
//! [`SyncTransport::Disabled`] and every send becomes a no-op.

use futures::StreamExt as _;
use sentinel_sim::world;
use sentinel_types::{Agent, AgentId, SyncMessage, WorldState};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::{SyncConfig, TransportKind};

/// NATS header carrying the sender's agent id.
pub const ORIGIN_HEADER: &str = "Sentinel-Origin";

/// Default buffer size of the in-process bus.
pub const LOCAL_BUS_CAPACITY: usize = 256;

/// Errors raised by sync transports.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A message could not be encoded.
    #[error("failed to encode sync message: {source}")]
    Encode {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// Publishing to the transport failed.
    #[error("failed to publish on {channel}: {message}")]
    Publish {
        /// Channel the publish targeted.
        channel: String,
        /// Description of the failure.
        message: String,
    },

    /// Subscribing to the transport failed.
    #[error("failed to subscribe to {channel}: {message}")]
    Subscribe {
        /// Channel the subscription targeted.
        channel: String,
        /// Description of the failure.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge a peer snapshot into the local one.
///
/// The result is `incoming` with its agent set replaced by
/// `(incoming.agents minus self) + local self record`. If the local
/// snapshot lacks the self record, `self_agent` is used. The result is then
/// normalized: caps enforced, one standing per faction, tiers re-derived.
pub fn merge_snapshot(local: &WorldState, incoming: WorldState, self_agent: &Agent) -> WorldState {
    let own = local
        .agent(self_agent.id)
        .cloned()
        .unwrap_or_else(|| self_agent.clone());

    let mut merged = incoming;
    merged.agents.retain(|agent| agent.id != own.id);
    merged.agents.push(own);

    let repairs = world::normalize(&mut merged);
    if !repairs.is_clean() {
        warn!(
            tick = merged.tick,
            evicted = repairs.evicted,
            factions_rebuilt = repairs.factions_rebuilt,
            tiers_corrected = repairs.tiers_corrected,
            "Peer snapshot violated world invariants, repaired"
        );
    }
    merged
}

// ---------------------------------------------------------------------------
// In-process bus
// ---------------------------------------------------------------------------

/// A message tagged with its sender.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Agent id of the sending instance.
    pub origin: AgentId,
    /// The message itself.
    pub message: SyncMessage,
}

/// A named in-process broadcast channel.
///
/// Clones share the same channel, so every instance holding a clone sees
/// every other instance's messages.
#[derive(Debug, Clone)]
pub struct LocalBus {
    name: String,
    sender: broadcast::Sender<Envelope>,
}

impl LocalBus {
    /// Create a bus with the given name and buffer size.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            sender,
        }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A NATS subject used as the sync channel.
#[derive(Debug, Clone)]
pub struct NatsChannel {
    client: async_nats::Client,
    subject: String,
}

/// Outbound/inbound sync transport.
#[derive(Debug, Clone)]
pub enum SyncTransport {
    /// In-process bus.
    Local(LocalBus),
    /// Local NATS server.
    Nats(NatsChannel),
    /// No synchronization; sends are no-ops and nothing arrives.
    Disabled,
}

impl SyncTransport {
    /// Build the configured transport.
    ///
    /// `bus` is used for [`TransportKind::Local`]. A NATS connection failure
    /// is logged and yields [`SyncTransport::Disabled`].
    pub async fn connect(config: &SyncConfig, bus: &LocalBus) -> Self {
        match config.transport {
            TransportKind::Local => Self::Local(bus.clone()),
            TransportKind::Disabled => Self::Disabled,
            TransportKind::Nats => match async_nats::connect(config.nats_url.as_str()).await {
                Ok(client) => Self::Nats(NatsChannel {
                    client,
                    subject: config.channel_name.clone(),
                }),
                Err(e) => {
                    warn!(
                        url = %config.nats_url,
                        error = %e,
                        "Sync transport unavailable, running unsynchronized"
                    );
                    Self::Disabled
                }
            },
        }
    }

    /// Short label for logging.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Nats(_) => "nats",
            Self::Disabled => "disabled",
        }
    }

    /// Publish a message tagged with `origin`.
    ///
    /// Having no listeners is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Encode`] or [`SyncError::Publish`] on NATS
    /// failures.
    pub async fn publish(&self, origin: AgentId, message: &SyncMessage) -> Result<(), SyncError> {
        match self {
            Self::Disabled => Ok(()),
            Self::Local(bus) => {
                let envelope = Envelope {
                    origin,
                    message: message.clone(),
                };
                if bus.sender.send(envelope).is_err() {
                    debug!(channel = %bus.name, "No local subscribers for sync message");
                }
                Ok(())
            }
            Self::Nats(channel) => {
                let payload = serde_json::to_vec(message)?;
                let mut headers = async_nats::HeaderMap::new();
                headers.insert(ORIGIN_HEADER, origin.to_string().as_str());
                channel
                    .client
                    .publish_with_headers(channel.subject.clone(), headers, payload.into())
                    .await
                    .map_err(|e| SyncError::Publish {
                        channel: channel.subject.clone(),
                        message: e.to_string(),
                    })
            }
        }
    }

    /// Open an inbound subscription that drops messages from `self_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Subscribe`] if the NATS subscription fails.
    pub async fn subscribe(&self, self_id: AgentId) -> Result<Inbound, SyncError> {
        let source = match self {
            Self::Disabled => InboundSource::Disabled,
            Self::Local(bus) => InboundSource::Local(bus.sender.subscribe()),
            Self::Nats(channel) => {
                let subscriber = channel
                    .client
                    .subscribe(channel.subject.clone())
                    .await
                    .map_err(|e| SyncError::Subscribe {
                        channel: channel.subject.clone(),
                        message: e.to_string(),
                    })?;
                InboundSource::Nats(subscriber)
            }
        };
        Ok(Inbound { self_id, source })
    }
}

#[derive(Debug)]
enum InboundSource {
    Local(broadcast::Receiver<Envelope>),
    Nats(async_nats::Subscriber),
    Disabled,
}

/// Stream of peer messages for one instance.
#[derive(Debug)]
pub struct Inbound {
    self_id: AgentId,
    source: InboundSource,
}

impl Inbound {
    /// Wait for the next message from a peer.
    ///
    /// Own echoes and undecodable payloads are skipped. Returns `None` once
    /// the transport is closed (immediately for a disabled transport).
    pub async fn next(&mut self) -> Option<SyncMessage> {
        let self_id = self.self_id;
        match &mut self.source {
            InboundSource::Disabled => None,
            InboundSource::Local(receiver) => loop {
                match receiver.recv().await {
                    Ok(envelope) if envelope.origin == self_id => {}
                    Ok(envelope) => return Some(envelope.message),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Sync subscriber lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
            InboundSource::Nats(subscriber) => {
                let own = self_id.to_string();
                while let Some(msg) = subscriber.next().await {
                    let is_echo = msg
                        .headers
                        .as_ref()
                        .and_then(|headers| headers.get(ORIGIN_HEADER))
                        .is_some_and(|origin| origin.as_str() == own);
                    if is_echo {
                        continue;
                    }
                    match serde_json::from_slice::<SyncMessage>(&msg.payload) {
                        Ok(message) => return Some(message),
                        Err(e) => warn!(error = %e, "Failed to decode sync message"),
                    }
                }
                None
            }
        }
    }
}
