//! Adapter runtime integration.
//!
//! Bridges the sync game loop with the async TCP server.

use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::protocol::{AckMessage, ObservationMessage};
use crate::server::{run_server_with_status, AdapterStatus, AdapterStatusSnapshot, ServerConfig};
use crate::types::GameAction;

/// Command delivered to the game loop.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub payload: InboundPayload,
}

#[derive(Debug, Clone)]
pub enum InboundPayload {
    /// Apply a command, then ack it to the sender.
    Command(ClientCommand),
    /// Send the current observation to the sender only.
    SnapshotRequest,
}

/// Command payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Actions(Vec<GameAction>),
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClientAck { client_id: usize, ack: AckMessage },
    ToClientObservation { client_id: usize, obs: ObservationMessage },
    BroadcastObservation { obs: ObservationMessage },
}

/// Running adapter instance.
pub struct Adapter {
    _rt: Runtime,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    status: Arc<AdapterStatus>,
}

impl Adapter {
    /// Start the adapter from environment variables.
    ///
    /// Returns `Ok(None)` if `T2048_AI_DISABLED` is set.
    pub fn start_from_env() -> anyhow::Result<Option<Self>> {
        if ServerConfig::is_disabled() {
            log::info!("AI adapter disabled via T2048_AI_DISABLED");
            return Ok(None);
        }
        Self::start(ServerConfig::from_env()).map(Some)
    }

    /// Start the adapter on a background tokio runtime.
    pub fn start(config: ServerConfig) -> anyhow::Result<Self> {
        let max_pending = config.max_pending_commands.max(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let status = Arc::new(AdapterStatus::default());

        let rt = Runtime::new().context("failed to create tokio runtime")?;
        let server_status = Arc::clone(&status);
        rt.spawn(async move {
            if let Err(e) = run_server_with_status(config, cmd_tx, out_rx, None, server_status).await {
                log::warn!("AI adapter stopped: {:#}", e);
            }
        });

        Ok(Self {
            _rt: rt,
            cmd_rx,
            out_tx,
            status,
        })
    }

    pub fn try_recv(&mut self) -> Option<InboundCommand> {
        self.cmd_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    pub fn status(&self) -> AdapterStatusSnapshot {
        self.status.snapshot()
    }
}
