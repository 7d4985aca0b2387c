//! TCP server for the AI adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::core::GameSnapshot;
use crate::protocol::*;
use crate::runtime::{ClientCommand, InboundCommand, InboundPayload, OutboundMessage};
use crate::types::GRID_SIZE;

/// Stable 64-bit FNV-1a hasher for deterministic `state_hash`.
///
/// `DefaultHasher` output is not guaranteed stable across Rust releases.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl std::hash::Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

pub const DEFAULT_PORT: u16 = 7778;
pub const DEFAULT_MAX_PENDING: usize = 10;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_pending_commands: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_pending_commands: DEFAULT_MAX_PENDING,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    ///
    /// - `T2048_AI_HOST` (default `127.0.0.1`)
    /// - `T2048_AI_PORT` (default 7778)
    /// - `T2048_AI_MAX_PENDING` (default 10)
    pub fn from_env() -> Self {
        use std::env;

        let host = env::var("T2048_AI_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = env::var("T2048_AI_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let max_pending_commands = env::var("T2048_AI_MAX_PENDING")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_PENDING);

        Self {
            host,
            port,
            max_pending_commands,
        }
    }

    /// Check if the adapter is disabled via `T2048_AI_DISABLED`.
    pub fn is_disabled() -> bool {
        std::env::var("T2048_AI_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Live adapter counters, readable from the game thread without locking.
#[derive(Debug, Default)]
pub struct AdapterStatus {
    clients: AtomicUsize,
    streaming: AtomicUsize,
    /// Controller client id, 0 when nobody controls.
    controller: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterStatusSnapshot {
    pub client_count: usize,
    pub streaming_count: usize,
    pub controller_id: Option<usize>,
}

impl AdapterStatus {
    pub fn snapshot(&self) -> AdapterStatusSnapshot {
        let controller = self.controller.load(Ordering::Relaxed);
        AdapterStatusSnapshot {
            client_count: self.clients.load(Ordering::Relaxed),
            streaming_count: self.streaming.load(Ordering::Relaxed),
            controller_id: (controller != 0).then_some(controller),
        }
    }
}

/// Handle to a connected client
struct ClientHandle {
    id: usize,
    addr: SocketAddr,
    stream_observations: bool,
    handshaken: bool,
    last_seq: Option<u64>,
    tx: mpsc::UnboundedSender<ClientOutbound>,
}

/// Connected clients plus the controller slot, guarded together.
#[derive(Default)]
struct Registry {
    clients: Vec<ClientHandle>,
    controller: Option<usize>,
}

impl Registry {
    fn get(&self, client_id: usize) -> Option<&ClientHandle> {
        self.clients.iter().find(|c| c.id == client_id)
    }

    fn get_mut(&mut self, client_id: usize) -> Option<&mut ClientHandle> {
        self.clients.iter_mut().find(|c| c.id == client_id)
    }

    fn is_handshaken(&self, client_id: usize) -> bool {
        self.get(client_id).map(|c| c.handshaken).unwrap_or(false)
    }

    /// Enforce strictly increasing seq per client.
    fn check_and_update_seq(&mut self, client_id: usize, seq: u64) -> bool {
        let Some(client) = self.get_mut(client_id) else {
            return true;
        };
        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }

    fn publish(&self, status: &AdapterStatus) {
        status.clients.store(self.clients.len(), Ordering::Relaxed);
        status.streaming.store(
            self.clients.iter().filter(|c| c.stream_observations).count(),
            Ordering::Relaxed,
        );
        status
            .controller
            .store(self.controller.unwrap_or(0), Ordering::Relaxed);
    }
}

/// Shared server state
struct ServerState {
    registry: RwLock<Registry>,
    status: Arc<AdapterStatus>,
}

#[derive(Debug, Clone)]
enum ClientOutbound {
    Welcome(WelcomeMessage),
    Ack(AckMessage),
    Error(ErrorMessage),
    Observation(Arc<ObservationMessage>),
}

/// Start the TCP server with a private status block.
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    run_server_with_status(
        config,
        command_tx,
        out_rx,
        ready_tx,
        Arc::new(AdapterStatus::default()),
    )
    .await
}

/// Start the TCP server, publishing client counts into `status`.
pub async fn run_server_with_status(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
    status: Arc<AdapterStatus>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    let bound = listener.local_addr()?;
    log::info!("AI adapter listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState {
        registry: RwLock::new(Registry::default()),
        status,
    });

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let registry = state.registry.read().await;
                match msg {
                    OutboundMessage::ToClientAck { client_id, ack } => {
                        if let Some(c) = registry.get(client_id) {
                            let _ = c.tx.send(ClientOutbound::Ack(ack));
                        }
                    }
                    OutboundMessage::ToClientObservation { client_id, obs } => {
                        if let Some(c) = registry.get(client_id) {
                            let _ = c.tx.send(ClientOutbound::Observation(Arc::new(obs)));
                        }
                    }
                    OutboundMessage::BroadcastObservation { obs } => {
                        let obs = Arc::new(obs);
                        for c in registry.clients.iter() {
                            if c.handshaken && c.stream_observations {
                                let _ = c.tx.send(ClientOutbound::Observation(Arc::clone(&obs)));
                            }
                        }
                    }
                }
            }
        });
    }

    let mut client_id_counter = 0usize;
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;
        log::info!("client {} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, addr, client_id, state, command_tx).await {
                log::warn!("client {} error: {:#}", client_id, e);
            }
            log::info!("client {} disconnected", client_id);
        });
    }
}

fn send_error(tx: &mpsc::UnboundedSender<ClientOutbound>, seq: u64, code: ErrorCode, message: &str) {
    let _ = tx.send(ClientOutbound::Error(create_error(seq, code, message)));
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: usize,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    {
        let mut registry = state.registry.write().await;
        registry.clients.push(ClientHandle {
            id: client_id,
            addr,
            stream_observations: false,
            handshaken: false,
            last_seq: None,
            tx: tx.clone(),
        });
        registry.publish(&state.status);
    }

    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            let encoded = match &msg {
                ClientOutbound::Welcome(m) => serde_json::to_writer(&mut buf, m),
                ClientOutbound::Ack(m) => serde_json::to_writer(&mut buf, m),
                ClientOutbound::Error(m) => serde_json::to_writer(&mut buf, m),
                ClientOutbound::Observation(m) => serde_json::to_writer(&mut buf, m.as_ref()),
            };
            if let Err(e) = encoded {
                log::warn!("failed to encode outbound message: {}", e);
                continue;
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() || writer.flush().await.is_err() {
                break;
            }
        }
    });

    let result = read_loop(&mut reader, client_id, &state, &command_tx, &tx).await;

    // Remove client and promote a new controller if needed.
    {
        let mut registry = state.registry.write().await;
        let was_controller = registry.controller == Some(client_id);
        registry.clients.retain(|c| c.id != client_id);

        if was_controller {
            let next_id = registry
                .clients
                .iter()
                .filter(|c| c.handshaken)
                .map(|c| c.id)
                .min();
            registry.controller = next_id;
            match next_id {
                Some(new_id) => {
                    let addr = registry.get(new_id).map(|c| c.addr);
                    log::info!("client {} promoted to controller ({:?})", new_id, addr);
                }
                None => log::info!("controller {} released", client_id),
            }
        }
        registry.publish(&state.status);
    }

    drop(tx);
    let _ = write_task.await;

    result
}

async fn read_loop(
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    client_id: usize,
    state: &Arc<ServerState>,
    command_tx: &mpsc::Sender<InboundCommand>,
    tx: &mpsc::UnboundedSender<ClientOutbound>,
) -> anyhow::Result<()> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                let mut registry = state.registry.write().await;
                if registry.is_handshaken(client_id)
                    && !registry.check_and_update_seq(client_id, hello.seq)
                {
                    send_error(tx, hello.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }

                if protocol_major(&hello.protocol_version) != protocol_major(PROTOCOL_VERSION) {
                    send_error(
                        tx,
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("Protocol version {} not supported", hello.protocol_version),
                    );
                    return Ok(());
                }

                if registry.controller.is_none() {
                    registry.controller = Some(client_id);
                    log::info!("client {} ({}) is now controller", client_id, hello.client.name);
                }
                let controller = registry.controller;
                if let Some(client) = registry.get_mut(client_id) {
                    client.handshaken = true;
                    client.last_seq = Some(hello.seq);
                    client.stream_observations = hello.requested.stream_observations;
                }
                registry.publish(&state.status);
                drop(registry);

                let role = if controller == Some(client_id) {
                    AssignedRole::Controller
                } else {
                    AssignedRole::Observer
                };
                let welcome = create_welcome(
                    hello.seq,
                    client_id as u64,
                    role,
                    controller.map(|id| id as u64),
                );
                let _ = tx.send(ClientOutbound::Welcome(welcome));

                if hello.requested.stream_observations {
                    let request = InboundCommand {
                        client_id,
                        seq: hello.seq,
                        payload: InboundPayload::SnapshotRequest,
                    };
                    if command_tx.try_send(request).is_err() {
                        log::debug!("snapshot request for client {} dropped", client_id);
                    }
                }
            }

            Ok(ParsedMessage::Command(cmd)) => {
                {
                    let mut registry = state.registry.write().await;
                    if !registry.is_handshaken(client_id) {
                        send_error(tx, cmd.seq, ErrorCode::HandshakeRequired, "Send hello before command");
                        continue;
                    }
                    if !registry.check_and_update_seq(client_id, cmd.seq) {
                        send_error(tx, cmd.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                        continue;
                    }
                    if registry.controller != Some(client_id) {
                        send_error(tx, cmd.seq, ErrorCode::NotController, "Only controller may send commands");
                        continue;
                    }
                }

                let actions = match cmd.actions {
                    Some(list) if !list.0.is_empty() => list.0.to_vec(),
                    _ => {
                        send_error(tx, cmd.seq, ErrorCode::InvalidCommand, "Missing actions");
                        continue;
                    }
                };

                // Ack is sent by the game loop once the command is applied.
                match command_tx.try_send(InboundCommand {
                    client_id,
                    seq: cmd.seq,
                    payload: InboundPayload::Command(ClientCommand::Actions(actions)),
                }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        send_error(tx, cmd.seq, ErrorCode::Backpressure, "Command queue is full");
                    }
                    Err(TrySendError::Closed(_)) => {
                        anyhow::bail!("game loop stopped accepting commands");
                    }
                }
            }

            Ok(ParsedMessage::Control(ctrl)) => {
                let mut registry = state.registry.write().await;
                if !registry.is_handshaken(client_id) {
                    send_error(tx, ctrl.seq, ErrorCode::HandshakeRequired, "Send hello before control");
                    continue;
                }
                if !registry.check_and_update_seq(client_id, ctrl.seq) {
                    send_error(tx, ctrl.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }

                match ctrl.action {
                    ControlAction::Claim => match registry.controller {
                        None => {
                            registry.controller = Some(client_id);
                            log::info!("client {} claimed control", client_id);
                            let _ = tx.send(ClientOutbound::Ack(create_ack(ctrl.seq, true)));
                        }
                        Some(id) if id == client_id => {
                            let _ = tx.send(ClientOutbound::Ack(create_ack(ctrl.seq, false)));
                        }
                        Some(_) => {
                            send_error(tx, ctrl.seq, ErrorCode::ControllerActive, "Controller already assigned");
                        }
                    },
                    ControlAction::Release => {
                        if registry.controller == Some(client_id) {
                            registry.controller = None;
                            log::info!("client {} released control", client_id);
                            let _ = tx.send(ClientOutbound::Ack(create_ack(ctrl.seq, true)));
                        } else {
                            send_error(tx, ctrl.seq, ErrorCode::NotController, "Only controller may release");
                        }
                    }
                }
                registry.publish(&state.status);
            }

            Ok(ParsedMessage::Unknown(unknown)) => {
                let mut registry = state.registry.write().await;
                if registry.is_handshaken(client_id)
                    && !registry.check_and_update_seq(client_id, unknown.seq)
                {
                    send_error(tx, unknown.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }
                send_error(tx, unknown.seq, ErrorCode::InvalidCommand, "Unknown message type");
            }

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                send_error(tx, seq, ErrorCode::InvalidCommand, &format!("JSON parse error: {}", e));
            }
        }
    }
}

/// Build an observation message from a game snapshot
pub fn build_observation(seq: u64, snap: &GameSnapshot) -> ObservationMessage {
    use std::hash::{Hash, Hasher};

    let mut cells = [[0u32; GRID_SIZE]; GRID_SIZE];
    for (row, out) in cells.iter_mut().enumerate() {
        for (col, v) in out.iter_mut().enumerate() {
            *v = snap.value(row, col);
        }
    }

    let mut hasher = Fnv1aHasher::new();
    cells.hash(&mut hasher);
    snap.score.hash(&mut hasher);
    snap.best_score.hash(&mut hasher);
    snap.moves.hash(&mut hasher);
    snap.game_over.hash(&mut hasher);
    snap.has_won.hash(&mut hasher);
    snap.keep_playing.hash(&mut hasher);
    snap.episode_id.hash(&mut hasher);
    snap.seed.hash(&mut hasher);
    for event in snap.events() {
        event.hash(&mut hasher);
    }
    let state_hash = StateHash(hasher.finish());

    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        playable: snap.playable(),
        game_over: snap.game_over,
        has_won: snap.has_won,
        keep_playing: snap.keep_playing,
        episode_id: snap.episode_id,
        seed: snap.seed,
        moves: snap.moves,
        board: BoardSnapshot {
            size: GRID_SIZE as u8,
            cells,
        },
        score: snap.score,
        best_score: snap.best_score,
        max_tile: snap.max_tile,
        last_events: snap.events().map(EventRecord::from).collect(),
        state_hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GameEngine, MemoryStore};
    use crate::types::{Direction, GameAction};

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 7778);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_pending_commands, 10);
    }

    #[test]
    fn test_observation_mirrors_snapshot() {
        let game = GameEngine::from_values(
            [[2, 2, 0, 0], [0, 0, 0, 4], [0; 4], [0; 4]],
            9,
            MemoryStore::new(),
        );
        let obs = build_observation(3, &game.snapshot());
        assert_eq!(obs.seq, 3);
        assert_eq!(obs.board.size, 4);
        assert_eq!(obs.board.cells[0], [2, 2, 0, 0]);
        assert_eq!(obs.board.cells[1][3], 4);
        assert_eq!(obs.max_tile, 4);
        assert!(obs.playable);
        assert!(obs.last_events.is_empty());
    }

    #[test]
    fn test_state_hash_stable_and_sensitive() {
        let mut game = GameEngine::from_values(
            [[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]],
            9,
            MemoryStore::new(),
        );
        let a = build_observation(1, &game.snapshot());
        let b = build_observation(2, &game.snapshot());
        assert_eq!(a.state_hash, b.state_hash);

        assert!(game.apply_action(GameAction::Move(Direction::Left)));
        let c = build_observation(3, &game.snapshot());
        assert_ne!(a.state_hash, c.state_hash);
        assert_eq!(c.last_events[0].kind, EventKind::Slide);
    }

    #[test]
    fn test_rejected_move_keeps_observed_events_and_hash() {
        let mut game = GameEngine::new(3);
        game.load_near_game_over();
        assert!(game.apply_action(GameAction::Move(Direction::Right)));
        let before = build_observation(1, &game.snapshot());

        assert!(!game.apply_action(GameAction::Move(Direction::Left)));
        let after = build_observation(2, &game.snapshot());

        assert_eq!(after.state_hash, before.state_hash);
        assert_eq!(after.last_events, before.last_events);
        assert!(after
            .last_events
            .iter()
            .any(|e| e.kind == EventKind::GameOver));
    }

    #[test]
    fn test_registry_seq_must_increase() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut registry = Registry::default();
        registry.clients.push(ClientHandle {
            id: 1,
            addr: "127.0.0.1:1".parse().unwrap(),
            stream_observations: true,
            handshaken: true,
            last_seq: Some(5),
            tx,
        });
        assert!(!registry.check_and_update_seq(1, 5));
        assert!(registry.check_and_update_seq(1, 6));
        assert!(!registry.check_and_update_seq(1, 2));
    }

    #[test]
    fn test_status_snapshot_reflects_registry() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let status = AdapterStatus::default();
        let mut registry = Registry::default();
        registry.publish(&status);
        assert_eq!(status.snapshot(), AdapterStatusSnapshot::default());

        registry.clients.push(ClientHandle {
            id: 4,
            addr: "127.0.0.1:1".parse().unwrap(),
            stream_observations: true,
            handshaken: true,
            last_seq: None,
            tx,
        });
        registry.controller = Some(4);
        registry.publish(&status);
        let snap = status.snapshot();
        assert_eq!(snap.client_count, 1);
        assert_eq!(snap.streaming_count, 1);
        assert_eq!(snap.controller_id, Some(4));
    }
}
