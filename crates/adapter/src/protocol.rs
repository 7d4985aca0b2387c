//! Protocol module - JSON message types for the AI adapter
//!
//! Line-delimited JSON. Every message carries `type`, `seq` (sequence number)
//! and `ts` (timestamp in ms).

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::types::{GameAction, GameEvent, GRID_SIZE};

/// Protocol version announced by the server. Clients must share the major.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Upper bound on actions in a single command.
pub const MAX_ACTIONS: usize = 32;

// ============== Client -> Game Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HelloType {
    #[default]
    #[serde(rename = "hello")]
    Hello,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommandType {
    #[default]
    #[serde(rename = "command")]
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControlType {
    #[default]
    #[serde(rename = "control")]
    Control,
}

/// Client hello message (first message on a connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type", default)]
    pub msg_type: HelloType,
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    #[serde(default)]
    pub requested: RequestedCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedCapabilities {
    #[serde(default = "default_stream")]
    pub stream_observations: bool,
}

fn default_stream() -> bool {
    true
}

impl Default for RequestedCapabilities {
    fn default() -> Self {
        Self {
            stream_observations: true,
        }
    }
}

/// Command message (controller only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type", default)]
    pub msg_type: CommandType,
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<ActionList>,
}

/// Bounded list of actions, parsed from their protocol names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionList(pub ArrayVec<GameAction, MAX_ACTIONS>);

impl<'de> Deserialize<'de> for ActionList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = ActionList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of action strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::<GameAction, MAX_ACTIONS>::new();
                while let Some(name) = seq.next_element::<std::borrow::Cow<'de, str>>()? {
                    let action = GameAction::from_str(&name).ok_or_else(|| {
                        serde::de::Error::custom(format!("unknown action: {name}"))
                    })?;
                    out.try_push(action)
                        .map_err(|_| serde::de::Error::custom("too many actions"))?;
                }
                Ok(ActionList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

impl Serialize for ActionList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.0.iter().map(|a| a.as_str()))
    }
}

/// Control message (claim/release controller status)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type", default)]
    pub msg_type: ControlType,
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub action: ControlAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Claim,
    Release,
}

// ============== Game -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    HandshakeRequired,
    ProtocolMismatch,
    NotController,
    ControllerActive,
    InvalidCommand,
    Backpressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignedRole {
    Controller,
    Observer,
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub role: AssignedRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<u64>,
    pub game_id: String,
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub formats: Vec<String>,
    pub actions: Vec<String>,
    pub features: Vec<CapabilityFeature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityFeature {
    Score,
    BestScore,
    MaxTile,
    LastEvents,
    StateHash,
}

/// Acknowledgment, sent after a command has been applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
    /// Whether any action in the command changed the game.
    #[serde(default)]
    pub applied: bool,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

/// Game state observation (sent to streaming clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub playable: bool,
    pub game_over: bool,
    pub has_won: bool,
    pub keep_playing: bool,
    pub episode_id: u32,
    pub seed: u32,
    pub moves: u32,
    pub board: BoardSnapshot,
    pub score: u32,
    pub best_score: u32,
    pub max_tile: u32,
    /// Events of the latest move that changed the board. A rejected move
    /// leaves them (and `state_hash`) as they were; the command's ack carries
    /// `applied: false` instead.
    pub last_events: Vec<EventRecord>,
    pub state_hash: StateHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub size: u8,
    /// Tile values row by row, 0 = empty.
    pub cells: [[u32; GRID_SIZE]; GRID_SIZE],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Slide,
    Merge,
    Unlock,
    Won,
    GameOver,
}

/// One move event as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRecord {
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
}

impl From<GameEvent> for EventRecord {
    fn from(event: GameEvent) -> Self {
        let (kind, value) = match event {
            GameEvent::Slide => (EventKind::Slide, None),
            GameEvent::Merge { max_value } => (EventKind::Merge, Some(max_value)),
            GameEvent::Unlock { value } => (EventKind::Unlock, Some(value)),
            GameEvent::Won => (EventKind::Won, None),
            GameEvent::GameOver => (EventKind::GameOver, None),
        };
        Self { kind, value }
    }
}

/// Deterministic state hash serialized as 16 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut buf = [0u8; 16];
        for (i, slot) in buf.iter_mut().enumerate() {
            let shift = (15 - i) * 4;
            *slot = HEX[((self.0 >> shift) & 0x0f) as usize];
        }
        // Every byte comes from HEX, so this cannot fail.
        let s = std::str::from_utf8(&buf).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        u64::from_str_radix(s.trim(), 16)
            .map(StateHash)
            .map_err(|_| serde::de::Error::custom("invalid hex"))
    }
}

// ============== Message Parsing ==============

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Control(ControlMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

/// Parse one protocol line.
///
/// Messages with an unrecognised `type` are not a parse error; they come back
/// as [`ParsedMessage::Unknown`] so the server can answer with the right seq.
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Deserialize)]
    struct Envelope<'a> {
        #[serde(rename = "type", borrow)]
        msg_type: Option<std::borrow::Cow<'a, str>>,
        seq: Option<u64>,
    }

    let envelope: Envelope = serde_json::from_str(json)?;
    match envelope.msg_type.as_deref() {
        Some("hello") => serde_json::from_str(json).map(ParsedMessage::Hello),
        Some("command") => serde_json::from_str(json).map(ParsedMessage::Command),
        Some("control") => serde_json::from_str(json).map(ParsedMessage::Control),
        _ => Ok(ParsedMessage::Unknown(UnknownMessage {
            seq: envelope.seq.unwrap_or(0),
        })),
    }
}

/// Best-effort `seq` extraction from a line that failed to parse.
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest
        .as_bytes()
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

/// Major component of a dotted version string.
pub fn protocol_major(version: &str) -> &str {
    version.split('.').next().unwrap_or("")
}

// ============== Utility Functions ==============

/// Create a hello message
pub fn create_hello(seq: u64, client_name: &str, protocol_version: &str) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: protocol_version.to_string(),
        requested: RequestedCapabilities::default(),
    }
}

/// Create a command message
pub fn create_command(seq: u64, actions: &[GameAction]) -> CommandMessage {
    CommandMessage {
        msg_type: CommandType::Command,
        seq,
        ts: current_timestamp_ms(),
        actions: Some(ActionList(actions.iter().copied().take(MAX_ACTIONS).collect())),
    }
}

/// Create a welcome message
pub fn create_welcome(
    seq: u64,
    client_id: u64,
    role: AssignedRole,
    controller_id: Option<u64>,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        client_id,
        role,
        controller_id,
        game_id: "tui-2048".to_string(),
        capabilities: ServerCapabilities {
            formats: vec!["json".to_string()],
            actions: ["up", "down", "left", "right", "restart", "keepPlaying"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            features: vec![
                CapabilityFeature::Score,
                CapabilityFeature::BestScore,
                CapabilityFeature::MaxTile,
                CapabilityFeature::LastEvents,
                CapabilityFeature::StateHash,
            ],
        },
    }
}

/// Create an acknowledgment
pub fn create_ack(seq: u64, applied: bool) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
        applied,
    }
}

/// Create an error message
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// Current timestamp in milliseconds
pub(crate) fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    #[test]
    fn test_parse_hello() {
        let json = r#"{"type":"hello","seq":1,"ts":1234567890,"client":{"name":"test-ai","version":"1.0.0"},"protocol_version":"1.0.0","requested":{"stream_observations":false}}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Hello(msg) => {
                assert_eq!(msg.seq, 1);
                assert_eq!(msg.client.name, "test-ai");
                assert_eq!(msg.protocol_version, "1.0.0");
                assert!(!msg.requested.stream_observations);
            }
            other => panic!("Expected Hello message, got {other:?}"),
        }
    }

    #[test]
    fn test_hello_streams_by_default() {
        let json = r#"{"type":"hello","seq":1,"client":{"name":"a","version":"0"},"protocol_version":"1"}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Hello(msg) => assert!(msg.requested.stream_observations),
            other => panic!("Expected Hello message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_command_actions() {
        let json = r#"{"type":"command","seq":2,"ts":1,"actions":["left","moveUp","restart","keepPlaying"]}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Command(msg) => {
                let a = msg.actions.unwrap();
                assert_eq!(
                    a.0.as_slice(),
                    &[
                        GameAction::Move(Direction::Left),
                        GameAction::Move(Direction::Up),
                        GameAction::Restart,
                        GameAction::KeepPlaying,
                    ]
                );
            }
            other => panic!("Expected Command message, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_is_parse_error() {
        let json = r#"{"type":"command","seq":2,"ts":1,"actions":["hardDrop"]}"#;
        let err = parse_message(json).unwrap_err();
        assert!(err.to_string().contains("unknown action"));
    }

    #[test]
    fn test_parse_control() {
        let json = r#"{"type":"control","seq":3,"ts":1234567910,"action":"release"}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Control(msg) => assert_eq!(msg.action, ControlAction::Release),
            other => panic!("Expected Control message, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_keeps_seq() {
        let parsed = parse_message(r#"{"type":"ping","seq":9}"#).unwrap();
        assert!(matches!(parsed, ParsedMessage::Unknown(UnknownMessage { seq: 9 })));
    }

    #[test]
    fn test_extract_seq_from_broken_line() {
        assert_eq!(extract_seq_best_effort(r#"{"seq": 42, "type":"#), Some(42));
        assert_eq!(extract_seq_best_effort("garbage"), None);
    }

    #[test]
    fn test_welcome_wire_shape() {
        let welcome = create_welcome(1, 7, AssignedRole::Controller, Some(7));
        let v = serde_json::to_value(&welcome).unwrap();
        assert_eq!(v["type"], "welcome");
        assert_eq!(v["role"], "controller");
        assert_eq!(v["controller_id"], 7);
        assert_eq!(v["game_id"], "tui-2048");
        assert_eq!(v["capabilities"]["actions"][5], "keepPlaying");
    }

    #[test]
    fn test_error_code_names() {
        let error = create_error(5, ErrorCode::HandshakeRequired, "Send hello first");
        let v = serde_json::to_value(&error).unwrap();
        assert_eq!(v["code"], "handshake_required");
        assert_eq!(v["seq"], 5);
    }

    #[test]
    fn test_state_hash_hex() {
        let v = serde_json::to_value(StateHash(0xab)).unwrap();
        assert_eq!(v, "00000000000000ab");
        let back: StateHash = serde_json::from_value(v).unwrap();
        assert_eq!(back, StateHash(0xab));
    }

    #[test]
    fn test_event_record_names() {
        let v = serde_json::to_value(EventRecord::from(GameEvent::GameOver)).unwrap();
        assert_eq!(v["kind"], "gameOver");
        assert!(v.get("value").is_none());
        let v = serde_json::to_value(EventRecord::from(GameEvent::Merge { max_value: 8 })).unwrap();
        assert_eq!(v["value"], 8);
    }

    #[test]
    fn test_protocol_major() {
        assert_eq!(protocol_major("1.0.0"), "1");
        assert_eq!(protocol_major("2"), "2");
    }
}
