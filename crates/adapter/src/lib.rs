//! Adapter module - AI control via TCP socket with JSON protocol
//!
//! External agents drive the game through a line-delimited JSON protocol over
//! TCP. The game loop stays synchronous; the server runs on its own tokio
//! runtime and talks to the loop through bounded channels.
//!
//! # Protocol Overview
//!
//! 1. **Connection**: client connects (default `127.0.0.1:7778`)
//! 2. **Handshake**: client sends `hello`, server answers `welcome`
//! 3. **Controller assignment**: first client to hello becomes the controller
//! 4. **Observations**: streaming clients receive a full observation after
//!    every applied command
//! 5. **Commands**: the controller sends `command` with a list of actions
//!
//! # Message Types
//!
//! Client → Server: `hello`, `command`, `control` (claim/release).
//! Server → Client: `welcome`, `ack`, `error`, `observation`.
//!
//! # Environment Variables
//!
//! - `T2048_AI_HOST`: bind address (default `127.0.0.1`)
//! - `T2048_AI_PORT`: port number (default 7778)
//! - `T2048_AI_MAX_PENDING`: command queue depth (default 10)
//! - `T2048_AI_DISABLED`: `1` or `true` disables the adapter
//!
//! # Example Protocol Flow
//!
//! ```text
//! C: {"type":"hello","seq":1,"ts":0,"client":{"name":"bot","version":"0.1"},"protocol_version":"1.0.0"}
//! S: {"type":"welcome","seq":1,...,"client_id":1,"role":"controller","controller_id":1,...}
//! S: {"type":"observation","seq":1,...,"board":{"size":4,"cells":[[2,0,0,0],...]},...}
//! C: {"type":"command","seq":2,"ts":0,"actions":["left","up"]}
//! S: {"type":"ack","seq":2,"ts":...,"status":"ok","applied":true}
//! S: {"type":"observation","seq":2,...}
//! ```
//!
//! Connect with netcat for manual testing:
//!
//! ```bash
//! nc 127.0.0.1 7778
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use tui_2048_core as core;
pub use tui_2048_types as types;

pub use protocol::*;
pub use runtime::{Adapter, ClientCommand, InboundCommand, InboundPayload, OutboundMessage};
pub use server::*;
