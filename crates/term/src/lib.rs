//! Terminal "game renderer" module.
//!
//! A small, game-oriented rendering layer for terminal play. It avoids widget
//! and layout libraries and renders into a plain framebuffer that is flushed
//! to the terminal as diffs.
//!
//! Goals:
//! - Keep `core` deterministic and testable (the view reads a `GameSnapshot`)
//! - Tiles are drawn as solid colour blocks with the value centred
//! - Allow precise control over aspect ratio (cells are wider than tall)

pub mod fb;
pub mod game_view;
pub mod renderer;

pub use tui_2048_core as core;
pub use tui_2048_types as types;

pub use fb::{Cell, CellStyle, FrameBuffer, Rgb};
pub use game_view::{AdapterStatusView, AnchorY, GameView, Viewport};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
