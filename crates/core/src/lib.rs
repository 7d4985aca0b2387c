//! Core game logic module - pure, deterministic, and testable
//!
//! This module contains all the game rules, state management, and move logic.
//! It has **zero dependencies** on UI, networking, or I/O, making it:
//!
//! - **Deterministic**: Same seed produces identical games (for AI agents and replays)
//! - **Testable**: Comprehensive unit tests for all game rules
//! - **Portable**: Can run in any environment (terminal, GUI, headless)
//! - **Fast**: Zero-allocation move processing
//!
//! # Module Structure
//!
//! - [`board`]: 4x4 flat grid and the per-direction line index mapping
//! - [`line`]: the slide/merge transform for one row or column
//! - [`engine`]: session state, moves, spawning, win and game-over detection
//! - [`rng`]: seeded LCG used for tile spawning
//! - [`store`]: best-score persistence seam
//! - [`snapshot`]: copyable view of the game for renderers and observers
//!
//! # Game Rules
//!
//! - **Slides**: every tile moves as far as it can toward the chosen edge
//! - **Merges**: two equal neighbours merge into one tile of double value,
//!   resolved from the destination edge outward, at most once per tile per move
//! - **Spawns**: after every move that changed the board, a 2 (90%) or 4 (10%)
//!   appears on a random empty cell
//! - **Win**: producing 2048 wins; further moves wait for the player to keep playing
//! - **Game over**: a full board with no equal neighbours
//!
//! # Example
//!
//! ```
//! use tui_2048_core::{GameEngine, MemoryStore};
//! use tui_2048_types::{Direction, GameEvent};
//!
//! let mut game = GameEngine::from_values(
//!     [[2, 2, 4, 0], [0; 4], [0; 4], [0; 4]],
//!     12345,
//!     MemoryStore::new(),
//! );
//!
//! let outcome = game.try_move(Direction::Left);
//! assert!(outcome.moved);
//! assert_eq!(outcome.score_delta, 4);
//! assert_eq!(outcome.events[0], GameEvent::Slide);
//! assert_eq!(game.score(), 4);
//! ```

pub mod board;
pub mod engine;
pub mod line;
pub mod rng;
pub mod snapshot;
pub mod store;

pub use tui_2048_types as types;

// Re-export commonly used types for convenience
pub use board::{Board, Cell, Line, Tile};
pub use engine::{GameEngine, MoveOutcome};
pub use line::{process_line, LineOutcome};
pub use rng::SimpleRng;
pub use snapshot::{GameSnapshot, TileSnapshot};
pub use store::{MemoryStore, ScoreStore};
