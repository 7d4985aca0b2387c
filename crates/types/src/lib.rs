//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the application.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (core logic, terminal rendering, AI protocol).
//!
//! # Grid
//!
//! The playfield is a fixed 4x4 grid addressed by `(row, col)`, row 0 at the
//! top and col 0 at the left. Internally cells are stored row-major
//! (`row * GRID_SIZE + col`).
//!
//! # Spawn Rules
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `START_TILES` | 2 | Tiles placed by a reset |
//! | `SPAWN_ROLL_RANGE` | 10 | Spawn value roll is uniform in `0..10` |
//! | `SPAWN_TWO_BELOW` | 9 | Rolls below this spawn a 2, otherwise a 4 |
//! | `WIN_TILE` | 2048 | Producing this value wins the game |
//!
//! # Examples
//!
//! ```
//! use tui_2048_types::{Direction, GameAction, GRID_SIZE};
//!
//! let dir = Direction::from_str("LEFT").unwrap();
//! assert_eq!(dir, Direction::Left);
//! assert_eq!(dir.opposite(), Direction::Right);
//!
//! let action = GameAction::from_str("keepPlaying").unwrap();
//! assert_eq!(action, GameAction::KeepPlaying);
//! assert_eq!(GameAction::Move(Direction::Up).direction(), Some(Direction::Up));
//!
//! assert_eq!(GRID_SIZE, 4);
//! ```

/// Grid side length in cells.
pub const GRID_SIZE: usize = 4;

/// Total number of cells on the grid.
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// Tile value that wins the game when produced by a merge.
pub const WIN_TILE: u32 = 2048;

/// Number of tiles placed on an empty grid by a reset.
pub const START_TILES: usize = 2;

/// Spawn value roll range: the roll is uniform in `0..SPAWN_ROLL_RANGE`.
pub const SPAWN_ROLL_RANGE: u32 = 10;

/// Rolls strictly below this value spawn a 2; the rest spawn a 4 (90/10).
pub const SPAWN_TWO_BELOW: u32 = 9;

/// Persistence key for the best score.
pub const BEST_SCORE_KEY: &str = "BestScore";

/// Poll interval of the terminal loop in milliseconds.
pub const TICK_MS: u32 = 16;

/// A slide direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions in protocol order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Parse direction from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use tui_2048_types::Direction;
    ///
    /// assert_eq!(Direction::from_str("up"), Some(Direction::Up));
    /// assert_eq!(Direction::from_str("Right"), Some(Direction::Right));
    /// assert_eq!(Direction::from_str("sideways"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("up") {
            Some(Direction::Up)
        } else if s.eq_ignore_ascii_case("down") {
            Some(Direction::Down)
        } else if s.eq_ignore_ascii_case("left") {
            Some(Direction::Left)
        } else if s.eq_ignore_ascii_case("right") {
            Some(Direction::Right)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Position of this direction in [`Direction::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// True for directions that operate on columns.
    pub fn is_vertical(&self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// Game actions that can be applied to modify game state
///
/// These actions are used by both human input and AI control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    /// Slide every tile toward the given edge
    Move(Direction),
    /// Start a fresh game (best score is kept)
    Restart,
    /// Continue after reaching 2048
    KeepPlaying,
}

impl GameAction {
    /// Parse action from string (for AI protocol)
    ///
    /// Accepts bare directions as well as the `moveX` spelling.
    ///
    /// # Examples
    ///
    /// ```
    /// use tui_2048_types::{Direction, GameAction};
    ///
    /// assert_eq!(GameAction::from_str("left"), Some(GameAction::Move(Direction::Left)));
    /// assert_eq!(GameAction::from_str("moveDown"), Some(GameAction::Move(Direction::Down)));
    /// assert_eq!(GameAction::from_str("restart"), Some(GameAction::Restart));
    /// assert_eq!(GameAction::from_str("hardDrop"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        if let Some(dir) = Direction::from_str(s) {
            return Some(GameAction::Move(dir));
        }
        // "moveLeft" and friends.
        if let (Some(prefix), Some(rest)) = (s.get(..4), s.get(4..)) {
            if prefix.eq_ignore_ascii_case("move") {
                return Direction::from_str(rest).map(GameAction::Move);
            }
        }
        if s.eq_ignore_ascii_case("restart") {
            Some(GameAction::Restart)
        } else if s.eq_ignore_ascii_case("keepPlaying") || s.eq_ignore_ascii_case("continue") {
            Some(GameAction::KeepPlaying)
        } else {
            None
        }
    }

    /// Convert to camelCase string for AI protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::Move(dir) => dir.as_str(),
            GameAction::Restart => "restart",
            GameAction::KeepPlaying => "keepPlaying",
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            GameAction::Move(dir) => Some(*dir),
            _ => None,
        }
    }
}

/// Stable identity of a tile for the whole of its lifetime.
///
/// A merge keeps the surviving tile's id, so a presentation layer can animate
/// a specific tile instead of redrawing the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

/// Board position as `(row, col)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: u8,
    pub col: u8,
}

impl Pos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Row-major flat index.
    pub fn index(&self) -> usize {
        self.row as usize * GRID_SIZE + self.col as usize
    }

    pub fn from_index(idx: usize) -> Self {
        Self {
            row: (idx / GRID_SIZE) as u8,
            col: (idx % GRID_SIZE) as u8,
        }
    }
}

/// Events emitted by a successful move, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameEvent {
    /// At least one tile changed position or merged.
    Slide,
    /// At least one merge happened; carries the largest merged value.
    Merge { max_value: u32 },
    /// A merge produced a value above the session high-water mark.
    Unlock { value: u32 },
    /// 2048 was produced for the first time this game.
    Won,
    /// No legal move remains.
    GameOver,
}

impl GameEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameEvent::Slide => "slide",
            GameEvent::Merge { .. } => "merge",
            GameEvent::Unlock { .. } => "unlock",
            GameEvent::Won => "won",
            GameEvent::GameOver => "gameOver",
        }
    }
}

/// One merge, recorded in board coordinates.
///
/// `consumed` is destroyed; `survivor` keeps its id and lands on `to` with the
/// doubled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeRecord {
    pub consumed: TileId,
    pub survivor: TileId,
    pub from: Pos,
    pub to: Pos,
    pub value: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_odds_are_ninety_ten() {
        assert_eq!(SPAWN_ROLL_RANGE, 10);
        assert_eq!(SPAWN_TWO_BELOW, 9);
        assert_eq!(CELL_COUNT, 16);
    }

    #[test]
    fn direction_index_matches_all_order() {
        for (i, dir) in Direction::ALL.iter().enumerate() {
            assert_eq!(dir.index(), i);
            assert_eq!(dir.opposite().opposite(), *dir);
        }
        assert!(Direction::Up.is_vertical());
        assert!(!Direction::Left.is_vertical());
    }

    #[test]
    fn pos_index_roundtrip() {
        for idx in 0..CELL_COUNT {
            assert_eq!(Pos::from_index(idx).index(), idx);
        }
        assert_eq!(Pos::new(2, 3).index(), 11);
    }

    #[test]
    fn action_names_parse_back() {
        for action in [
            GameAction::Move(Direction::Up),
            GameAction::Move(Direction::Right),
            GameAction::Restart,
            GameAction::KeepPlaying,
        ] {
            assert_eq!(GameAction::from_str(action.as_str()), Some(action));
        }
        assert_eq!(GameAction::Restart.direction(), None);
    }

    #[test]
    fn action_aliases_ignore_ascii_case() {
        assert_eq!(GameAction::from_str("moveLeft"), Some(GameAction::Move(Direction::Left)));
        assert_eq!(GameAction::from_str("MOVEDOWN"), Some(GameAction::Move(Direction::Down)));
        assert_eq!(GameAction::from_str("KeepPlaying"), Some(GameAction::KeepPlaying));
        assert_eq!(GameAction::from_str("continue"), Some(GameAction::KeepPlaying));
        assert_eq!(GameAction::from_str("RESTART"), Some(GameAction::Restart));
        assert_eq!(GameAction::from_str("move"), None);
        assert_eq!(GameAction::from_str("moveSideways"), None);
        assert_eq!(GameAction::from_str("mövé"), None);
    }
}
