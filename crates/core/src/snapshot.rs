use crate::board::Tile;
use crate::types::{GameEvent, GRID_SIZE};

/// Copy of one tile for renderers and observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileSnapshot {
    pub id: u32,
    pub value: u32,
    pub just_merged: bool,
}

impl From<Tile> for TileSnapshot {
    fn from(value: Tile) -> Self {
        Self {
            id: value.id.0,
            value: value.value,
            just_merged: value.just_merged,
        }
    }
}

/// Maximum number of events a single move can emit.
pub const MAX_EVENTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameSnapshot {
    pub cells: [[Option<TileSnapshot>; GRID_SIZE]; GRID_SIZE],
    pub score: u32,
    pub best_score: u32,
    pub max_tile: u32,
    pub moves: u32,
    pub game_over: bool,
    pub has_won: bool,
    pub keep_playing: bool,
    pub episode_id: u32,
    pub seed: u32,
    /// Events of the latest successful move, unused slots are `None`.
    pub last_events: [Option<GameEvent>; MAX_EVENTS],
}

impl GameSnapshot {
    pub fn clear(&mut self) {
        self.cells = [[None; GRID_SIZE]; GRID_SIZE];
        self.score = 0;
        self.best_score = 0;
        self.max_tile = 0;
        self.moves = 0;
        self.game_over = false;
        self.has_won = false;
        self.keep_playing = false;
        self.episode_id = 0;
        self.seed = 0;
        self.last_events = [None; MAX_EVENTS];
    }

    /// Tile value at (row, col), 0 when empty.
    pub fn value(&self, row: usize, col: usize) -> u32 {
        self.cells[row][col].map(|t| t.value).unwrap_or(0)
    }

    /// The game accepts moves.
    pub fn playable(&self) -> bool {
        !self.game_over && (!self.has_won || self.keep_playing)
    }

    /// Won and waiting for the player to opt in to keep playing.
    pub fn awaiting_continue(&self) -> bool {
        self.has_won && !self.keep_playing
    }

    pub fn events(&self) -> impl Iterator<Item = GameEvent> + '_ {
        self.last_events.iter().flatten().copied()
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        let mut s = Self {
            cells: [[None; GRID_SIZE]; GRID_SIZE],
            score: 0,
            best_score: 0,
            max_tile: 0,
            moves: 0,
            game_over: false,
            has_won: false,
            keep_playing: false,
            episode_id: 0,
            seed: 0,
            last_events: [None; MAX_EVENTS],
        };
        s.clear();
        s
    }
}
