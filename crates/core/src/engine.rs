//! Game engine module - owns the board and the session state
//!
//! This module ties together all core components: board, line processing,
//! RNG and best-score persistence. It handles moves, tile spawning, win and
//! game-over detection, and the game lifecycle.
//!
//! A move either applies fully or is a no-op: when no line changes, nothing
//! spawns, no event is emitted and no state is touched.

use arrayvec::ArrayVec;

use crate::board::{Board, Tile};
use crate::line::{lines_differ, process_line};
use crate::rng::SimpleRng;
use crate::snapshot::{GameSnapshot, TileSnapshot, MAX_EVENTS};
use crate::store::{MemoryStore, ScoreStore};
use crate::types::*;

/// Upper bound on merges in one move (two per line).
pub const MAX_MERGES: usize = CELL_COUNT / 2;

/// Everything a successful move did, for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Some line changed; false means the call was a no-op.
    pub moved: bool,
    /// Points added by this move.
    pub score_delta: u32,
    /// Largest merged value, 0 if nothing merged.
    pub max_merged: u32,
    pub events: ArrayVec<GameEvent, MAX_EVENTS>,
    pub merges: ArrayVec<MergeRecord, MAX_MERGES>,
    /// Tile spawned after the move, if any.
    pub spawned: Option<(Pos, Tile)>,
}

impl MoveOutcome {
    pub fn merged(&self) -> bool {
        !self.merges.is_empty()
    }

    pub fn has_event(&self, event: GameEvent) -> bool {
        self.events.contains(&event)
    }
}

/// The 2048 engine: board, score and win/game-over flags.
#[derive(Debug, Clone)]
pub struct GameEngine<S: ScoreStore = MemoryStore> {
    board: Board,
    rng: SimpleRng,
    store: S,
    /// Seed the engine was created with.
    seed: u32,
    /// Next id handed to a spawned tile; ids are never reused.
    next_tile_id: u32,
    score: u32,
    best_score: u32,
    has_won: bool,
    keep_playing: bool,
    game_over: bool,
    /// Highest value produced by a merge in the current game.
    highest_merged: u32,
    /// Successful moves in the current game.
    moves: u32,
    /// Monotonic game counter (increments on reset).
    episode_id: u32,
    /// Events of the latest successful move.
    last_events: ArrayVec<GameEvent, MAX_EVENTS>,
    /// A fixture is loaded: its placeholder score never reaches the best score.
    fixture: bool,
}

impl GameEngine<MemoryStore> {
    /// Create a new game with the given RNG seed and an in-memory best score.
    pub fn new(seed: u32) -> Self {
        Self::with_store(seed, MemoryStore::new())
    }
}

impl<S: ScoreStore> GameEngine<S> {
    /// Create a new game, loading the best score from `store`.
    pub fn with_store(seed: u32, store: S) -> Self {
        let mut engine = Self::blank(seed, store);
        engine.start_game();
        engine
    }

    /// Build an engine over a fixed layout (0 = empty). No tile is spawned.
    ///
    /// Values must be 0 or a power of two of at least 2.
    pub fn from_values(values: [[u32; GRID_SIZE]; GRID_SIZE], seed: u32, store: S) -> Self {
        let mut engine = Self::blank(seed, store);
        engine.fill_board(&values);
        engine
    }

    fn blank(seed: u32, store: S) -> Self {
        let best_score = store
            .get_integer(BEST_SCORE_KEY)
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(0);

        Self {
            board: Board::new(),
            rng: SimpleRng::new(seed),
            store,
            seed,
            next_tile_id: 1,
            score: 0,
            best_score,
            has_won: false,
            keep_playing: false,
            game_over: false,
            highest_merged: 0,
            moves: 0,
            episode_id: 0,
            last_events: ArrayVec::new(),
            fixture: false,
        }
    }

    fn start_game(&mut self) {
        self.board.clear();
        self.score = 0;
        self.game_over = false;
        self.has_won = false;
        self.keep_playing = false;
        self.highest_merged = 0;
        self.moves = 0;
        self.last_events.clear();
        self.fixture = false;
        for _ in 0..START_TILES {
            self.spawn_random_tile();
        }
    }

    fn fill_board(&mut self, values: &[[u32; GRID_SIZE]; GRID_SIZE]) {
        self.board.clear();
        for (row, line) in values.iter().enumerate() {
            for (col, &value) in line.iter().enumerate() {
                if value == 0 {
                    continue;
                }
                debug_assert!(value >= 2 && value.is_power_of_two());
                let id = self.alloc_id();
                self.board.set(row, col, Some(Tile::new(id, value)));
            }
        }
    }

    fn alloc_id(&mut self) -> TileId {
        let id = TileId(self.next_tile_id);
        self.next_tile_id = self.next_tile_id.wrapping_add(1);
        id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn has_won(&self) -> bool {
        self.has_won
    }

    pub fn keep_playing(&self) -> bool {
        self.keep_playing
    }

    /// Opt in (or out) of continuing after a win.
    pub fn set_keep_playing(&mut self, keep_playing: bool) {
        self.keep_playing = keep_playing;
    }

    pub fn highest_merged(&self) -> u32 {
        self.highest_merged
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn episode_id(&self) -> u32 {
        self.episode_id
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn max_tile(&self) -> u32 {
        self.board.max_value()
    }

    /// Events of the latest successful move. Moves that change nothing
    /// leave them untouched.
    pub fn last_events(&self) -> &[GameEvent] {
        &self.last_events
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The engine accepts moves.
    pub fn playable(&self) -> bool {
        !self.game_over && (!self.has_won || self.keep_playing)
    }

    /// Start a fresh game. The best score is kept.
    pub fn reset(&mut self) {
        self.episode_id = self.episode_id.wrapping_add(1);
        self.start_game();
    }

    /// Place a 2 (90%) or a 4 (10%) on a uniformly chosen empty cell.
    ///
    /// No-op when the board is full.
    pub fn spawn_random_tile(&mut self) -> Option<(Pos, Tile)> {
        let empties = self.board.empty_indices();
        let idx = self.rng.choose(&empties)?;
        let value = self.rng.spawn_value();
        let tile = Tile::new(self.alloc_id(), value);
        self.board.put(idx, Some(tile));
        Some((Pos::from_index(idx), tile))
    }

    /// Set and return `game_over` when the board is full with no equal neighbours.
    pub fn check_game_over(&mut self) -> bool {
        if !self.board.is_full() || self.board.has_adjacent_pair() {
            return false;
        }
        self.game_over = true;
        true
    }

    /// Whether sliding in `direction` would change the board.
    ///
    /// Looks at the board only; the won/game-over gates are not applied.
    pub fn can_move(&self, direction: Direction) -> bool {
        (0..GRID_SIZE).any(|line| {
            let indices = Board::line_indices(direction, line);
            let before = self.board.read_line(&indices);
            lines_differ(&before, &process_line(&before).line)
        })
    }

    /// [`Self::can_move`] for every direction, in [`Direction::ALL`] order.
    pub fn legal_moves(&self) -> [bool; 4] {
        Direction::ALL.map(|d| self.can_move(d))
    }

    /// Slide all tiles toward `direction`.
    pub fn try_move(&mut self, direction: Direction) -> MoveOutcome {
        let mut outcome = MoveOutcome::default();
        if !self.playable() {
            return outcome;
        }

        let mut next = self.board.clone();
        next.clear_merge_flags();
        let mut won = false;

        for line in 0..GRID_SIZE {
            let indices = Board::line_indices(direction, line);
            let before = self.board.read_line(&indices);
            let processed = process_line(&before);
            if !lines_differ(&before, &processed.line) {
                continue;
            }

            outcome.moved = true;
            outcome.score_delta += processed.score;
            outcome.max_merged = outcome.max_merged.max(processed.max_merged);
            won |= processed.won;
            next.write_line(&indices, &processed.line);

            for m in &processed.merges {
                outcome.merges.push(MergeRecord {
                    consumed: m.consumed,
                    survivor: m.survivor,
                    from: Pos::from_index(indices[m.from]),
                    to: Pos::from_index(indices[m.to]),
                    value: m.value,
                });
            }
        }

        if !outcome.moved {
            return outcome;
        }

        self.board = next;
        self.moves += 1;
        self.add_score(outcome.score_delta);

        outcome.events.push(GameEvent::Slide);
        if outcome.merged() {
            outcome.events.push(GameEvent::Merge {
                max_value: outcome.max_merged,
            });
            if outcome.max_merged > self.highest_merged {
                self.highest_merged = outcome.max_merged;
                outcome.events.push(GameEvent::Unlock {
                    value: outcome.max_merged,
                });
                log::debug!("unlocked tile {}", outcome.max_merged);
            }
        }
        if won && !self.has_won {
            self.has_won = true;
            outcome.events.push(GameEvent::Won);
            log::debug!("reached {} with score {}", WIN_TILE, self.score);
        }

        if !self.has_won || self.keep_playing {
            outcome.spawned = self.spawn_random_tile();
            if self.check_game_over() {
                outcome.events.push(GameEvent::GameOver);
                log::debug!("game over with score {}", self.score);
            }
        }

        self.last_events = outcome.events.clone();
        outcome
    }

    /// Apply a game action; returns whether anything changed.
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        match action {
            GameAction::Move(direction) => self.try_move(direction).moved,
            GameAction::Restart => {
                self.reset();
                true
            }
            GameAction::KeepPlaying => {
                if self.has_won && !self.keep_playing {
                    self.keep_playing = true;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn add_score(&mut self, delta: u32) {
        if delta == 0 {
            return;
        }
        self.score = self.score.saturating_add(delta);
        if !self.fixture && self.score > self.best_score {
            self.best_score = self.score;
            self.store.set_integer(BEST_SCORE_KEY, self.best_score as u64);
        }
    }

    /// Load the nearly-finished fixture: one gap in the corner, no merges.
    ///
    /// The score is a fixed placeholder; the best score is left alone until
    /// the next [`Self::reset`].
    pub fn load_near_game_over(&mut self) {
        self.fill_board(&[
            [2, 4, 8, 16],
            [32, 64, 128, 256],
            [512, 1024, 2, 4],
            [8, 16, 32, 0],
        ]);
        self.score = 9999;
        self.game_over = false;
        self.has_won = false;
        self.keep_playing = false;
        self.last_events.clear();
        self.fixture = true;
    }

    /// Load the nearly-won fixture: two adjacent 1024 tiles.
    ///
    /// The score is a fixed placeholder; the best score is left alone until
    /// the next [`Self::reset`].
    pub fn load_near_win(&mut self) {
        let mut values = [[0u32; GRID_SIZE]; GRID_SIZE];
        values[1][1] = 1024;
        values[1][2] = 1024;
        self.fill_board(&values);
        self.score = 20000;
        self.game_over = false;
        self.has_won = false;
        self.keep_playing = false;
        self.last_events.clear();
        self.fixture = true;
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        for (idx, cell) in self.board.cells().iter().enumerate() {
            out.cells[idx / GRID_SIZE][idx % GRID_SIZE] = cell.map(TileSnapshot::from);
        }
        out.score = self.score;
        out.best_score = self.best_score;
        out.max_tile = self.board.max_value();
        out.moves = self.moves;
        out.game_over = self.game_over;
        out.has_won = self.has_won;
        out.keep_playing = self.keep_playing;
        out.episode_id = self.episode_id;
        out.seed = self.seed;
        out.last_events = [None; MAX_EVENTS];
        for (slot, ev) in out.last_events.iter_mut().zip(self.last_events.iter()) {
            *slot = Some(*ev);
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }
}

impl Default for GameEngine<MemoryStore> {
    fn default() -> Self {
        Self::new(1)
    }
}
