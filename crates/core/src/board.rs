//! Board module - manages the game grid
//!
//! The board is a 4x4 grid where each cell is empty or holds exactly one tile.
//! Uses a flat array for better cache locality and zero-allocation.
//! Coordinates: (row, col) where row 0 is the top and col 0 is the left edge.
//!
//! All four slide directions share one code path: [`Board::line_indices`]
//! maps a direction and a line number to the four flat indices of that line,
//! ordered from the edge being slid toward. Reading through that mapping turns
//! every move into a "slide toward index 0" on a 4-element line.

use arrayvec::ArrayVec;

use crate::types::{Direction, TileId, CELL_COUNT, GRID_SIZE};

/// A numbered tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub id: TileId,
    /// Power of two, at least 2.
    pub value: u32,
    /// Set when this tile was produced by a merge during the latest move.
    pub just_merged: bool,
}

impl Tile {
    pub fn new(id: TileId, value: u32) -> Self {
        Self {
            id,
            value,
            just_merged: false,
        }
    }
}

/// A board cell: empty or holding one tile.
pub type Cell = Option<Tile>;

/// One row or column, ordered from the edge tiles slide toward.
pub type Line = [Cell; GRID_SIZE];

/// The game board - 4x4 cells using flat array storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    /// Flat array of cells, row-major order (row * GRID_SIZE + col)
    cells: [Cell; CELL_COUNT],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [None; CELL_COUNT],
        }
    }

    /// Calculate flat index from (row, col) coordinates
    #[inline(always)]
    fn index(row: usize, col: usize) -> Option<usize> {
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return None;
        }
        Some(row * GRID_SIZE + col)
    }

    /// Flat indices of line `line` for `direction`, nearest-to-destination first.
    ///
    /// Rows serve left/right, columns serve up/down; right and down read their
    /// line back to front.
    #[inline]
    pub fn line_indices(direction: Direction, line: usize) -> [usize; GRID_SIZE] {
        std::array::from_fn(|k| {
            let (row, col) = match direction {
                Direction::Left => (line, k),
                Direction::Right => (line, GRID_SIZE - 1 - k),
                Direction::Up => (k, line),
                Direction::Down => (GRID_SIZE - 1 - k, line),
            };
            row * GRID_SIZE + col
        })
    }

    /// Tile at (row, col); `None` when empty or out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Cell {
        Self::index(row, col).and_then(|idx| self.cells[idx])
    }

    /// Set cell at (row, col)
    /// Returns false if out of bounds
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> bool {
        match Self::index(row, col) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Cell at a flat index.
    #[inline]
    pub fn at(&self, idx: usize) -> Cell {
        self.cells[idx]
    }

    #[inline]
    pub(crate) fn put(&mut self, idx: usize, cell: Cell) {
        self.cells[idx] = cell;
    }

    /// Read a line through an index mapping.
    pub fn read_line(&self, indices: &[usize; GRID_SIZE]) -> Line {
        std::array::from_fn(|k| self.cells[indices[k]])
    }

    /// Write a line back through the same index mapping it was read with.
    pub fn write_line(&mut self, indices: &[usize; GRID_SIZE], line: &Line) {
        for (k, &idx) in indices.iter().enumerate() {
            self.cells[idx] = line[k];
        }
    }

    /// Flat indices of all empty cells, in row-major order.
    pub fn empty_indices(&self) -> ArrayVec<usize, CELL_COUNT> {
        let mut out = ArrayVec::new();
        for (idx, cell) in self.cells.iter().enumerate() {
            if cell.is_none() {
                out.push(idx);
            }
        }
        out
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_none())
    }

    /// True if some cell equals its right or bottom neighbour.
    pub fn has_adjacent_pair(&self) -> bool {
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let Some(tile) = self.get(row, col) else {
                    continue;
                };
                if let Some(right) = self.get(row, col + 1) {
                    if right.value == tile.value {
                        return true;
                    }
                }
                if let Some(down) = self.get(row + 1, col) {
                    if down.value == tile.value {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn tile_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Sum of all tile values.
    pub fn tile_sum(&self) -> u64 {
        self.cells.iter().flatten().map(|t| t.value as u64).sum()
    }

    /// Highest tile value, 0 on an empty board.
    pub fn max_value(&self) -> u32 {
        self.cells.iter().flatten().map(|t| t.value).max().unwrap_or(0)
    }

    /// Tile values as a 2D grid, 0 for empty cells.
    pub fn values(&self) -> [[u32; GRID_SIZE]; GRID_SIZE] {
        let mut out = [[0u32; GRID_SIZE]; GRID_SIZE];
        self.write_values(&mut out);
        out
    }

    /// Write tile values into an existing grid, 0 for empty cells.
    pub fn write_values(&self, out: &mut [[u32; GRID_SIZE]; GRID_SIZE]) {
        for (idx, cell) in self.cells.iter().enumerate() {
            out[idx / GRID_SIZE][idx % GRID_SIZE] = cell.map(|t| t.value).unwrap_or(0);
        }
    }

    /// Drop the `just_merged` marker from every tile.
    pub fn clear_merge_flags(&mut self) {
        for tile in self.cells.iter_mut().flatten() {
            tile.just_merged = false;
        }
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Clear the entire board
    pub fn clear(&mut self) {
        self.cells = [None; CELL_COUNT];
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: u32, value: u32) -> Cell {
        Some(Tile::new(TileId(id), value))
    }

    #[test]
    fn test_board_index_calculation() {
        assert_eq!(Board::index(0, 0), Some(0));
        assert_eq!(Board::index(0, 3), Some(3));
        assert_eq!(Board::index(1, 0), Some(4));
        assert_eq!(Board::index(3, 3), Some(15));
        assert_eq!(Board::index(4, 0), None);
        assert_eq!(Board::index(0, 4), None);
    }

    #[test]
    fn test_line_indices_per_direction() {
        assert_eq!(Board::line_indices(Direction::Left, 1), [4, 5, 6, 7]);
        assert_eq!(Board::line_indices(Direction::Right, 1), [7, 6, 5, 4]);
        assert_eq!(Board::line_indices(Direction::Up, 2), [2, 6, 10, 14]);
        assert_eq!(Board::line_indices(Direction::Down, 2), [14, 10, 6, 2]);
    }

    #[test]
    fn test_line_indices_cover_board_once() {
        for dir in Direction::ALL {
            let mut hits = [0u8; CELL_COUNT];
            for line in 0..GRID_SIZE {
                for idx in Board::line_indices(dir, line) {
                    hits[idx] += 1;
                }
            }
            assert!(hits.iter().all(|h| *h == 1), "{:?}", dir);
        }
    }

    #[test]
    fn test_read_write_line_roundtrip() {
        let mut board = Board::new();
        board.set(0, 3, tile(1, 2));
        board.set(2, 3, tile(2, 8));

        let idx = Board::line_indices(Direction::Down, 3);
        let line = board.read_line(&idx);
        assert_eq!(line[1].map(|t| t.value), Some(8));
        assert_eq!(line[3].map(|t| t.value), Some(2));

        let mut other = Board::new();
        other.write_line(&idx, &line);
        assert_eq!(other, board);
    }

    #[test]
    fn test_get_out_of_bounds_is_empty() {
        let mut board = Board::new();
        assert!(!board.set(4, 0, tile(1, 2)));
        assert_eq!(board.get(0, 4), None);
    }

    #[test]
    fn test_empty_indices_and_counts() {
        let mut board = Board::new();
        assert_eq!(board.empty_indices().len(), CELL_COUNT);
        assert!(board.is_empty());

        board.set(1, 1, tile(1, 4));
        board.set(3, 0, tile(2, 16));
        let empties = board.empty_indices();
        assert_eq!(empties.len(), CELL_COUNT - 2);
        assert!(!empties.contains(&5));
        assert!(!empties.contains(&12));
        assert_eq!(board.tile_count(), 2);
        assert_eq!(board.tile_sum(), 20);
        assert_eq!(board.max_value(), 16);
    }

    #[test]
    fn test_has_adjacent_pair() {
        let mut board = Board::new();
        let pattern = [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]];
        let mut id = 0;
        for (r, row) in pattern.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                id += 1;
                board.set(r, c, tile(id, *v));
            }
        }
        assert!(board.is_full());
        assert!(!board.has_adjacent_pair());

        board.set(3, 3, tile(99, 4));
        assert!(board.has_adjacent_pair());
    }

    #[test]
    fn test_clear_merge_flags() {
        let mut board = Board::new();
        board.set(
            0,
            0,
            Some(Tile {
                id: TileId(1),
                value: 4,
                just_merged: true,
            }),
        );
        board.clear_merge_flags();
        assert!(!board.get(0, 0).unwrap().just_merged);
    }
}
