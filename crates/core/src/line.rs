//! Line module - the slide/merge transform on a single row or column
//!
//! Every move is decomposed into four independent lines, each read toward the
//! destination edge (see [`Board::line_indices`](crate::board::Board::line_indices)),
//! so this module only ever slides toward index 0.
//!
//! Merges resolve from the destination edge outward and a tile merges at most
//! once per move: `[2,2,2,_]` becomes `[4,2,_,_]` and `[2,2,2,2]` becomes
//! `[4,4,_,_]`.

use arrayvec::ArrayVec;

use crate::board::{Line, Tile};
use crate::types::{TileId, GRID_SIZE, WIN_TILE};

/// A merge inside one line, in line-relative indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMerge {
    /// Tile removed by the merge.
    pub consumed: TileId,
    /// Tile that keeps its id and carries the doubled value.
    pub survivor: TileId,
    /// Line index the consumed tile started from.
    pub from: usize,
    /// Line index the merged tile ends up on.
    pub to: usize,
    /// Value after the merge.
    pub value: u32,
}

/// Result of sliding one line toward index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOutcome {
    pub line: Line,
    /// Sum of all merged values in this line.
    pub score: u32,
    /// Largest merged value, 0 if nothing merged.
    pub max_merged: u32,
    /// A merge produced the winning tile.
    pub won: bool,
    pub merges: ArrayVec<LineMerge, { GRID_SIZE / 2 }>,
}

impl LineOutcome {
    pub fn merged(&self) -> bool {
        !self.merges.is_empty()
    }
}

/// Slide and merge one line toward index 0.
pub fn process_line(line: &Line) -> LineOutcome {
    let mut compact = ArrayVec::<(usize, Tile), GRID_SIZE>::new();
    for (i, cell) in line.iter().enumerate() {
        if let Some(tile) = cell {
            compact.push((i, *tile));
        }
    }

    let mut out: Line = [None; GRID_SIZE];
    let mut score = 0u32;
    let mut max_merged = 0u32;
    let mut won = false;
    let mut merges = ArrayVec::new();

    let mut write = 0usize;
    let mut read = 0usize;
    while read < compact.len() {
        let (_, mut tile) = compact[read];

        match compact.get(read + 1) {
            Some(&(from, next)) if next.value == tile.value => {
                tile.value *= 2;
                tile.just_merged = true;
                score += tile.value;
                max_merged = max_merged.max(tile.value);
                won |= tile.value == WIN_TILE;
                merges.push(LineMerge {
                    consumed: next.id,
                    survivor: tile.id,
                    from,
                    to: write,
                    value: tile.value,
                });
                read += 2;
            }
            _ => {
                tile.just_merged = false;
                read += 1;
            }
        }

        out[write] = Some(tile);
        write += 1;
    }

    LineOutcome {
        line: out,
        score,
        max_merged,
        won,
        merges,
    }
}

/// Values of a line, 0 for empty cells.
pub fn line_values(line: &Line) -> [u32; GRID_SIZE] {
    std::array::from_fn(|k| line[k].map(|t| t.value).unwrap_or(0))
}

/// Two lines differ when any position differs in value or emptiness.
///
/// Tile identity and merge markers are ignored.
pub fn lines_differ(a: &Line, b: &Line) -> bool {
    line_values(a) != line_values(b)
}
