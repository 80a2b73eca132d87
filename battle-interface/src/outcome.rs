//! What an arbiter reports when a battle reaches a terminal state.

use std::fmt;

use crate::action::Side;
use crate::view::{markers, BattleView};

/// Why a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// At least one side lost its last tank.
    AllTanksDead,
    /// The step limit was reached.
    MaxSteps,
    /// Every living tank was out of shells for the whole grace window.
    ZeroShells,
}

/// Immutable snapshot of a board: walls, mines and tanks only. Shells are
/// never part of a grid.
///
/// Equality and hashing compare the full character matrix, which is what
/// lets the driver group identical battle outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    rows: Vec<String>,
}

impl Grid {
    /// Build from row-major lines. Rows are taken as-is; callers are
    /// expected to hand in lines of equal width.
    pub fn from_rows(rows: Vec<String>) -> Grid {
        Grid { rows }
    }

    /// Board height.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Board width.
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.chars().count())
    }

    /// Iterate the rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(String::as_str)
    }
}

impl BattleView for Grid {
    fn object_at(&self, col: usize, row: usize) -> char {
        self.rows
            .get(row)
            .and_then(|r| r.chars().nth(col))
            .unwrap_or(markers::OUT_OF_RANGE)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

/// Terminal outcome of one battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    /// Winning side, or `None` for a tie.
    pub winner: Option<Side>,
    /// Why the battle ended.
    pub reason: Reason,
    /// Living tanks per side at the end, indexed by [`Side::index`].
    pub remaining_tanks: [usize; 2],
    /// Number of steps actually played.
    pub rounds: usize,
    /// Final board state.
    pub final_grid: Grid,
}
