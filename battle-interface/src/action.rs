//! The symbolic vocabulary of a battle: sides, facings and tank commands.

use std::fmt;

/// One of the two competing sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// Side 1, rendered as `'1'`.
    One,
    /// Side 2, rendered as `'2'`.
    Two,
}

impl Side {
    /// Zero-based index, usable for per-side arrays.
    pub fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    /// The 1-based player number used in output messages.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Board character for tanks of this side.
    pub fn glyph(self) -> char {
        match self {
            Side::One => '1',
            Side::Two => '2',
        }
    }

    /// The opposing side.
    pub fn opponent(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    /// Parse a board character back into a side.
    pub fn from_glyph(c: char) -> Option<Side> {
        match c {
            '1' => Some(Side::One),
            '2' => Some(Side::Two),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One of eight facings at 45° steps, `Up = 0` rotating clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl Direction {
    /// All facings in index order.
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::Down,
        Direction::DownLeft,
        Direction::Left,
        Direction::UpLeft,
    ];

    /// Number of distinct facings.
    pub const COUNT: usize = 8;

    /// Numeric value, 0..8.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Facing for a numeric value; wraps modulo 8.
    pub fn from_index(index: usize) -> Direction {
        Self::ALL[index % Self::COUNT]
    }

    /// Unit step `(d_row, d_col)` with rows growing downward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::UpRight => (-1, 1),
            Direction::Right => (0, 1),
            Direction::DownRight => (1, 1),
            Direction::Down => (1, 0),
            Direction::DownLeft => (1, -1),
            Direction::Left => (0, -1),
            Direction::UpLeft => (-1, -1),
        }
    }

    /// Rotate by `steps` × 45°; positive is clockwise.
    pub fn rotated(self, steps: i32) -> Direction {
        let index = (self as i32 + steps).rem_euclid(Self::COUNT as i32);
        Self::ALL[index as usize]
    }

    /// The facing 180° away.
    pub fn opposite(self) -> Direction {
        self.rotated(4)
    }
}

/// One per-step command a controller can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    MoveBackward,
    RotateLeft45,
    RotateRight45,
    RotateLeft90,
    RotateRight90,
    Shoot,
    GetBattleInfo,
    DoNothing,
}

impl Action {
    /// Canonical label used in per-step action records.
    pub fn label(self) -> &'static str {
        match self {
            Action::MoveForward => "MoveForward",
            Action::MoveBackward => "MoveBackward",
            Action::RotateLeft45 => "RotateLeft45",
            Action::RotateRight45 => "RotateRight45",
            Action::RotateLeft90 => "RotateLeft90",
            Action::RotateRight90 => "RotateRight90",
            Action::Shoot => "Shoot",
            Action::GetBattleInfo => "GetBattleInfo",
            Action::DoNothing => "DoNothing",
        }
    }

    /// Signed 45° steps for rotation actions, `None` otherwise.
    pub fn rotation_steps(self) -> Option<i32> {
        match self {
            Action::RotateLeft45 => Some(-1),
            Action::RotateRight45 => Some(1),
            Action::RotateLeft90 => Some(-2),
            Action::RotateRight90 => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_deltas_are_unit_steps() {
        for dir in Direction::ALL {
            let (dr, dc) = dir.delta();
            assert!(dr.abs() <= 1 && dc.abs() <= 1);
            assert!((dr, dc) != (0, 0));
        }
    }

    #[test]
    fn rotation_wraps_both_ways() {
        assert_eq!(Direction::Up.rotated(1), Direction::UpRight);
        assert_eq!(Direction::Up.rotated(-1), Direction::UpLeft);
        assert_eq!(Direction::Up.rotated(-2), Direction::Left);
        assert_eq!(Direction::UpLeft.rotated(2), Direction::UpRight);
        assert_eq!(Direction::Down.opposite(), Direction::Up);
    }

    #[test]
    fn opposite_negates_delta() {
        for dir in Direction::ALL {
            let (dr, dc) = dir.delta();
            let (or, oc) = dir.opposite().delta();
            assert_eq!((dr, dc), (-or, -oc));
        }
    }

    #[test]
    fn side_glyph_round_trip() {
        assert_eq!(Side::from_glyph(Side::One.glyph()), Some(Side::One));
        assert_eq!(Side::from_glyph(Side::Two.glyph()), Some(Side::Two));
        assert_eq!(Side::from_glyph('#'), None);
        assert_eq!(Side::One.opponent(), Side::Two);
    }
}
