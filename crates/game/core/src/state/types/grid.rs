use std::fmt;

use crate::config::SessionConfig;

/// Cell coordinate on the bingo grid (zero-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridPosition {
    pub row: u8,
    pub col: u8,
}

impl GridPosition {
    pub const ORIGIN: Self = Self { row: 0, col: 0 };

    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Grid dimensions of a session board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSize {
    pub rows: u8,
    pub cols: u8,
}

impl GridSize {
    pub const fn new(rows: u8, cols: u8) -> Self {
        Self { rows, cols }
    }

    pub const fn square(dim: u8) -> Self {
        Self {
            rows: dim,
            cols: dim,
        }
    }

    /// Both dimensions must be in `1..=MAX_GRID_DIM`.
    pub const fn is_valid(self) -> bool {
        self.rows >= 1
            && self.cols >= 1
            && self.rows <= SessionConfig::MAX_GRID_DIM
            && self.cols <= SessionConfig::MAX_GRID_DIM
    }

    pub const fn contains(self, position: GridPosition) -> bool {
        position.row < self.rows && position.col < self.cols
    }

    /// Every full row, column and (for square grids) both diagonals.
    pub fn lines(self) -> Vec<Line> {
        let mut lines = Vec::with_capacity(self.rows as usize + self.cols as usize + 2);
        lines.extend((0..self.rows).map(Line::Row));
        lines.extend((0..self.cols).map(Line::Column));
        if self.rows == self.cols {
            lines.push(Line::Diagonal);
            lines.push(Line::AntiDiagonal);
        }
        lines
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// A straight run of cells that completes a bingo when owned by one participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Line {
    Row(u8),
    Column(u8),
    /// Top-left to bottom-right.
    Diagonal,
    /// Top-right to bottom-left.
    AntiDiagonal,
}

impl Line {
    pub fn positions(self, size: GridSize) -> Vec<GridPosition> {
        match self {
            Line::Row(row) => (0..size.cols).map(|col| GridPosition::new(row, col)).collect(),
            Line::Column(col) => (0..size.rows).map(|row| GridPosition::new(row, col)).collect(),
            Line::Diagonal => (0..size.rows).map(|i| GridPosition::new(i, i)).collect(),
            Line::AntiDiagonal => (0..size.rows)
                .map(|i| GridPosition::new(i, size.cols - 1 - i))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_bounds() {
        assert!(GridSize::square(5).is_valid());
        assert!(!GridSize::new(0, 3).is_valid());
        assert!(!GridSize::square(SessionConfig::MAX_GRID_DIM + 1).is_valid());
        assert!(GridSize::new(2, 3).contains(GridPosition::new(1, 2)));
        assert!(!GridSize::new(2, 3).contains(GridPosition::new(2, 0)));
    }

    #[test]
    fn square_grids_have_diagonals() {
        assert_eq!(GridSize::square(3).lines().len(), 8);
        assert_eq!(GridSize::new(2, 3).lines().len(), 5);
        assert_eq!(
            Line::AntiDiagonal.positions(GridSize::square(3)),
            vec![
                GridPosition::new(0, 2),
                GridPosition::new(1, 1),
                GridPosition::new(2, 0)
            ]
        );
    }
}
