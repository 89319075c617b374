//! Static evaluation of cutoff positions

use std::fmt;

use crate::board::{Board, Position};
use crate::{NUM_CELLS, SIZE};

/// Preference rank of every cell, indexed `[y][x]`
///
/// Higher ranks should hold larger tiles. The ranks form a snake that starts
/// in the bottom-left corner, climbs the left column and winds to the right.
pub const PRIORITY: [[u8; SIZE]; SIZE] = [
    [12, 11, 4, 3],
    [13, 10, 5, 2],
    [14, 9, 6, 1],
    [15, 8, 7, 0],
];

/// Returns the cell holding each rank, `by_rank()[r]` is the cell of rank `r`
pub const fn by_rank() -> [Position; NUM_CELLS] {
    let mut ranked = [Position::new(0, 0); NUM_CELLS];
    let mut y = 0;
    while y < SIZE {
        let mut x = 0;
        while x < SIZE {
            ranked[PRIORITY[y][x] as usize] = Position::new(x, y);
            x += 1;
        }
        y += 1;
    }
    ranked
}

/// The cell holding rank `rank`
pub const fn cell_of_rank(rank: usize) -> Position {
    by_rank()[rank]
}

pub const fn rank(position: Position) -> u8 {
    PRIORITY[position.y][position.x]
}

/// The highest-priority empty cell of a board
pub fn highest_priority_empty(board: &Board) -> Option<Position> {
    by_rank()
        .iter()
        .rev()
        .copied()
        .find(|p| !board.is_occupied(p.x, p.y))
}

/// The value of a position to the moving player
///
/// `Lost` orders below every `Value`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Score {
    Lost,
    Value(i64),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Lost => f.write_str("lost"),
            Score::Value(value) => write!(f, "{}", value),
        }
    }
}

/// Evaluation weights
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Heuristic {
    /// Shifted left by the number of empty cells and added to the score
    pub availability_bonus: i64,
    pub order_penalty_weight: i64,
}

impl Default for Heuristic {
    fn default() -> Self {
        Self {
            availability_bonus: 1024,
            order_penalty_weight: 1,
        }
    }
}

impl Heuristic {
    /// Weights tuned for deeper searches, where free cells matter less
    pub fn deep() -> Self {
        Self {
            availability_bonus: 16,
            ..Self::default()
        }
    }

    /// Scores a board
    ///
    /// A board without empty cells is `Lost`. This does not check whether a
    /// merge is still possible, so some full boards that could keep playing
    /// are scored as lost too.
    pub fn score(&self, board: &Board) -> Score {
        let empty = board.count_empty();
        if empty == 0 {
            return Score::Lost;
        }
        Score::Value(
            positional_value(board) + (self.availability_bonus << empty)
                - self.order_penalty_weight * order_penalty(board),
        )
    }
}

/// Sum of every tile shifted left by the rank of its cell
pub fn positional_value(board: &Board) -> i64 {
    let mut value = 0;
    for (r, p) in by_rank().iter().enumerate() {
        if let Some(tile) = board.get_at(*p) {
            value += (tile as i64) << r;
        }
    }
    value
}

/// Penalty for larger tiles sitting behind smaller ones along the snake
///
/// Every cell of rank `r >= 1` is compared with the cell of rank `r - 1`
/// and with its neighbour in the next column. When the lower-ranked cell
/// holds the larger tile, `(larger / smaller) << r` is added.
pub fn order_penalty(board: &Board) -> i64 {
    let ranked = by_rank();
    let mut penalty = 0;

    for r in (1..NUM_CELLS).rev() {
        let high = ranked[r];
        let high_value = match board.get_at(high) {
            Some(value) => value as i64,
            None => continue,
        };

        let next = ranked[r - 1];
        let beside = if high.x + 1 < SIZE {
            Some(Position::new(high.x + 1, high.y))
        } else {
            None
        };

        let neighbours = std::iter::once(next).chain(beside.filter(|&p| p != next));
        for low in neighbours {
            if let Some(low_value) = board.get_at(low) {
                let low_value = low_value as i64;
                if low_value > high_value {
                    penalty += (low_value / high_value) << r;
                }
            }
        }
    }
    penalty
}
