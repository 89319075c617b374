use std::fmt;
use std::str::FromStr;

use crate::board::{Board, MAX_EXPONENT};
use crate::error::Error;
use crate::SIZE;

/// A move direction
///
/// Every direction is played as a slide towards the top row of a board
/// rotated counter-clockwise by `rotations()` quarter turns.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// The order in which the search tries directions, the risky `Right` comes last
    pub const SEARCH_ORDER: [Direction; 4] = [
        Direction::Left,
        Direction::Down,
        Direction::Up,
        Direction::Right,
    ];

    /// Number of counter-clockwise quarter turns that turn this move into an upward slide
    pub const fn rotations(self) -> i32 {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        };
        f.write_str(name)
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "u" | "w" | "up" => Ok(Direction::Up),
            "r" | "d" | "right" => Ok(Direction::Right),
            "s" | "down" => Ok(Direction::Down),
            "l" | "a" | "left" => Ok(Direction::Left),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

// slides one column towards index 0, a tile produced by a merge never merges again
// and tiles of the largest size stay apart
fn slide_column(column: [u8; SIZE]) -> [u8; SIZE] {
    let mut slid = [0; SIZE];
    let mut merged = [false; SIZE];
    let mut len = 0;

    for &exponent in column.iter().filter(|&&e| e != 0) {
        if len > 0
            && slid[len - 1] == exponent
            && !merged[len - 1]
            && exponent < MAX_EXPONENT
        {
            slid[len - 1] += 1;
            merged[len - 1] = true;
        } else {
            assert!(len < SIZE, "slide placed more tiles than the column holds");
            slid[len] = exponent;
            len += 1;
        }
    }
    slid
}

impl Board {
    /// Rotates the board counter-clockwise by `n` quarter turns, `n` may be negative
    pub fn rotate(&self, n: i32) -> Board {
        let mut cells = *self.exponents();
        for _ in 0..n.rem_euclid(4) {
            let mut rotated = [[0; SIZE]; SIZE];
            for y in 0..SIZE {
                for x in 0..SIZE {
                    rotated[SIZE - 1 - x][y] = cells[y][x];
                }
            }
            cells = rotated;
        }
        Board::from_exponents(cells)
    }

    /// The board after sliding every tile towards `direction`
    ///
    /// A blocked move returns an identical board, callers compare against the
    /// input to decide whether the move is legal.
    pub fn next_board(&self, direction: Direction) -> Board {
        let rotated = self.rotate(direction.rotations());
        let cells = rotated.exponents();

        let mut slid = [[0; SIZE]; SIZE];
        for x in 0..SIZE {
            let mut column = [0; SIZE];
            for y in 0..SIZE {
                column[y] = cells[y][x];
            }
            for (y, exponent) in slide_column(column).iter().enumerate() {
                slid[y][x] = *exponent;
            }
        }

        Board::from_exponents(slid).rotate(-direction.rotations())
    }

    /// Whether sliding towards `direction` changes the board
    pub fn can_move(&self, direction: Direction) -> bool {
        self.next_board(direction) != *self
    }

    pub fn legal_moves(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL
            .iter()
            .copied()
            .filter(move |&direction| self.can_move(direction))
    }

    /// True when no direction changes the board
    pub fn is_game_over(&self) -> bool {
        self.legal_moves().next().is_none()
    }
}
