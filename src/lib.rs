//! A move-decision agent for the sliding tile game '2048'
//!
//! This agent searches a few moves ahead, assuming that every new tile
//! lands where it hurts the most, and picks the move with the best
//! worst-case outcome.
//!
//! # Basic Usage
//!
//! ```
//! use twenty48_ai::{board::Board, solver::Solver, transition::Direction};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let board: Board = "2 4 8 16 / . . . . / . . . . / . . . .".parse()?;
//! let mut solver = Solver::new();
//! let direction = solver.choose_move(&board)?;
//!
//! assert!(direction != Direction::Left);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod error;

pub mod board;

pub mod transition;

pub mod heuristic;

pub mod rules;

pub mod transposition_table;

pub mod solver;

mod test;

pub use board::{Board, Position};
pub use error::Error;
pub use heuristic::{Heuristic, Score};
pub use solver::{SearchConfig, Solver};
pub use transition::Direction;

/// The width and height of the game board in tiles
pub const SIZE: usize = 4;

/// The number of cells on the board
pub const NUM_CELLS: usize = SIZE * SIZE;

// ensure that a board of 4-bit exponents fits in a u64 for the packed representation
const_assert!(NUM_CELLS * 4 <= 64);
