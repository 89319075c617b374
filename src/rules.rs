//! Cheap pattern checks that pick an obvious move without searching
//!
//! The anchor column is the leftmost column, which holds the four highest
//! ranks of the snake with the anchor corner (rank 15) at its bottom. Every
//! rule only returns moves that change the board.

use crate::board::{Board, Position};
use crate::heuristic::{cell_of_rank, highest_priority_empty, rank};
use crate::transition::Direction;
use crate::{NUM_CELLS, SIZE};

/// Column holding ranks 12 to 15
pub const ANCHOR_COLUMN: usize = 0;

/// Returns a clearly dominant move, or `None` if the position needs a search
pub fn shortcut(board: &Board) -> Option<Direction> {
    fill_anchor_column(board)
        .or_else(|| consolidate_down(board))
        .or_else(|| merge_along_snake(board))
        .or_else(|| second_cell_neighbour(board))
}

/// Fills a hole in the anchor column with a left or down slide
pub fn fill_anchor_column(board: &Board) -> Option<Direction> {
    let hole = highest_priority_empty(board)?;
    if hole.x != ANCHOR_COLUMN {
        return None;
    }
    [Direction::Left, Direction::Down]
        .iter()
        .copied()
        .find(|&direction| {
            let next = board.next_board(direction);
            next != *board && next.is_occupied(hole.x, hole.y)
        })
}

/// Slides down when that clears the top of the anchor column
pub fn consolidate_down(board: &Board) -> Option<Direction> {
    let top = cell_of_rank(NUM_CELLS - SIZE);
    let next = board.next_board(Direction::Down);
    if next != *board && !next.is_occupied(top.x, top.y) {
        Some(Direction::Down)
    } else {
        None
    }
}

// the move that pushes the tile at `from` onto the adjacent cell `onto`
fn direction_onto(from: Position, onto: Position) -> Option<Direction> {
    match (from.x as isize - onto.x as isize, from.y as isize - onto.y as isize) {
        (0, -1) => Some(Direction::Down),
        (0, 1) => Some(Direction::Up),
        (1, 0) => Some(Direction::Left),
        (-1, 0) => Some(Direction::Right),
        _ => None,
    }
}

/// Merges two equal tiles of consecutive rank into the higher-ranked cell
pub fn merge_along_snake(board: &Board) -> Option<Direction> {
    for r in (1..NUM_CELLS).rev() {
        let high = cell_of_rank(r);
        let low = cell_of_rank(r - 1);
        let value = match (board.get_at(high), board.get_at(low)) {
            (Some(high_value), Some(low_value)) if high_value == low_value => high_value,
            (Some(_), Some(_)) => continue,
            _ => return None,
        };

        if let Some(direction) = direction_onto(low, high) {
            let next = board.next_board(direction);
            let merged = value.checked_mul(2);
            if merged.is_some() && next.get_at(high) == merged {
                return Some(direction);
            }
        }
    }
    None
}

/// Feeds the second-ranked cell from its right-hand neighbour
pub fn second_cell_neighbour(board: &Board) -> Option<Direction> {
    let second = cell_of_rank(NUM_CELLS - 2);
    let neighbour = Position::new(second.x + 1, second.y);
    debug_assert!(rank(neighbour) < rank(second));

    let neighbour_value = board.get_at(neighbour)?;
    let second_value = board.get_at(second);
    if second_value.map_or(true, |value| value == neighbour_value) {
        let next = board.next_board(Direction::Left);
        if next.get_at(second) > second_value {
            return Some(Direction::Left);
        }
    }

    let next = board.next_board(Direction::Up);
    let anchor_untouched = (0..SIZE).all(|y| {
        next.exponent(ANCHOR_COLUMN, y) == board.exponent(ANCHOR_COLUMN, y)
    });
    if anchor_untouched && next.get_at(neighbour) > Some(neighbour_value) {
        return Some(Direction::Up);
    }
    None
}
