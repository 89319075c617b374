//! An agent to choose moves in the game of 2048

use log::{debug, trace};
use rayon::prelude::*;

use crate::{
    board::{Board, Position},
    error::{Error, Result},
    heuristic::{highest_priority_empty, Heuristic, Score},
    rules::shortcut,
    transition::Direction,
    transposition_table::TranspositionTable,
};

/// Number of player moves searched ahead by default
pub const DEFAULT_DEPTH: usize = 3;

/// Above this many empty cells nature only spawns into the highest-priority one
pub const BRANCHING_THRESHOLD: usize = 6;

/// Exponents of the tiles nature can spawn, 2 and 4
pub const SPAWN_EXPONENTS: [u8; 2] = [1, 2];

/// Nature placing a new tile
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SpawnEvent {
    pub position: Position,
    pub exponent: u8,
}

impl SpawnEvent {
    pub fn value(&self) -> u32 {
        1 << self.exponent
    }
}

/// The spawns nature considers after a move
///
/// With more than `threshold` empty cells only the highest-priority empty
/// cell is tried, otherwise every empty cell. Both tile values are tried
/// in each cell.
pub fn nature_responses(board: &Board, threshold: usize) -> Vec<SpawnEvent> {
    let mut cells: Vec<Position> = board.empty_cells().collect();
    if cells.len() > threshold {
        cells = highest_priority_empty(board).into_iter().collect();
    }
    cells
        .iter()
        .flat_map(|&position| {
            SPAWN_EXPONENTS
                .iter()
                .map(move |&exponent| SpawnEvent { position, exponent })
        })
        .collect()
}

/// Search parameters
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SearchConfig {
    /// Number of player moves searched before the evaluator is applied
    pub depth: usize,
    pub branching_threshold: usize,
    pub heuristic: Heuristic,
    /// Let the pattern rules pick moves and restrict the search
    pub use_shortcut: bool,
    /// Search the first move of each direction on its own thread
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            branching_threshold: BRANCHING_THRESHOLD,
            heuristic: Heuristic::default(),
            use_shortcut: true,
            parallel: false,
        }
    }
}

impl SearchConfig {
    /// One extra move of lookahead with the matching evaluation weights
    pub fn deep() -> Self {
        Self {
            depth: DEFAULT_DEPTH + 1,
            heuristic: Heuristic::deep(),
            ..Self::default()
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_branching_threshold(mut self, threshold: usize) -> Self {
        self.branching_threshold = threshold;
        self
    }

    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_shortcut(mut self, use_shortcut: bool) -> Self {
        self.use_shortcut = use_shortcut;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

struct Candidates {
    size: usize,
    moves: [Direction; 4],
}

impl Candidates {
    fn new() -> Self {
        Self {
            size: 0,
            moves: [Direction::Up; 4],
        }
    }

    fn single(direction: Direction) -> Self {
        let mut candidates = Self::new();
        candidates.push(direction);
        candidates
    }

    fn all() -> Self {
        let mut candidates = Self::new();
        // pushed in reverse, the iterator pops from the back
        for &direction in Direction::SEARCH_ORDER.iter().rev() {
            candidates.push(direction);
        }
        candidates
    }

    fn push(&mut self, direction: Direction) {
        self.moves[self.size] = direction;
        self.size += 1;
    }
}

impl Iterator for Candidates {
    type Item = Direction;

    fn next(&mut self) -> Option<Self::Item> {
        match self.size {
            0 => None,
            _ => {
                self.size -= 1;
                Some(self.moves[self.size])
            }
        }
    }
}

/// An agent to choose moves for 2048 positions
///
/// # Notes
/// The agent alternates between the player, who picks the direction with the
/// best outcome, and nature, which places the new tile wherever it hurts the
/// player most. After `depth` player moves the position is scored with the
/// [`Heuristic`]. When too many cells are free, nature is limited to the
/// highest-priority one to keep the tree small.
///
/// `Right` is only searched when no other direction is legal, as it
/// pulls tiles away from the anchor corner.
#[derive(Clone)]
pub struct Solver {
    config: SearchConfig,

    /// The number of nodes searched by this `Solver` so far (for diagnostics only)
    pub node_count: usize,
    transposition_table: TranspositionTable,
}

impl Solver {
    /// Creates a new `Solver` with the default configuration
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    pub fn with_config(config: SearchConfig) -> Self {
        Self {
            config,
            node_count: 0,
            transposition_table: TranspositionTable::new(),
        }
    }

    /// Creates a new `Solver` with a given transposition table
    ///
    /// The table must only hold scores computed with the same configuration.
    pub fn new_with_transposition_table(
        config: SearchConfig,
        transposition_table: TranspositionTable,
    ) -> Self {
        Self {
            config,
            node_count: 0,
            transposition_table,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn candidates(&self, board: &Board) -> Candidates {
        if self.config.use_shortcut {
            if let Some(direction) = shortcut(board) {
                return Candidates::single(direction);
            }
        }
        Candidates::all()
    }

    // score of a position reached after nature's move, cached by depth
    fn value(&mut self, board: Board, depth: usize) -> Score {
        if let Some(score) = self.transposition_table.get(&board, depth) {
            return score;
        }
        let (_, score) = self.best_move(board, depth);
        self.transposition_table.set(&board, depth, score);
        score
    }

    /// The worst score nature can force after playing `direction`, `None` if the move is blocked
    fn worst_case(&mut self, board: &Board, direction: Direction, depth: usize) -> Option<Score> {
        let next = board.next_board(direction);
        if next == *board {
            return None;
        }

        let mut worst: Option<Score> = None;
        for spawn in nature_responses(&next, self.config.branching_threshold) {
            let score = self.value(next.with_tile(spawn.position, spawn.exponent), depth + 1);
            worst = Some(worst.map_or(score, |w| w.min(score)));
        }
        // a move that changes the board always leaves a free cell
        assert!(worst.is_some(), "nature found no cell to spawn into after {}", direction);
        worst
    }

    /// Performs the game tree search from `board`, `depth` player moves below the root
    ///
    /// Returns the best direction and its score. A position without a legal
    /// move returns no direction and `Score::Lost`.
    pub fn best_move(&mut self, board: Board, depth: usize) -> (Option<Direction>, Score) {
        self.node_count += 1;

        if depth >= self.config.depth {
            return (None, self.config.heuristic.score(&board));
        }

        let mut best: Option<(Direction, Score)> = None;
        for direction in self.candidates(&board) {
            if direction == Direction::Right && best.is_some() {
                continue;
            }
            if let Some(score) = self.worst_case(&board, direction, depth) {
                // ties keep the earlier direction
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((direction, score));
                }
            }
        }

        match best {
            Some((direction, score)) => (Some(direction), score),
            None => (None, Score::Lost),
        }
    }

    fn score_directions(&mut self, board: &Board, directions: &[Direction]) -> Vec<(Direction, Score)> {
        if self.config.parallel {
            let config = self.config;
            // every branch starts with an empty table of its own
            let branches: Vec<(Direction, Option<Score>, usize)> = directions
                .par_iter()
                .map(|&direction| {
                    let mut branch = Solver::with_config(config);
                    let score = branch.worst_case(board, direction, 0);
                    (direction, score, branch.node_count)
                })
                .collect();

            self.node_count += branches.iter().map(|(_, _, nodes)| nodes).sum::<usize>();
            branches
                .into_iter()
                .filter_map(|(direction, score, _)| score.map(|score| (direction, score)))
                .collect()
        } else {
            directions
                .iter()
                .filter_map(|&direction| {
                    self.worst_case(board, direction, 0)
                        .map(|score| (direction, score))
                })
                .collect()
        }
    }

    /// Scores every root candidate that the search considers, in search order
    ///
    /// Blocked directions are left out, as is `Right` whenever another
    /// direction is legal.
    pub fn analyse(&mut self, board: &Board) -> Vec<(Direction, Score)> {
        self.node_count += 1;

        let (right, others): (Vec<Direction>, Vec<Direction>) = self
            .candidates(board)
            .partition(|&direction| direction == Direction::Right);

        let mut scored = self.score_directions(board, &others);
        if scored.is_empty() && !right.is_empty() {
            scored = self.score_directions(board, &right);
        }
        scored
    }

    /// Chooses the move to play from `board`
    ///
    /// Returns `Error::NoLegalMove` if every direction leaves the board unchanged.
    pub fn choose_move(&mut self, board: &Board) -> Result<Direction> {
        if self.config.use_shortcut {
            if let Some(direction) = shortcut(board) {
                debug!("shortcut chose {}", direction);
                return Ok(direction);
            }
        }

        let start_nodes = self.node_count;
        let mut best: Option<(Direction, Score)> = None;
        for (direction, score) in self.analyse(board) {
            trace!("{}: {}", direction, score);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((direction, score));
            }
        }

        match best {
            Some((direction, score)) => {
                debug!(
                    "search chose {} with score {} after {} nodes",
                    direction,
                    score,
                    self.node_count - start_nodes
                );
                Ok(direction)
            }
            None => Err(Error::NoLegalMove),
        }
    }

    /// Forgets cached scores, needed before reusing the table with another configuration
    pub fn clear_transposition_table(&mut self) {
        self.transposition_table.clear();
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}
