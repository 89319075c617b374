use crate::board::Board;
use crate::heuristic::Score;

#[derive(Copy, Clone)]
struct Entry {
    key: u64,
    depth: usize,
    score: Score,
}

const TABLE_MAX_SIZE: usize = (1 << 16) + 1; // prime value

/// A fixed-size cache of search results keyed by board and depth
///
/// Colliding entries overwrite each other, a miss only costs a re-search.
#[derive(Clone)]
pub struct TranspositionTable {
    entries: Vec<Option<Entry>>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self {
            entries: vec![None; TABLE_MAX_SIZE],
        }
    }

    fn index(key: u64, depth: usize) -> usize {
        (key ^ (depth as u64).rotate_left(59)) as usize % TABLE_MAX_SIZE
    }

    /// Stores the score of `board` searched from `depth`, boards that do not pack are skipped
    pub fn set(&mut self, board: &Board, depth: usize, score: Score) {
        if let Some(key) = board.packed() {
            self.entries[Self::index(key, depth)] = Some(Entry { key, depth, score });
        }
    }

    pub fn get(&self, board: &Board, depth: usize) -> Option<Score> {
        let key = board.packed()?;
        match self.entries[Self::index(key, depth)] {
            Some(entry) if entry.key == key && entry.depth == depth => Some(entry.score),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = None;
        }
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}
