use thiserror::Error;

/// Failures reported by the decision engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No direction changes the board, the game is over
    #[error("no legal move, every direction leaves the board unchanged")]
    NoLegalMove,
    #[error("invalid board: {0}")]
    InvalidBoard(String),
    #[error("could not parse '{0}' as a direction")]
    InvalidDirection(String),
}

pub type Result<T> = std::result::Result<T, Error>;
