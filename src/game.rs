use anyhow::{anyhow, Result};
use crossterm::{
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use std::io::{stdout, Write};
use std::time::{Duration, Instant};

use twenty48_ai::*;

/// Probability that a new tile is a 2 rather than a 4
const TWO_PROBABILITY: f64 = 0.9;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameState {
    Playing,
    Over,
}

/// Whether the agent is driving the game
///
/// The engine itself keeps no state between moves, the driver owns this.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Autoplay {
    Idle,
    Searching,
    Stopped,
}

impl Autoplay {
    pub fn toggle(self) -> Self {
        match self {
            Autoplay::Searching => Autoplay::Stopped,
            Autoplay::Idle | Autoplay::Stopped => Autoplay::Searching,
        }
    }
}

/// Places a random tile in a random empty cell, a full board is returned unchanged
pub fn spawn_tile<R: Rng>(board: &Board, rng: &mut R) -> Board {
    let cells: Vec<Position> = board.empty_cells().collect();
    match cells.choose(rng) {
        Some(&position) => {
            let exponent = if rng.gen_bool(TWO_PROBABILITY) { 1 } else { 2 };
            board.with_tile(position, exponent)
        }
        None => *board,
    }
}

#[derive(Clone)]
pub struct Game {
    pub board: Board,
    pub moves: usize,
    pub state: GameState,
}

impl Game {
    /// Starts a game with two random tiles
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let board = spawn_tile(&spawn_tile(&Board::empty(), rng), rng);
        Self {
            board,
            moves: 0,
            state: GameState::Playing,
        }
    }

    pub fn play_checked<R: Rng>(&mut self, direction: Direction, rng: &mut R) -> Result<GameState> {
        if self.state == GameState::Over {
            return Err(anyhow!("Invalid move, the game is over"));
        }
        let next = self.board.next_board(direction);
        if next == self.board {
            return Err(anyhow!("Invalid move, sliding {} changes nothing", direction));
        }

        self.board = spawn_tile(&next, rng);
        self.moves += 1;
        if self.board.is_game_over() {
            self.state = GameState::Over;
        }
        Ok(self.state)
    }

    pub fn display(&self) -> Result<()> {
        let mut stdout = stdout();

        stdout.queue(PrintStyledContent(style(format!(
            "Moves: {}, max tile: {}\n",
            self.moves,
            self.board.max_tile().unwrap_or(0)
        ))))?;
        for row in self.board.rows().iter() {
            for cell in row.iter() {
                let (text, colour) = match cell {
                    Some(value) => (format!("{:^6}", value), tile_colour(*value)),
                    None => (format!("{:^6}", "."), Color::DarkGrey),
                };
                stdout.queue(PrintStyledContent(
                    style(text)
                        .attribute(Attribute::Bold)
                        .on(colour)
                        .with(Color::White),
                ))?;
            }
            stdout.queue(PrintStyledContent(style("\n")))?;
        }
        stdout.flush()?;
        Ok(())
    }
}

fn tile_colour(value: u32) -> Color {
    match value {
        2 | 4 => Color::DarkYellow,
        8 | 16 => Color::DarkRed,
        32 | 64 => Color::Red,
        128 | 256 => Color::DarkMagenta,
        512 | 1024 => Color::DarkBlue,
        2048 => Color::DarkGreen,
        _ => Color::Black,
    }
}

/// Outcome of one self-played game
#[derive(Copy, Clone, Debug)]
pub struct GameSummary {
    pub moves: usize,
    pub max_tile: u32,
    pub nodes: usize,
    pub time: Duration,
}

/// Plays a whole game with the agent choosing every move
pub fn self_play(seed: u64, config: SearchConfig, max_moves: Option<usize>) -> Result<GameSummary> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut game = Game::new(&mut rng);
    let mut solver = Solver::with_config(config);
    let start_time = Instant::now();

    while game.state == GameState::Playing && max_moves.map_or(true, |max| game.moves < max) {
        let direction = solver.choose_move(&game.board)?;
        game.play_checked(direction, &mut rng)?;
    }

    Ok(GameSummary {
        moves: game.moves,
        max_tile: game.board.max_tile().unwrap_or(0),
        nodes: solver.node_count,
        time: Instant::now() - start_time,
    })
}
