use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;

use std::collections::BTreeMap;
use std::io::{stdin, stdout, Write};
use std::time::Duration;

use twenty48_ai::*;

mod game;
use game::*;

#[derive(Debug, Parser)]
#[command(author, version, about = "Choose moves for the sliding tile game 2048", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the chosen move for a board, e.g. "2 4 8 16 / . . . . / . . . . / . . . ."
    Suggest {
        board: String,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Play a game in the terminal
    Play {
        #[arg(long)]
        seed: Option<u64>,
        /// Enter moves yourself, type 'ai' to hand over to the agent
        #[arg(long)]
        human: bool,
        /// Pause between agent moves
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
        #[arg(long)]
        max_moves: Option<usize>,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Self-play many games and report the tiles reached
    Bench {
        #[arg(long, default_value_t = 20)]
        games: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        max_moves: Option<usize>,
        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(Debug, Args)]
struct SearchArgs {
    /// Player moves searched ahead
    #[arg(long)]
    depth: Option<usize>,
    /// Search one move deeper with weights tuned for it
    #[arg(long)]
    deep: bool,
    #[arg(long)]
    branching_threshold: Option<usize>,
    /// Always search instead of trusting the pattern rules
    #[arg(long)]
    no_shortcut: bool,
    /// Search each first move on its own thread
    #[arg(long)]
    parallel: bool,
}

impl SearchArgs {
    fn config(&self) -> SearchConfig {
        let mut config = if self.deep {
            SearchConfig::deep()
        } else {
            SearchConfig::default()
        };
        if let Some(depth) = self.depth {
            config = config.with_depth(depth);
        }
        if let Some(threshold) = self.branching_threshold {
            config = config.with_branching_threshold(threshold);
        }
        config
            .with_shortcut(!self.no_shortcut)
            .with_parallel(self.parallel)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match cli.command {
        Command::Suggest { board, search } => suggest(&board, search.config()),
        Command::Play {
            seed,
            human,
            delay_ms,
            max_moves,
            search,
        } => play(seed, human, Duration::from_millis(delay_ms), max_moves, search.config()),
        Command::Bench {
            games,
            seed,
            max_moves,
            search,
        } => bench(games, seed, max_moves, search.config()),
    }
}

fn suggest(board: &str, config: SearchConfig) -> Result<()> {
    let board: Board = board.parse()?;
    let mut solver = Solver::with_config(config);
    print!("{}", board);

    for (direction, score) in solver.analyse(&board) {
        println!("{:>6}: {}", direction, score);
    }
    match solver.choose_move(&board) {
        Ok(direction) => println!("Best move: {}", direction),
        Err(Error::NoLegalMove) => println!("No legal move, the game is over"),
        Err(err) => return Err(err.into()),
    }
    info!("searched {} nodes", solver.node_count);
    Ok(())
}

fn play(
    seed: Option<u64>,
    human: bool,
    delay: Duration,
    max_moves: Option<usize>,
    config: SearchConfig,
) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut game = Game::new(&mut rng);
    let mut solver = Solver::with_config(config);
    let mut autoplay = if human {
        Autoplay::Idle
    } else {
        Autoplay::Searching
    };

    let stdin = stdin();

    println!("Welcome to 2048\n");

    // game loop
    loop {
        game.display()?;

        if game.state == GameState::Over {
            println!("Game over after {} moves!", game.moves);
            break;
        }
        if max_moves.map_or(false, |max| game.moves >= max) {
            println!("Stopping after {} moves", game.moves);
            break;
        }

        let next_move = match autoplay {
            // AI player
            Autoplay::Searching => match solver.choose_move(&game.board) {
                Ok(direction) => {
                    println!("AI plays {}", direction);
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    direction
                }
                Err(err) => {
                    println!("{}", err);
                    autoplay = Autoplay::Stopped;
                    continue;
                }
            },
            Autoplay::Idle | Autoplay::Stopped if !human => break,

            // human player
            Autoplay::Idle | Autoplay::Stopped => {
                if let Ok(hint) = solver.choose_move(&game.board) {
                    println!("Hint: {}", hint);
                }
                print!("Move input (w/a/s/d, 'ai' to autoplay, 'q' to quit) > ");
                stdout().flush()?;
                let mut input_str = String::new();
                stdin.read_line(&mut input_str)?;

                match input_str.trim() {
                    "q" | "quit" => break,
                    "ai" => {
                        autoplay = autoplay.toggle();
                        continue;
                    }
                    input => match input.parse::<Direction>() {
                        Ok(direction) => direction,
                        Err(err) => {
                            println!("{}", err);
                            continue;
                        }
                    },
                }
            }
        };

        if let Err(err) = game.play_checked(next_move, &mut rng) {
            println!("{}", err);
            // try the move again
            continue;
        }
    }

    info!(
        "{} moves, max tile {}, {} nodes searched",
        game.moves,
        game.board.max_tile().unwrap_or(0),
        solver.node_count
    );
    Ok(())
}

fn bench(games: usize, seed: u64, max_moves: Option<usize>, config: SearchConfig) -> Result<()> {
    let progress = ProgressBar::new(games as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos}/{len} games [{elapsed_precise}] eta {eta}")
            .progress_chars("##-"),
    );

    let summaries = (0..games)
        .into_par_iter()
        .map(|i| {
            let summary = self_play(seed + i as u64, config, max_moves);
            progress.inc(1);
            summary
        })
        .collect::<Result<Vec<_>>>()?;
    progress.finish();

    let mut max_tiles = BTreeMap::new();
    for summary in summaries.iter() {
        *max_tiles.entry(summary.max_tile).or_insert(0usize) += 1;
    }
    for (tile, count) in max_tiles.iter().rev() {
        println!(
            "{:>6}: {:>4} games ({:.1}%)",
            tile,
            count,
            100.0 * *count as f64 / games.max(1) as f64
        );
    }

    let moves = summaries.iter().map(|s| s.moves).sum::<usize>();
    let nodes = summaries.iter().map(|s| s.nodes).sum::<usize>();
    let time = summaries.iter().map(|s| s.time).sum::<Duration>();
    println!(
        "Mean moves: {:.1}, mean time per move: {:.3}ms, kpos/s: {:.1}",
        moves as f64 / games.max(1) as f64,
        time.as_secs_f64() * 1000.0 / moves.max(1) as f64,
        nodes as f64 / (1000.0 * time.as_secs_f64().max(f64::EPSILON))
    );
    Ok(())
}
