#[cfg(test)]
pub mod test {
    use anyhow::Result;
    use std::time::{Duration, Instant};

    use crate::board::{Position, MAX_TILE};
    use crate::heuristic::{self, Heuristic, Score};
    use crate::rules;
    use crate::solver::{nature_responses, SearchConfig, Solver, BRANCHING_THRESHOLD};
    use crate::transposition_table::TranspositionTable;
    use crate::{Board, Direction, Error};

    // no two neighbours are equal, so no direction changes it
    const BLOCKED: &str = "2 4 2 4 / 4 2 4 2 / 2 4 2 4 / 4 2 4 2";

    fn board(s: &str) -> Board {
        s.parse().expect("test board should parse")
    }

    #[test]
    pub fn rotation_round_trip() -> Result<()> {
        let board = board("2 4 . 8 / . 16 . . / 32 . . 2 / . . 4 .");
        for n in -8..=8 {
            assert_eq!(board.rotate(n).rotate(-n), board);
        }
        assert_eq!(board.rotate(4), board);
        assert_eq!(board.rotate(-1), board.rotate(3));
        Ok(())
    }

    #[test]
    pub fn rotation_is_counter_clockwise() -> Result<()> {
        // top-right corner moves to the top-left
        let board = board(". . . 2 / . . . . / . . . . / . . . .");
        let rotated = board.rotate(1);
        assert_eq!(rotated.get(0, 0), Some(2));
        assert_eq!(rotated.count_empty(), 15);
        Ok(())
    }

    #[test]
    pub fn next_board_is_pure() -> Result<()> {
        let original = board("2 2 4 . / . 4 4 8 / 2 . . 2 / 16 16 16 16");
        let copy = original;
        for &direction in Direction::ALL.iter() {
            let first = original.next_board(direction);
            let second = original.next_board(direction);
            assert_eq!(first, second);
        }
        assert_eq!(original, copy);
        Ok(())
    }

    #[test]
    pub fn merge_once() -> Result<()> {
        let row = |s: &str| board(&format!("{} / . . . . / . . . . / . . . .", s));

        assert_eq!(row("2 2 2 2").next_board(Direction::Left), row("4 4 . ."));
        assert_eq!(row("2 2 2 2").next_board(Direction::Right), row(". . 4 4"));
        assert_eq!(row("2 2 4 .").next_board(Direction::Left), row("4 4 . ."));
        assert_eq!(row("4 4 8 .").next_board(Direction::Left), row("8 8 . ."));
        assert_eq!(row("4 2 2 .").next_board(Direction::Left), row("4 4 . ."));
        assert_eq!(row("2 . 2 4").next_board(Direction::Left), row("4 4 . ."));
        Ok(())
    }

    #[test]
    pub fn vertical_slides() -> Result<()> {
        let board = board(". 2 . . / . . . . / . 2 . . / . 4 . .");
        assert_eq!(
            board.next_board(Direction::Up),
            self::board(". 4 . . / . 4 . . / . . . . / . . . .")
        );
        assert_eq!(
            board.next_board(Direction::Down),
            self::board(". . . . / . . . . / . 4 . . / . 4 . .")
        );
        Ok(())
    }

    #[test]
    pub fn adjacent_pair_merges() -> Result<()> {
        let board = board("2 2 . . / . . . . / . . . . / . . . .");
        let left = board.next_board(Direction::Left);
        assert_eq!(left, self::board("4 . . . / . . . . / . . . . / . . . ."));
        let right = board.next_board(Direction::Right);
        assert_eq!(right, self::board(". . . 4 / . . . . / . . . . / . . . ."));
        Ok(())
    }

    #[test]
    pub fn blocked_moves() -> Result<()> {
        // every row strictly decreasing and full, a left slide cannot change it
        let board = board("1024 512 256 128 / 2048 64 32 16 / 4096 8 4 2 / 64 32 16 8");
        assert_eq!(board.next_board(Direction::Left), board);
        assert!(!board.can_move(Direction::Left));
        assert!(!board.can_move(Direction::Right));

        let blocked = self::board(BLOCKED);
        assert!(blocked.is_game_over());
        assert_eq!(blocked.legal_moves().count(), 0);
        Ok(())
    }

    #[test]
    pub fn top_row_left_is_noop() -> Result<()> {
        let board = board("2 4 8 16 / . . . . / . . . . / . . . .");
        assert_eq!(board.next_board(Direction::Left), board);

        for config in [
            SearchConfig::default(),
            SearchConfig::default().with_shortcut(false),
        ]
        .iter()
        {
            let mut solver = Solver::with_config(*config);
            let direction = solver.choose_move(&board)?;
            assert_ne!(direction, Direction::Left);
            assert_ne!(board.next_board(direction), board);
        }
        Ok(())
    }

    #[test]
    pub fn evaluator_scores() -> Result<()> {
        let heuristic = Heuristic::default();

        // a lone 2 in the anchor corner
        let corner = board(". . . . / . . . . / . . . . / 2 . . .");
        assert_eq!(heuristic.score(&corner), Score::Value((2 << 15) + (1024 << 15)));

        // an 8 sitting behind a 2 along the snake
        let out_of_order = board(". . . . / . . . . / 8 . . . / 2 . . .");
        assert_eq!(heuristic::order_penalty(&out_of_order), 4 << 15);
        assert_eq!(
            heuristic.score(&out_of_order),
            Score::Value((2 << 15) + (8 << 14) + (1024 << 14) - (4 << 15))
        );
        Ok(())
    }

    #[test]
    pub fn evaluator_prefers_free_cells() -> Result<()> {
        let heuristic = Heuristic::default();
        let sparse = board("2 . . . / . . . . / . . . . / 8 4 . .");
        let crowded = sparse.with_tile(Position::new(3, 3), 1);
        assert!(heuristic.score(&sparse) >= heuristic.score(&crowded));
        Ok(())
    }

    #[test]
    pub fn full_board_is_lost() -> Result<()> {
        let heuristic = Heuristic::default();
        assert_eq!(heuristic.score(&board(BLOCKED)), Score::Lost);
        assert!(Score::Lost < Score::Value(i64::MIN));

        // the evaluator does not look for merges, a full board that can still move also scores as lost
        let mergeable = board("2 2 4 8 / 4 8 16 32 / 8 16 32 64 / 16 32 64 128");
        assert_eq!(heuristic.score(&mergeable), Score::Lost);
        assert!(!mergeable.is_game_over());
        Ok(())
    }

    #[test]
    pub fn no_legal_move() -> Result<()> {
        let blocked = board(BLOCKED);
        let mut solver = Solver::new();
        assert_eq!(solver.choose_move(&blocked), Err(Error::NoLegalMove));
        assert_eq!(solver.best_move(blocked, 0), (None, Score::Lost));
        assert!(solver.analyse(&blocked).is_empty());

        let mut solver = Solver::with_config(SearchConfig::default().with_shortcut(false));
        assert_eq!(solver.choose_move(&blocked), Err(Error::NoLegalMove));
        Ok(())
    }

    #[test]
    pub fn full_board_with_merge() -> Result<()> {
        let board = board("2 2 4 8 / 4 8 16 32 / 8 16 32 64 / 16 32 64 128");
        let mut solver = Solver::new();
        assert_eq!(solver.choose_move(&board)?, Direction::Left);

        let mut solver = Solver::with_config(SearchConfig::default().with_shortcut(false));
        let direction = solver.choose_move(&board)?;
        assert!(board.can_move(direction));
        Ok(())
    }

    #[test]
    pub fn only_right_is_legal() -> Result<()> {
        let board = board("2 . . . / 4 . . . / 8 . . . / 16 . . .");
        assert_eq!(board.legal_moves().collect::<Vec<_>>(), vec![Direction::Right]);
        assert_eq!(rules::shortcut(&board), None);

        let mut solver = Solver::new();
        assert_eq!(solver.choose_move(&board)?, Direction::Right);
        Ok(())
    }

    #[test]
    pub fn right_is_skipped_when_others_move() -> Result<()> {
        let board = board(". 2 . . / . . . . / . . 4 . / . . . .");
        let mut solver = Solver::with_config(SearchConfig::default().with_shortcut(false));
        let scored = solver.analyse(&board);
        let directions: Vec<Direction> = scored.iter().map(|(d, _)| *d).collect();
        assert_eq!(directions, vec![Direction::Left, Direction::Down, Direction::Up]);
        Ok(())
    }

    #[test]
    pub fn shortcut_rules() -> Result<()> {
        assert_eq!(rules::shortcut(&Board::empty()), None);

        // the anchor corner is empty and a down slide fills it
        let top_row = board("2 4 8 16 / . . . . / . . . . / . . . .");
        assert_eq!(rules::fill_anchor_column(&top_row), Some(Direction::Down));
        assert_eq!(rules::shortcut(&top_row), Some(Direction::Down));

        let stacked = board("2 . . . / 2 . . . / 4 . . . / 8 . . .");
        assert_eq!(rules::fill_anchor_column(&stacked), None);
        assert_eq!(rules::consolidate_down(&stacked), Some(Direction::Down));
        assert_eq!(rules::shortcut(&stacked), Some(Direction::Down));

        let pair = board("2 2 . . / 4 . . . / 8 . . . / 16 . . .");
        assert_eq!(rules::consolidate_down(&pair), None);
        assert_eq!(rules::merge_along_snake(&pair), Some(Direction::Left));
        assert_eq!(rules::shortcut(&pair), Some(Direction::Left));

        let beside = board("2 . . . / 4 . . . / 8 8 . . / 16 . . .");
        assert_eq!(rules::merge_along_snake(&beside), None);
        assert_eq!(rules::second_cell_neighbour(&beside), Some(Direction::Left));
        assert_eq!(rules::shortcut(&beside), Some(Direction::Left));

        // both slides fill the anchor corner, left is tried first
        let corner = board(". . . . / . . . . / 2 . . . / . 4 . .");
        assert!(corner.next_board(Direction::Down).is_occupied(0, 3));
        assert_eq!(rules::fill_anchor_column(&corner), Some(Direction::Left));
        assert_eq!(corner.next_board(Direction::Left).get(0, 3), Some(4));
        assert_eq!(rules::shortcut(&corner), Some(Direction::Left));

        let column = board("2 2 . . / 4 2 . . / 8 4 . . / 16 8 . .");
        assert_eq!(rules::second_cell_neighbour(&column), Some(Direction::Up));
        Ok(())
    }

    #[test]
    pub fn shortcut_only_returns_legal_moves() -> Result<()> {
        let boards = [
            "2 4 8 16 / . . . . / . . . . / . . . .",
            "2 . . . / 2 . . . / 4 . . . / 8 . . .",
            "2 2 4 8 / 4 8 16 32 / 8 16 32 64 / 16 32 64 128",
            ". . . 2 / . . 4 . / . 8 . . / 16 . . .",
            BLOCKED,
        ];
        for s in boards.iter() {
            let board = board(s);
            if let Some(direction) = rules::shortcut(&board) {
                assert!(board.can_move(direction), "{} on\n{}", direction, board);
            }
        }
        Ok(())
    }

    #[test]
    pub fn nature_branching() -> Result<()> {
        // 12 empty cells, nature only uses the highest-priority one
        let open = board("2 . . . / . 4 . . / . . 8 . / . . . 16");
        let responses = nature_responses(&open, BRANCHING_THRESHOLD);
        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| r.position == Position::new(0, 3)));
        assert_eq!(
            responses.iter().map(|r| r.value()).collect::<Vec<_>>(),
            vec![2, 4]
        );

        // 6 empty cells, every one is tried
        let tight = board("2 4 8 16 / 32 64 128 256 / 512 1024 . . / . . . .");
        let responses = nature_responses(&tight, BRANCHING_THRESHOLD);
        assert_eq!(responses.len(), 12);
        Ok(())
    }

    #[test]
    pub fn search_is_deterministic() -> Result<()> {
        let board = board("2 . 4 . / . 2 . 8 / 4 . 16 . / 2 32 . 4");
        let first = Solver::new().choose_move(&board)?;
        let second = Solver::new().choose_move(&board)?;
        assert_eq!(first, second);

        let config = SearchConfig::default().with_shortcut(false);
        let mut solver = Solver::with_config(config);
        let (direction, _) = solver.best_move(board, 0);
        assert_eq!(Some(Solver::with_config(config).choose_move(&board)?), direction);
        Ok(())
    }

    #[test]
    pub fn parallel_matches_sequential() -> Result<()> {
        let board = board("2 4 . 2 / 16 . 8 . / 32 4 . 2 / 128 64 8 4");
        let config = SearchConfig::default().with_shortcut(false).with_depth(2);

        let mut sequential = Solver::with_config(config);
        let mut parallel = Solver::with_config(config.with_parallel(true));
        assert_eq!(sequential.analyse(&board), parallel.analyse(&board));
        assert_eq!(sequential.choose_move(&board)?, parallel.choose_move(&board)?);
        Ok(())
    }

    #[test]
    pub fn cutoff_uses_evaluator() -> Result<()> {
        let board = board("2 . 4 . / . 2 . 8 / 4 . 16 . / 2 32 . 4");
        let config = SearchConfig::default();
        let mut solver = Solver::with_config(config);
        assert_eq!(
            solver.best_move(board, config.depth),
            (None, config.heuristic.score(&board))
        );
        Ok(())
    }

    #[test]
    pub fn board_validation() -> Result<()> {
        assert!(matches!(
            "2 4 8 / . . . / . . .".parse::<Board>(),
            Err(Error::InvalidBoard(_))
        ));
        assert!(matches!(
            "3 . . . / . . . . / . . . . / . . . .".parse::<Board>(),
            Err(Error::InvalidBoard(_))
        ));
        assert!(matches!(
            "1 . . . / . . . . / . . . . / . . . .".parse::<Board>(),
            Err(Error::InvalidBoard(_))
        ));

        let grid: Vec<Vec<Option<u32>>> = vec![vec![None; 4]; 3];
        assert!(matches!(Board::from_grid(&grid), Err(Error::InvalidBoard(_))));

        let rows = [[None, Some(2), None, None], [None; 4], [None; 4], [Some(6), None, None, None]];
        assert!(matches!(Board::from_rows(rows), Err(Error::InvalidBoard(_))));

        let board = board("2,4,8,16\n.,.,.,.\n.,.,.,.\n.,.,.,2048");
        assert_eq!(board.get(3, 0), Some(16));
        assert_eq!(board.get(3, 3), Some(2048));
        assert!(!board.is_occupied(1, 1));
        assert_eq!(board.max_tile(), Some(2048));
        Ok(())
    }

    #[test]
    pub fn board_encoding() -> Result<()> {
        let board = board("2 4 8 16 / . . . . / . . . 32768 / 2 . . .");
        let packed = board.packed().expect("tiles fit in a nibble");
        assert_eq!(packed >> 60, 1);
        assert_eq!(Board::from_packed(packed), board);

        let bytes = board.to_bytes()?;
        assert_eq!(u64::from_be_bytes(bytes), packed);
        assert_eq!(Board::from_bytes(&bytes)?, board);
        assert!(Board::from_bytes(&bytes[..5]).is_err());

        let huge = Board::empty().with_tile(Position::new(0, 0), 16);
        assert_eq!(huge.get(0, 0), Some(65536));
        assert_eq!(huge.packed(), None);
        assert!(huge.to_bytes().is_err());
        Ok(())
    }

    #[test]
    pub fn transposition_table() -> Result<()> {
        let mut table = TranspositionTable::new();
        let board = board("2 . . . / . . . . / . . . . / . . . 4");
        assert_eq!(table.get(&board, 1), None);

        table.set(&board, 1, Score::Value(42));
        assert_eq!(table.get(&board, 1), Some(Score::Value(42)));
        assert_eq!(table.get(&board, 2), None);
        assert_eq!(table.get(&board.rotate(1), 1), None);

        // depths far apart never share an entry
        table.set(&board, 256, Score::Value(7));
        assert_eq!(table.get(&board, 256), Some(Score::Value(7)));
        assert_eq!(table.get(&board, 0), None);

        table.clear();
        assert_eq!(table.get(&board, 1), None);
        Ok(())
    }

    #[test]
    pub fn search_takes_best_worst_case() -> Result<()> {
        let board = board("2 . 4 . / . 2 . 8 / 4 . 16 . / 2 32 . 4");
        let config = SearchConfig::default().with_depth(1).with_shortcut(false);
        let heuristic = config.heuristic;

        // nature picks the lowest score per move, the player the highest of those
        let mut expected: Option<(Direction, Score)> = None;
        for &direction in Direction::SEARCH_ORDER.iter() {
            let next = board.next_board(direction);
            if next == board || (direction == Direction::Right && expected.is_some()) {
                continue;
            }
            let worst = nature_responses(&next, BRANCHING_THRESHOLD)
                .iter()
                .map(|spawn| heuristic.score(&next.with_tile(spawn.position, spawn.exponent)))
                .min()
                .expect("a legal move leaves a free cell");
            if expected.map_or(true, |(_, best)| worst > best) {
                expected = Some((direction, worst));
            }
        }
        let (direction, score) = expected.expect("the board has a legal move");

        let mut solver = Solver::with_config(config);
        assert_eq!(solver.best_move(board, 0), (Some(direction), score));
        assert_eq!(Solver::with_config(config).choose_move(&board)?, direction);
        Ok(())
    }

    #[test]
    pub fn ties_keep_first_direction() -> Result<()> {
        // left and up are the only moves, both leave one cell that nature fills
        let board = board(". 4 2 4 / 4 2 4 2 / 2 4 2 4 / 4 2 4 2");
        assert_eq!(
            board.legal_moves().collect::<Vec<_>>(),
            vec![Direction::Up, Direction::Left]
        );

        let config = SearchConfig::default().with_depth(1).with_shortcut(false);
        let mut solver = Solver::with_config(config);
        assert_eq!(
            solver.analyse(&board),
            vec![(Direction::Left, Score::Lost), (Direction::Up, Score::Lost)]
        );
        assert_eq!(solver.best_move(board, 0), (Some(Direction::Left), Score::Lost));
        assert_eq!(solver.choose_move(&board)?, Direction::Left);
        Ok(())
    }

    #[test]
    pub fn legal_moves_leave_room_for_nature() -> Result<()> {
        let boards = [
            "2 4 8 16 / 32 64 128 256 / 512 1024 2048 4096 / 8192 16384 32768 2",
            "2 2 4 8 / 4 8 16 32 / 8 16 32 64 / 16 32 64 128",
            ". 4 2 4 / 4 2 4 2 / 2 4 2 4 / 4 2 4 2",
            "2 . 4 . / . 2 . 8 / 4 . 16 . / 2 32 . 4",
        ];
        for s in boards.iter() {
            let board = board(s);
            for direction in board.legal_moves() {
                let next = board.next_board(direction);
                assert!(!nature_responses(&next, BRANCHING_THRESHOLD).is_empty());
            }
        }
        Ok(())
    }

    #[test]
    pub fn largest_tiles_do_not_overflow() -> Result<()> {
        let huge = Some(MAX_TILE);
        let rows = [[None; 4], [None; 4], [huge, None, None, None], [huge, None, None, None]];
        let board = Board::from_rows(rows)?;
        assert_eq!(board.max_tile(), Some(MAX_TILE));

        // tiles of the largest size stay apart instead of merging
        assert!(!board.can_move(Direction::Down));
        assert_eq!(board.next_board(Direction::Up).get(0, 1), Some(MAX_TILE));
        assert_eq!(rules::merge_along_snake(&board), None);

        for &use_shortcut in [false, true].iter() {
            let config = SearchConfig::default().with_shortcut(use_shortcut);
            Solver::with_config(config).choose_move(&board)?;
        }

        // the next smaller pair still merges into the largest tile
        let half = Some(MAX_TILE / 2);
        let rows = [[None; 4], [None; 4], [half, None, None, None], [half, None, None, None]];
        let board = Board::from_rows(rows)?;
        assert_eq!(board.next_board(Direction::Down).get(0, 3), Some(MAX_TILE));

        assert!(matches!(
            "4294967296 . . . / . . . . / . . . . / . . . .".parse::<Board>(),
            Err(Error::InvalidBoard(_))
        ));
        Ok(())
    }

    #[test]
    pub fn search_speed() -> Result<()> {
        let boards = [
            "2 . 4 . / . 2 . 8 / 4 . 16 . / 2 32 . 4",
            "2 4 . 2 / 16 . 8 . / 32 4 . 2 / 128 64 8 4",
            "4 2 . . / 8 4 2 . / 16 8 4 . / 256 64 32 2",
            ". . . . / 2 . . . / 4 2 . . / 8 16 4 2",
        ];

        let mut times = vec![];
        let mut posis = vec![];

        for s in boards.iter() {
            let board = board(s);
            let mut solver = Solver::with_config(SearchConfig::default().with_shortcut(false));
            let start_time = Instant::now();
            let direction = solver.choose_move(&board)?;
            let finish_time = Instant::now();
            assert!(board.can_move(direction));
            times.push(finish_time - start_time);
            posis.push(solver.node_count);
        }

        println!(
            "Search:\nMean time: {:.6}ms, Mean no. of positions: {}, kpos/s: {}",
            (times.iter().sum::<Duration>() / times.len() as u32).as_secs_f64() * 1000.0,
            posis.iter().sum::<usize>() as f64 / posis.len() as f64,
            posis
                .iter()
                .zip(times.iter())
                .map(|(p, t)| *p as f64 / t.as_secs_f64().max(f64::EPSILON))
                .sum::<f64>()
                / (1000.0 * posis.len() as f64)
        );
        Ok(())
    }
}
