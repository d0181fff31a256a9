/// Tic Tac Toe game interface.
use std::fmt;

use crate::error::{Error, Result};
use crate::game_state::GameState;

use Cell::{Empty, Full};
use Player::{O, X};

pub const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Used for deciding whose turn it is. X goes first.
#[derive(Eq, Hash, Clone, Copy, Debug, PartialEq)]
pub enum Player {
    X,
    O,
}

impl Player {
    pub fn get_opponent(self) -> Player {
        match self {
            X => O,
            O => X,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            X => write!(f, "X"),
            O => write!(f, "O"),
        }
    }
}

/// Represents a single cell of the tic-tac-toe board.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Full(Player),
}

/// The information needed to place a mark on the board: (row, col). The mark itself belongs to
/// whoever's turn it is.
pub type TicTacToeMove = (usize, usize);

/// Store the size and state of the tic-tac-toe board.
#[derive(Clone, PartialEq)]
pub struct TicTacToeBoard {
    // dimension of the board (total number of cells = size * size)
    pub size: usize,
    // for example: 3x3 grid would be a vec of length 9
    pub cells: Vec<Cell>,
    // who gets to make the next move?
    to_move: Player,
    // set as soon as a line is completed
    winner: Option<Player>,
}

impl fmt::Debug for TicTacToeBoard {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let mut board_repr = String::new();
        for cell in self.cells.iter() {
            let cell_repr = match cell {
                Empty => '.',
                Full(X) => 'X',
                Full(O) => 'O',
            };
            board_repr.push(cell_repr);
        }
        write!(
            formatter,
            "TicTacToeBoard {{ size: {}, cells: [{}], to_move: {:?}, winner: {:?} }}",
            self.size, board_repr, self.to_move, self.winner,
        )
    }
}

/// Print the board with the column and row labels:
///
///   abc
/// 0 X..
/// 1 .O.
/// 2 ...
///
/// Row labels widen with the number of digits; boards wider than the alphabet are printed
/// without column labels.
impl fmt::Display for TicTacToeBoard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // row labels are padded to the widest one plus a space
        let label_width = self.size.saturating_sub(1).to_string().len() + 1;
        if self.size <= ALPHABET.len() {
            writeln!(f, "{:width$}{}", "", &ALPHABET[..self.size], width = label_width)?;
        }
        for i in 0..self.size {
            write!(f, "{:<width$}", i, width = label_width)?;
            for j in 0..self.size {
                let c = match &self.cells[i * self.size + j] {
                    Empty => '.',
                    Full(X) => 'X',
                    Full(O) => 'O',
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl GameState for TicTacToeBoard {
    type Player = Player;
    type Action = TicTacToeMove;

    fn active_player(&self) -> Player {
        self.to_move
    }

    /// Return a vector of (row, col) legal moves the active player can choose.
    fn legal_actions(&self) -> Vec<TicTacToeMove> {
        if self.winner.is_some() {
            return vec![];
        }
        let mut valid_moves = Vec::new();
        for (i, cell) in self.cells.iter().enumerate() {
            if let Empty = cell {
                valid_moves.push((i / self.size, i % self.size));
            }
        }
        valid_moves
    }

    fn is_terminal(&self) -> bool {
        self.winner.is_some() || self.is_full()
    }

    /// +1 for a win, -1 for a loss, 0 for a draw. Unfinished boards are scored by how many lines
    /// are still open to `player` versus their opponent, scaled to stay strictly inside (-1, 1).
    fn utility(&self, player: Player) -> f64 {
        match self.winner {
            Some(winner) if winner == player => 1.,
            Some(_) => -1.,
            None if self.is_full() => 0.,
            None => {
                let open = self.open_lines(player) as f64;
                let opp_open = self.open_lines(player.get_opponent()) as f64;
                (open - opp_open) / (self.num_lines() + 1) as f64
            }
        }
    }

    fn get_next_state(&self, move_: &TicTacToeMove) -> TicTacToeBoard {
        let &(row, col) = move_;
        let player = self.to_move;
        let mut next = self.clone();
        next.cells[row * self.size + col] = Full(player);
        if next.move_wins_game(row, col, player) {
            next.winner = Some(player);
        }
        next.to_move = player.get_opponent();
        next
    }

    fn get_winner(&self) -> Option<Player> {
        self.winner
    }
}

/// Representation of an N-dimensional tic-tac-toe board.
impl TicTacToeBoard {
    /// Return a new Board of (size * size) cells.
    pub fn new(size: usize) -> TicTacToeBoard {
        TicTacToeBoard {
            cells: vec![Empty; size * size],
            size,
            to_move: X,
            winner: None,
        }
    }

    /// Build a board from rows of `X`, `O` and `.` characters, e.g. `["XX.", "OO.", "..."]`.
    /// Whose turn it is follows from the piece counts, since X always moves first.
    pub fn from_rows(rows: &[&str]) -> Result<TicTacToeBoard> {
        let size = rows.len();
        if size == 0 {
            return Err(invalid_board("no rows"));
        }

        let mut cells = Vec::with_capacity(size * size);
        for (r, row) in rows.iter().enumerate() {
            let chars: Vec<char> = row.chars().collect();
            if chars.len() != size {
                return Err(invalid_board(format!(
                    "row {} has {} cells, expected {}",
                    r,
                    chars.len(),
                    size
                )));
            }
            for c in chars {
                cells.push(match c {
                    'X' | 'x' => Full(X),
                    'O' | 'o' => Full(O),
                    '.' => Empty,
                    other => return Err(invalid_board(format!("unexpected character '{}'", other))),
                });
            }
        }

        let x_count = cells.iter().filter(|&&c| c == Full(X)).count();
        let o_count = cells.iter().filter(|&&c| c == Full(O)).count();
        let to_move = if x_count == o_count {
            X
        } else if x_count == o_count + 1 {
            O
        } else {
            return Err(invalid_board(format!(
                "piece counts X={}, O={} (X must be equal or one ahead)",
                x_count, o_count
            )));
        };

        let mut board = TicTacToeBoard {
            size,
            cells,
            to_move,
            winner: None,
        };
        let x_wins = board.has_line(X);
        let o_wins = board.has_line(O);
        board.winner = match (x_wins, o_wins) {
            (true, true) => return Err(invalid_board("both players have a line")),
            (true, false) => Some(X),
            (false, true) => Some(O),
            (false, false) => None,
        };
        // the winner must have made the last move, nothing is played after a win
        if let Some(winner) = board.winner {
            if winner == board.to_move {
                return Err(invalid_board(format!(
                    "{} has a line but play continued after it",
                    winner
                )));
            }
        }

        Ok(board)
    }

    fn is_full(&self) -> bool {
        !self.cells.contains(&Empty)
    }

    /// Rows, columns and both diagonals.
    fn num_lines(&self) -> usize {
        2 * self.size + 2
    }

    /// Number of lines that contain none of the opponent's marks.
    fn open_lines(&self, player: Player) -> usize {
        let blocked_by = Full(player.get_opponent());
        let size = self.size;
        let line_is_open = |filter_fn: &dyn Fn(usize) -> bool| {
            !(0..size * size).any(|i| filter_fn(i) && self.cells[i] == blocked_by)
        };

        let mut open = 0;
        for k in 0..size {
            if line_is_open(&|i| i / size == k) {
                open += 1;
            }
            if line_is_open(&|i| i % size == k) {
                open += 1;
            }
        }
        if line_is_open(&|i| i % size == i / size) {
            open += 1;
        }
        if line_is_open(&|i| (i % size) + (i / size) == size - 1) {
            open += 1;
        }
        open
    }

    /// Return if the line defined by the filter_fn is filled with cells of type player.
    fn player_fills_line(&self, player: Player, filter_fn: &dyn Fn(usize) -> bool) -> bool {
        let mut player_count = 0;
        for i in 0..self.size * self.size {
            if filter_fn(i) {
                if let Full(p) = self.cells[i] {
                    if p == player {
                        player_count += 1;
                    }
                }
            }
        }

        player_count == self.size
    }

    /// Does player own any complete line anywhere on the board?
    fn has_line(&self, player: Player) -> bool {
        (0..self.size).any(|k| self.move_wins_game(k, k, player))
            || self.move_wins_game(0, self.size - 1, player)
    }

    /// Did the last move played at (row, col) by player win the game?
    fn move_wins_game(&self, row: usize, col: usize, player: Player) -> bool {
        // check row
        if self.player_fills_line(player, &|i| i / self.size == row) {
            return true;
        }

        // check col
        if self.player_fills_line(player, &|i| i % self.size == col) {
            return true;
        }

        // check \ diag
        if row == col && self.player_fills_line(player, &|i| i % self.size == i / self.size) {
            return true;
        }

        // check / diag
        if row + col == self.size - 1
            && self.player_fills_line(player, &|i| {
                (i % self.size) + (i / self.size) == self.size - 1
            })
        {
            return true;
        }

        false
    }
}

fn invalid_board(reason: impl Into<String>) -> Error {
    Error::InvalidBoard {
        reason: reason.into(),
    }
}

#[test]
fn test_player_fills_line() {
    let size = 3;
    // col
    let mut board = TicTacToeBoard::new(size);
    for i in 0..size {
        board.cells[i * board.size] = Full(X);
    }
    assert!(board.player_fills_line(X, &|i| i % board.size == 0));
    assert!(!board.player_fills_line(O, &|i| i % board.size == 0));

    // row
    let mut board = TicTacToeBoard::new(size);
    for i in 0..size {
        board.cells[i] = Full(X);
    }
    assert!(board.player_fills_line(X, &|i| i / board.size == 0));

    // diag \
    let mut board = TicTacToeBoard::new(size);
    for i in 0..size {
        board.cells[i * board.size + i] = Full(X);
    }
    assert!(board.player_fills_line(X, &|i| i % board.size == i / board.size));

    // diag /
    let mut board = TicTacToeBoard::new(size);
    for i in 0..size {
        board.cells[board.size + i * board.size - i - 1] = Full(X);
    }
    assert!(
        board.player_fills_line(X, &|i| (i % board.size) + (i / board.size) == board.size - 1)
    );
}

#[test]
fn test_get_next_state() {
    let size = 3;
    let board = TicTacToeBoard::new(size);
    assert_eq!(board.active_player(), X);
    assert_eq!(board.legal_actions().len(), size * size);

    let next = board.get_next_state(&(1, 1));
    assert_eq!(next.active_player(), O);
    assert_eq!(next.legal_actions().len(), size * size - 1);
    assert!(!next.legal_actions().contains(&(1, 1)));

    // the receiver is untouched
    assert_eq!(board.cells, vec![Empty; size * size]);
    assert_eq!(board.active_player(), X);

    let next = next.get_next_state(&(1, 2));
    assert_eq!(next.active_player(), X);
    assert_eq!(next.cells[5], Full(O));
    assert!(!next.is_terminal());
}

#[test]
fn test_win_and_draw() {
    let board = TicTacToeBoard::from_rows(&["XX.", "OO.", "..."]).unwrap();
    assert_eq!(board.active_player(), X);
    let won = board.get_next_state(&(0, 2));
    assert!(won.is_terminal());
    assert_eq!(won.get_winner(), Some(X));
    assert!(won.legal_actions().is_empty());
    assert_eq!(won.utility(X), 1.);
    assert_eq!(won.utility(O), -1.);

    let board = TicTacToeBoard::from_rows(&["XOX", "XOO", "OX."]).unwrap();
    let drawn = board.get_next_state(&(2, 2));
    assert!(drawn.is_terminal());
    assert_eq!(drawn.get_winner(), None);
    assert_eq!(drawn.utility(X), 0.);
    assert_eq!(drawn.utility(O), 0.);
}

#[test]
fn test_from_rows_rejects_bad_boards() {
    assert!(TicTacToeBoard::from_rows(&[]).is_err());
    assert!(TicTacToeBoard::from_rows(&["XX", "OO."]).is_err());
    assert!(TicTacToeBoard::from_rows(&["X?.", "...", "..."]).is_err());
    assert!(TicTacToeBoard::from_rows(&["XX.", "...", "..."]).is_err());
    assert!(TicTacToeBoard::from_rows(&["XXX", "OOO", "X.."]).is_err());

    let board = TicTacToeBoard::from_rows(&["XXX", "OO.", "..."]).unwrap();
    assert_eq!(board.get_winner(), Some(X));
    assert!(board.is_terminal());
    let board = TicTacToeBoard::from_rows(&["OOO", "XX.", "X.."]).unwrap();
    assert_eq!(board.get_winner(), Some(O));
}

#[test]
fn test_from_rows_rejects_moves_after_a_win() {
    // O moved after X completed the top row
    match TicTacToeBoard::from_rows(&["XXX", "OO.", "O.."]) {
        Err(Error::InvalidBoard { reason }) => assert!(reason.contains("X has a line")),
        other => panic!("unexpected {:?}", other),
    }
    // X moved after O completed the top row
    assert!(TicTacToeBoard::from_rows(&["OOO", "XX.", "XX."]).is_err());
}

#[test]
fn test_heuristic_utility() {
    let empty = TicTacToeBoard::new(3);
    assert_eq!(empty.utility(X), 0.);

    let center = empty.get_next_state(&(1, 1));
    let corner = empty.get_next_state(&(0, 0));
    let edge = empty.get_next_state(&(0, 1));
    assert!(center.utility(X) > corner.utility(X));
    assert!(corner.utility(X) > edge.utility(X));
    assert!(edge.utility(X) > 0.);
    assert_eq!(center.utility(O), -center.utility(X));
    assert!(center.utility(X) < 1.);
}

#[test]
fn test_display() {
    let board = TicTacToeBoard::from_rows(&["X..", ".O.", "..."]).unwrap();
    assert_eq!(board.to_string(), "  abc\n0 X..\n1 .O.\n2 ...\n");

    let wide = TicTacToeBoard::new(11).get_next_state(&(10, 0)).to_string();
    let lines: Vec<&str> = wide.lines().collect();
    assert_eq!(lines.len(), 12);
    assert_eq!(lines[0], "   abcdefghijk");
    assert_eq!(lines[1], "0  ...........");
    assert_eq!(lines[11], "10 X..........");
}
