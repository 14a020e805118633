use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of cells on the 3x3 board.
pub const BOARD_SIZE: usize = 9;

/// Rows, columns and diagonals, as row-major cell indices.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A player's mark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    pub fn opponent(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }
}

impl FromStr for Symbol {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Symbol::X),
            "O" => Ok(Symbol::O),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::X => f.write_str("X"),
            Symbol::O => f.write_str("O"),
        }
    }
}

/// Board verdict derived from a snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Outcome {
    Ongoing,
    Win { winner: Symbol },
    Draw,
}

impl Outcome {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Outcome::Ongoing)
    }
}

/// Nine cells in row-major order. `None` is an empty cell.
///
/// Serializes as the UI's board array: `["X", null, "O", ...]`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Board {
    cells: [Option<Symbol>; BOARD_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Option<Symbol>; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    /// Returns `None` for empty cells and for indices past the board.
    pub fn get(&self, index: usize) -> Option<Symbol> {
        self.cells.get(index).copied().flatten()
    }

    pub fn is_empty_at(&self, index: usize) -> bool {
        index < BOARD_SIZE && self.cells[index].is_none()
    }

    /// Writes `symbol` into `index`. Callers check bounds and occupancy.
    pub(crate) fn place(&mut self, index: usize, symbol: Symbol) {
        self.cells[index] = Some(symbol);
    }

    pub(crate) fn clear(&mut self, index: usize) {
        self.cells[index] = None;
    }

    pub fn count(&self, symbol: Symbol) -> usize {
        self.cells
            .iter()
            .filter(|cell| **cell == Some(symbol))
            .count()
    }

    /// The symbol occupying a complete line, if any.
    pub fn winner(&self) -> Option<Symbol> {
        for [a, b, c] in LINES {
            if let Some(symbol) = self.cells[a] {
                if self.cells[b] == Some(symbol) && self.cells[c] == Some(symbol) {
                    return Some(symbol);
                }
            }
        }
        None
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn outcome(&self) -> Outcome {
        if let Some(winner) = self.winner() {
            Outcome::Win { winner }
        } else if self.is_full() {
            Outcome::Draw
        } else {
            Outcome::Ongoing
        }
    }

    /// Empty cell indices in ascending order.
    pub fn available_moves(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| index)
            .collect()
    }

    /// Whose turn it is on a board that alternated starting with X.
    pub fn next_symbol(&self) -> Symbol {
        if self.count(Symbol::X) > self.count(Symbol::O) {
            Symbol::O
        } else {
            Symbol::X
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(3) {
            for cell in row {
                match cell {
                    Some(symbol) => write!(f, "{symbol}")?,
                    None => f.write_str(".")?,
                }
            }
            f.write_str("/")?;
        }
        Ok(())
    }
}

/// Everything that happened to a match, in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum MatchEvent {
    MovePlayed { symbol: Symbol, index: usize },
    MatchWon { winner: Symbol },
    MatchDrawn,
    MatchReset,
}

/// Parses a compact board string such as `"XX.OO...."`, for tests and fixtures.
#[cfg(test)]
pub(crate) fn board_from_str(layout: &str) -> Board {
    let mut cells = [None; BOARD_SIZE];
    for (index, ch) in layout.chars().filter(|c| !c.is_whitespace()).enumerate() {
        cells[index] = match ch {
            'X' => Some(Symbol::X),
            'O' => Some(Symbol::O),
            _ => None,
        };
    }
    Board::from_cells(cells)
}
