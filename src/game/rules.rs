use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::state::{Board, MatchEvent, Outcome, Symbol, BOARD_SIZE};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GameMode {
    #[serde(rename = "Single Player")]
    SinglePlayer,
    #[serde(rename = "Two Player")]
    TwoPlayer,
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], " ").trim() {
            "single player" | "single" | "singleplayer" | "ai" => Ok(GameMode::SinglePlayer),
            "two player" | "two" | "twoplayer" | "multiplayer" | "local" => {
                Ok(GameMode::TwoPlayer)
            }
            _ => Err(()),
        }
    }
}

/// A finished match seen from one participant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
}

impl MatchResult {
    /// Result for `symbol` given a finished board outcome.
    pub fn for_symbol(outcome: Outcome, symbol: Symbol) -> Option<Self> {
        match outcome {
            Outcome::Ongoing => None,
            Outcome::Draw => Some(MatchResult::Draw),
            Outcome::Win { winner } if winner == symbol => Some(MatchResult::Win),
            Outcome::Win { .. } => Some(MatchResult::Loss),
        }
    }
}

impl FromStr for MatchResult {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "win" | "won" | "victory" => Ok(MatchResult::Win),
            "loss" | "lose" | "lost" | "defeat" => Ok(MatchResult::Loss),
            "draw" | "tie" => Ok(MatchResult::Draw),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("the match is already finished")]
    GameFinished,
    #[error("cell {index} is outside the board")]
    OutOfBounds { index: usize },
    #[error("cell {index} is already taken")]
    CellOccupied { index: usize },
    #[error("it is not the player's turn")]
    NotPlayerTurn,
    #[error("an AI move is already pending")]
    AiMovePending,
    #[error("this match has no AI opponent")]
    NoAiOpponent,
    #[error("the AI move belongs to a match that was reset or cancelled")]
    StaleTicket,
    #[error("the board has no empty cell")]
    NoMovesAvailable,
}

/// Board after a move plus the events it produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveResolution {
    pub board: Board,
    pub outcome: Outcome,
    pub next: Symbol,
    pub events: Vec<MatchEvent>,
}

/// Claim on the single AI move a session allows in flight.
///
/// The board is a snapshot; the move is only applied if the session has not
/// been reset since the ticket was issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiTicket {
    pub epoch: u64,
    pub board: Board,
    pub symbol: Symbol,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSession {
    mode: GameMode,
    /// Player one's mark. In single player the AI holds the other one.
    player_symbol: Symbol,
    board: Board,
    next: Symbol,
    outcome: Outcome,
    epoch: u64,
    pending_ai: Option<u64>,
    #[serde(default)]
    event_log: Vec<MatchEvent>,
}

impl MatchSession {
    pub fn new(mode: GameMode, player_symbol: Symbol) -> Self {
        Self {
            mode,
            player_symbol,
            board: Board::new(),
            next: Symbol::X,
            outcome: Outcome::Ongoing,
            epoch: 0,
            pending_ai: None,
            event_log: Vec::new(),
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn next(&self) -> Symbol {
        self.next
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn player_symbol(&self) -> Symbol {
        self.player_symbol
    }

    /// Events of the current match. A reset starts a new log.
    pub fn event_log(&self) -> &[MatchEvent] {
        &self.event_log
    }

    pub fn ai_symbol(&self) -> Option<Symbol> {
        match self.mode {
            GameMode::SinglePlayer => Some(self.player_symbol.opponent()),
            GameMode::TwoPlayer => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_finished()
    }

    pub fn is_ai_turn(&self) -> bool {
        !self.is_finished() && self.ai_symbol() == Some(self.next)
    }

    pub fn is_ai_pending(&self) -> bool {
        self.pending_ai.is_some()
    }

    /// Human move for whoever is to play.
    pub fn play(&mut self, index: usize) -> Result<MoveResolution, RuleError> {
        if self.is_finished() {
            return Err(RuleError::GameFinished);
        }
        if self.pending_ai.is_some() {
            return Err(RuleError::AiMovePending);
        }
        if self.is_ai_turn() {
            return Err(RuleError::NotPlayerTurn);
        }
        let symbol = self.next;
        self.apply_move(index, symbol)
    }

    pub fn begin_ai_turn(&mut self) -> Result<AiTicket, RuleError> {
        let symbol = self.ai_symbol().ok_or(RuleError::NoAiOpponent)?;
        if self.is_finished() {
            return Err(RuleError::GameFinished);
        }
        if self.pending_ai.is_some() {
            return Err(RuleError::AiMovePending);
        }
        if self.next != symbol {
            return Err(RuleError::NotPlayerTurn);
        }
        if self.board.available_moves().is_empty() {
            return Err(RuleError::NoMovesAvailable);
        }

        self.pending_ai = Some(self.epoch);
        debug!(epoch = self.epoch, board = %self.board, "AI turn started");
        Ok(AiTicket {
            epoch: self.epoch,
            board: self.board,
            symbol,
        })
    }

    /// Whether `ticket` still belongs to the pending AI turn of this match.
    pub fn holds_ticket(&self, ticket: &AiTicket) -> bool {
        ticket.epoch == self.epoch && self.pending_ai == Some(ticket.epoch)
    }

    pub fn complete_ai_turn(
        &mut self,
        ticket: &AiTicket,
        index: usize,
    ) -> Result<MoveResolution, RuleError> {
        if !self.holds_ticket(ticket) {
            warn!(
                ticket_epoch = ticket.epoch,
                epoch = self.epoch,
                "discarding stale AI move"
            );
            return Err(RuleError::StaleTicket);
        }
        self.pending_ai = None;
        self.apply_move(index, ticket.symbol)
    }

    /// Releases the ticket without moving. Returns false if it was already stale.
    pub fn cancel_ai_turn(&mut self, ticket: &AiTicket) -> bool {
        if !self.holds_ticket(ticket) {
            return false;
        }
        self.pending_ai = None;
        debug!(epoch = self.epoch, "AI turn cancelled");
        true
    }

    /// Starts a fresh match with the same seats. Outstanding tickets go stale.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.pending_ai = None;
        self.board = Board::new();
        self.next = Symbol::X;
        self.outcome = Outcome::Ongoing;
        self.event_log.clear();
        self.event_log.push(MatchEvent::MatchReset);
        debug!(epoch = self.epoch, "match reset");
    }

    /// Per-participant results of a finished match, keyed by symbol.
    ///
    /// Single player reports only the human seat.
    pub fn results(&self) -> Vec<(Symbol, MatchResult)> {
        let seats = match self.mode {
            GameMode::SinglePlayer => vec![self.player_symbol],
            GameMode::TwoPlayer => vec![self.player_symbol, self.player_symbol.opponent()],
        };
        seats
            .into_iter()
            .filter_map(|symbol| {
                MatchResult::for_symbol(self.outcome, symbol).map(|result| (symbol, result))
            })
            .collect()
    }

    fn apply_move(&mut self, index: usize, symbol: Symbol) -> Result<MoveResolution, RuleError> {
        if index >= BOARD_SIZE {
            return Err(RuleError::OutOfBounds { index });
        }
        if !self.board.is_empty_at(index) {
            return Err(RuleError::CellOccupied { index });
        }
        if symbol != self.next {
            return Err(RuleError::NotPlayerTurn);
        }

        self.board.place(index, symbol);
        let mut events = vec![MatchEvent::MovePlayed { symbol, index }];
        debug!(%symbol, index, board = %self.board, "move played");

        self.outcome = self.board.outcome();
        match self.outcome {
            Outcome::Win { winner } => {
                info!(%winner, "match won");
                events.push(MatchEvent::MatchWon { winner });
            }
            Outcome::Draw => {
                info!("match drawn");
                events.push(MatchEvent::MatchDrawn);
            }
            Outcome::Ongoing => {
                self.next = symbol.opponent();
            }
        }

        self.event_log.extend(events.iter().cloned());
        Ok(MoveResolution {
            board: self.board,
            outcome: self.outcome,
            next: self.next,
            events,
        })
    }
}
