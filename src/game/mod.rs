//! Board evaluation and the match state machine.

pub mod rules;
pub mod state;

pub use rules::{AiTicket, GameMode, MatchResult, MatchSession, MoveResolution, RuleError};
pub use state::{Board, MatchEvent, Outcome, Symbol, BOARD_SIZE, LINES};

#[cfg(test)]
pub(crate) use state::board_from_str;
