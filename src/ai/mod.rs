//! Move selection: uniform random play and exhaustive minimax.

pub mod minimax;

pub use minimax::{search_move, AiAgent, AiConfig, AiDecision, AiStrategy};
