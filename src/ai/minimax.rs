use std::str::FromStr;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::{Board, Symbol, BOARD_SIZE};
use crate::progression::Difficulty;

pub const WIN_SCORE: i32 = 10;
pub const LOSS_SCORE: i32 = -10;
pub const TIE_SCORE: i32 = 0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiStrategy {
    Random,
    Search,
}

impl FromStr for AiStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(AiStrategy::Random),
            "search" | "minimax" => Ok(AiStrategy::Search),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    pub strategy: AiStrategy,
    pub min_think_ms: u32,
    pub max_think_ms: u32,
}

impl AiConfig {
    /// The lowest tier plays at random; every other tier searches the full tree.
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        let strategy = if difficulty == Difficulty::LOWEST {
            AiStrategy::Random
        } else {
            AiStrategy::Search
        };
        Self {
            strategy,
            min_think_ms: 80,
            max_think_ms: 150,
        }
    }

    pub fn with_strategy(mut self, strategy: AiStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_think_time(mut self, min_ms: u32, max_ms: u32) -> Self {
        self.min_think_ms = min_ms.min(max_ms);
        self.max_think_ms = min_ms.max(max_ms);
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(Difficulty::SECOND_LOWEST)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AiDecision {
    pub index: usize,
    pub strategy: AiStrategy,
    /// Minimax value of the chosen cell. Absent for random play.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<i32>,
    pub nodes: u64,
    pub depth_reached: u8,
}

#[derive(Debug, Default)]
struct SearchStats {
    nodes: u64,
    depth_reached: u8,
}

/// Exhaustive minimax choice for `ai_symbol`, ties going to the lowest index.
///
/// Returns `None` when the board has no empty cell.
pub fn search_move(board: &Board, ai_symbol: Symbol) -> Option<usize> {
    search_root(board, ai_symbol, &mut SearchStats::default()).map(|(index, _)| index)
}

fn search_root(board: &Board, ai: Symbol, stats: &mut SearchStats) -> Option<(usize, i32)> {
    let opponent = ai.opponent();
    let mut scratch = *board;
    let mut best: Option<(usize, i32)> = None;

    for index in board.available_moves() {
        scratch.place(index, ai);
        let score = minimax_rec(&mut scratch, 0, false, ai, opponent, stats);
        scratch.clear(index);

        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }
    best
}

fn minimax_rec(
    board: &mut Board,
    depth: i32,
    maximizing: bool,
    ai: Symbol,
    opponent: Symbol,
    stats: &mut SearchStats,
) -> i32 {
    stats.nodes += 1;
    stats.depth_reached = stats.depth_reached.max(depth as u8);

    match board.winner() {
        Some(winner) if winner == ai => return WIN_SCORE - depth,
        Some(_) => return LOSS_SCORE + depth,
        None => {}
    }
    if board.is_full() {
        return TIE_SCORE;
    }

    let (symbol, mut value) = if maximizing {
        (ai, i32::MIN)
    } else {
        (opponent, i32::MAX)
    };
    for index in 0..BOARD_SIZE {
        if !board.is_empty_at(index) {
            continue;
        }
        board.place(index, symbol);
        let score = minimax_rec(board, depth + 1, !maximizing, ai, opponent, stats);
        board.clear(index);

        value = if maximizing {
            value.max(score)
        } else {
            value.min(score)
        };
    }
    value
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Uniformly random empty cell.
    pub fn random_move(&mut self, board: &Board) -> Option<usize> {
        board.available_moves().choose(&mut self.rng).copied()
    }

    pub fn search_move(&self, board: &Board, ai_symbol: Symbol) -> Option<usize> {
        search_move(board, ai_symbol)
    }

    /// Cosmetic pause before the move is shown. Has no bearing on the choice.
    pub fn think_delay(&mut self) -> Duration {
        let low = self.config.min_think_ms.min(self.config.max_think_ms);
        let high = self.config.min_think_ms.max(self.config.max_think_ms);
        Duration::from_millis(u64::from(self.rng.gen_range(low..=high)))
    }

    /// Picks a move with the configured strategy. `None` once the match is over.
    pub fn decide_move(&mut self, board: &Board, ai_symbol: Symbol) -> Option<AiDecision> {
        if board.outcome().is_finished() {
            return None;
        }

        let decision = match self.config.strategy {
            AiStrategy::Random => {
                let index = self.random_move(board)?;
                AiDecision {
                    index,
                    strategy: AiStrategy::Random,
                    evaluation: None,
                    nodes: 1,
                    depth_reached: 0,
                }
            }
            AiStrategy::Search => {
                let mut stats = SearchStats::default();
                let (index, score) = search_root(board, ai_symbol, &mut stats)?;
                AiDecision {
                    index,
                    strategy: AiStrategy::Search,
                    evaluation: Some(score),
                    nodes: stats.nodes,
                    depth_reached: stats.depth_reached,
                }
            }
        };

        debug!(
            symbol = %ai_symbol,
            index = decision.index,
            strategy = ?decision.strategy,
            evaluation = ?decision.evaluation,
            nodes = decision.nodes,
            "AI move chosen"
        );
        Some(decision)
    }
}
