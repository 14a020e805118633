pub mod ai;
pub mod game;
pub mod progression;
pub mod utils;

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;
use std::str::FromStr;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_json::Value;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{search_move, AiAgent, AiConfig, AiDecision, AiStrategy};
pub use game::{
    AiTicket, Board, GameMode, MatchEvent, MatchResult, MatchSession, MoveResolution, Outcome,
    RuleError, Symbol, BOARD_SIZE, LINES,
};
pub use progression::{
    ConfigError, Difficulty, DowngradeRules, InMemoryRecordStore, PlayerRecord,
    ProgressionConfig, ProgressionPolicy, ProgressionService, ProgressionUpdate, RankTable,
    RankThreshold, RecordStore, ScoreBonus, StoreError, TierPenalty,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging(tracing::Level::INFO);
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn to_js_error<E: Serialize + Display>(error: E) -> JsValue {
    to_js(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_arg<T: FromStr>(value: &str, what: &str) -> Result<T, JsValue> {
    value
        .parse()
        .map_err(|_| JsValue::from_str(&format!("unknown {what}: {value}")))
}

fn load_policy(config_json: Option<String>) -> Result<ProgressionPolicy, JsValue> {
    match config_json {
        Some(json) => ProgressionConfig::from_json(&json)
            .map(ProgressionPolicy::new)
            .map_err(to_js_error),
        None => Ok(ProgressionPolicy::default()),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSnapshot<'a> {
    mode: GameMode,
    board: &'a Board,
    next: Symbol,
    outcome: Outcome,
    player_symbol: Symbol,
    #[serde(skip_serializing_if = "Option::is_none")]
    ai_symbol: Option<Symbol>,
    ai_pending: bool,
    difficulty: Difficulty,
    strategy: AiStrategy,
    epoch: u64,
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    applied: MoveResolution,
}

#[derive(Serialize)]
struct StoreResponse<T: Serialize> {
    users: Value,
    update: T,
}

/// One match as seen by the UI: board, turns, the delayed AI and scoring.
#[wasm_bindgen]
pub struct ArenaSession {
    session: Rc<RefCell<MatchSession>>,
    config: AiConfig,
    difficulty: Difficulty,
}

#[wasm_bindgen]
impl ArenaSession {
    /// `difficulty` overrides the tier resolved from `score`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        mode: &str,
        player_symbol: &str,
        score: Option<u32>,
        difficulty: Option<String>,
    ) -> Result<ArenaSession, JsValue> {
        let mode: GameMode = parse_arg(mode, "game mode")?;
        let player_symbol: Symbol = parse_arg(player_symbol, "symbol")?;
        let difficulty = match difficulty.as_deref() {
            Some(value) => parse_arg(value, "difficulty")?,
            None => RankTable::standard().resolve(score.unwrap_or(0)),
        };

        Ok(ArenaSession {
            session: Rc::new(RefCell::new(MatchSession::new(mode, player_symbol))),
            config: AiConfig::from_difficulty(difficulty),
            difficulty,
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        let session = self.session.borrow();
        let snapshot = SessionSnapshot {
            mode: session.mode(),
            board: session.board(),
            next: session.next(),
            outcome: session.outcome(),
            player_symbol: session.player_symbol(),
            ai_symbol: session.ai_symbol(),
            ai_pending: session.is_ai_pending(),
            difficulty: self.difficulty,
            strategy: self.config.strategy,
            epoch: session.epoch(),
        };
        serde_json::to_string(&snapshot).map_err(serde_to_js_error)
    }

    pub fn set_think_time(&mut self, min_ms: u32, max_ms: u32) {
        self.config = self.config.clone().with_think_time(min_ms, max_ms);
    }

    pub fn is_ai_turn(&self) -> bool {
        self.session.borrow().is_ai_turn()
    }

    pub fn play_move(&mut self, index: usize) -> Result<String, JsValue> {
        let resolution = self
            .session
            .borrow_mut()
            .play(index)
            .map_err(to_js_error)?;
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }

    /// Resolves with the AI's move after a short randomized pause.
    ///
    /// Rejects with `StaleTicket` if the match was reset while waiting.
    pub fn think_ai(&self) -> Promise {
        let ticket = match self.session.borrow_mut().begin_ai_turn() {
            Ok(ticket) => ticket,
            Err(error) => return Promise::reject(&to_js_error(error)),
        };
        let mut agent = AiAgent::new(self.config.clone());
        let delay = agent.think_delay();
        let session = Rc::clone(&self.session);

        future_to_promise(async move {
            if !delay.is_zero() {
                TimeoutFuture::new(delay.as_millis() as u32).await;
            }
            if !session.borrow().holds_ticket(&ticket) {
                return Err(to_js_error(RuleError::StaleTicket));
            }
            let Some(decision) = agent.decide_move(&ticket.board, ticket.symbol) else {
                session.borrow_mut().cancel_ai_turn(&ticket);
                return Err(to_js_error(RuleError::NoMovesAvailable));
            };
            let applied = session
                .borrow_mut()
                .complete_ai_turn(&ticket, decision.index)
                .map_err(to_js_error)?;
            let json = serde_json::to_string(&AiMoveResponse { decision, applied })
                .map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    /// Rematch: clears the board and discards any AI move still thinking.
    pub fn reset(&mut self) {
        self.session.borrow_mut().reset();
    }

    pub fn results_json(&self) -> Result<String, JsValue> {
        let results: Vec<(Symbol, MatchResult)> = self.session.borrow().results();
        serde_json::to_string(&results).map_err(serde_to_js_error)
    }

    /// Applies the finished match to the users blob. Returns `{ users, update }`.
    pub fn record_result(
        &self,
        users_json: &str,
        player_one: &str,
        player_two: Option<String>,
        config_json: Option<String>,
    ) -> Result<String, JsValue> {
        let store = InMemoryRecordStore::from_json(users_json).map_err(to_js_error)?;
        let mut service = ProgressionService::new(store, load_policy(config_json)?);
        let updates = service
            .record_session(&self.session.borrow(), player_one, player_two.as_deref())
            .map_err(to_js_error)?;
        store_response(service.into_store(), updates)
    }
}

fn store_response<T: Serialize>(store: InMemoryRecordStore, update: T) -> Result<String, JsValue> {
    let users_json = store.to_json().map_err(to_js_error)?;
    let users: Value = serde_json::from_str(&users_json).map_err(serde_to_js_error)?;
    serde_json::to_string(&StoreResponse { users, update }).map_err(serde_to_js_error)
}

#[wasm_bindgen(js_name = "checkWinner")]
pub fn check_winner(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    to_js(&board.outcome())
}

#[wasm_bindgen(js_name = "availableMoves")]
pub fn available_moves(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    to_js(&board.available_moves())
}

/// Returns `null` when the board is already decided.
#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(
    board: JsValue,
    ai_symbol: &str,
    difficulty: Option<String>,
    strategy: Option<String>,
) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let ai_symbol: Symbol = parse_arg(ai_symbol, "symbol")?;
    let difficulty = difficulty
        .as_deref()
        .and_then(|value| Difficulty::from_str(value).ok())
        .unwrap_or(Difficulty::SECOND_LOWEST);
    let mut config = AiConfig::from_difficulty(difficulty);
    if let Some(strategy) = strategy
        .as_deref()
        .and_then(|value| AiStrategy::from_str(value).ok())
    {
        config = config.with_strategy(strategy);
    }
    let mut agent = AiAgent::new(config);
    to_js(&agent.decide_move(&board, ai_symbol))
}

#[wasm_bindgen(js_name = "resolveRank")]
pub fn resolve_rank(score: f64) -> String {
    RankTable::standard().resolve(score as u32).to_string()
}

#[wasm_bindgen(js_name = "rankTable")]
pub fn rank_table() -> Result<JsValue, JsValue> {
    to_js(RankTable::standard())
}

/// Pure policy step: record in, updated record out. Nothing is stored.
#[wasm_bindgen(js_name = "applyProgression")]
pub fn apply_progression(
    record: JsValue,
    result: &str,
    mode: &str,
    config_json: Option<String>,
) -> Result<JsValue, JsValue> {
    let record: PlayerRecord = from_value(record).map_err(JsValue::from)?;
    let result: MatchResult = parse_arg(result, "match result")?;
    let mode: GameMode = parse_arg(mode, "game mode")?;
    let policy = load_policy(config_json)?;
    to_js(&policy.apply(result, mode, &record))
}

/// Get-or-create `name` in the users blob and apply one result to it.
#[wasm_bindgen(js_name = "recordMatch")]
pub fn record_match(
    users_json: &str,
    name: &str,
    result: &str,
    mode: &str,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    let result: MatchResult = parse_arg(result, "match result")?;
    let mode: GameMode = parse_arg(mode, "game mode")?;
    let store = InMemoryRecordStore::from_json(users_json).map_err(to_js_error)?;
    let mut service = ProgressionService::new(store, load_policy(config_json)?);
    let update = service
        .record_match(name, result, mode)
        .map_err(to_js_error)?;
    store_response(service.into_store(), update)
}
