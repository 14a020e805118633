#![cfg(target_arch = "wasm32")]

use arena_core::{
    apply_progression, check_winner, compute_ai_move, rank_table, record_match, resolve_rank,
    ArenaSession,
};
use serde_json::Value;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

fn board(cells: [Option<&str>; 9]) -> JsValue {
    serde_wasm_bindgen::to_value(&cells).expect("board to js")
}

fn parse(json: &str) -> Value {
    serde_json::from_str(json).expect("valid json")
}

#[wasm_bindgen_test]
fn check_winner_reports_top_row() {
    let x = Some("X");
    let o = Some("O");
    let outcome = check_winner(board([x, x, x, o, o, None, None, None, None])).expect("outcome");
    let outcome: Value = serde_wasm_bindgen::from_value(outcome).expect("outcome json");
    assert_eq!(outcome["type"], "Win");
    assert_eq!(outcome["winner"], "X");
}

#[wasm_bindgen_test]
fn compute_ai_move_completes_line() {
    let x = Some("X");
    let o = Some("O");
    let decision = compute_ai_move(
        board([x, x, None, o, o, None, None, None, None]),
        "X",
        Some("Advanced".to_string()),
        None,
    )
    .expect("decision");
    let decision: Value = serde_wasm_bindgen::from_value(decision).expect("decision json");
    assert_eq!(decision["index"], 2);
}

#[wasm_bindgen_test]
fn ranks_resolve_from_score() {
    assert_eq!(resolve_rank(0.0), "Easy");
    assert_eq!(resolve_rank(1499.0), "Advanced");
    assert_eq!(resolve_rank(6000.0), "Demigod");
    assert!(rank_table().is_ok());
}

#[wasm_bindgen_test]
fn record_match_creates_and_scores_player() {
    let response = record_match("", "ada", "win", "Single Player", None).expect("record");
    let response = parse(&response);
    assert_eq!(response["users"]["ada"]["score"], 100);
    assert_eq!(response["update"]["scoreDelta"], 100);
}

#[wasm_bindgen_test]
fn apply_progression_floors_at_zero() {
    let record = serde_wasm_bindgen::to_value(&serde_json::json!({
        "name": "ada",
        "score": 10,
        "preferredDifficulty": "Easy",
    }))
    .expect("record to js");
    let update = apply_progression(record, "loss", "Single Player", None).expect("update");
    let update: Value = serde_wasm_bindgen::from_value(update).expect("update json");
    assert_eq!(update["record"]["score"], 0);
    assert_eq!(update["record"]["lossesCount"], 1);
}

#[wasm_bindgen_test]
fn session_rejects_occupied_cell() {
    let mut session = ArenaSession::new("Two Player", "X", None, None).expect("session");
    session.play_move(4).expect("first move");
    assert!(session.play_move(4).is_err());

    let state = parse(&session.state_json().expect("state"));
    assert_eq!(state["next"], "O");
    assert_eq!(state["aiPending"], false);
}

#[wasm_bindgen_test]
async fn ai_replies_after_human_move() {
    let mut session = ArenaSession::new("Single Player", "X", Some(600), None).expect("session");
    session.set_think_time(0, 0);
    session.play_move(0).expect("human move");
    assert!(session.is_ai_turn());

    let reply = JsFuture::from(session.think_ai()).await.expect("ai move");
    let reply = parse(&reply.as_string().expect("json string"));
    assert_eq!(reply["decision"]["strategy"], "search");
    assert_eq!(reply["applied"]["next"], "X");

    let state = parse(&session.state_json().expect("state"));
    assert_eq!(state["aiPending"], false);
}

#[wasm_bindgen_test]
async fn reset_discards_thinking_ai() {
    let mut session = ArenaSession::new("Single Player", "O", None, None).expect("session");
    session.set_think_time(20, 20);
    let pending = session.think_ai();
    session.reset();

    assert!(JsFuture::from(pending).await.is_err());
    let state = parse(&session.state_json().expect("state"));
    assert_eq!(state["board"], Value::Array(vec![Value::Null; 9]));
    assert_eq!(state["epoch"], 1);
}
