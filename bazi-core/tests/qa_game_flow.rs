//! QA tests for a full game driven through the request layer.
//!
//! Run with: `cargo test -p bazi-core --test qa_game_flow`

use bazi_core::testing::{chart_from_symbols, fixed_calendar, seeded_rng, FixedClock, GameHarness};
use bazi_core::verify::{ALREADY_FOUND_MESSAGE, NO_MATCH_MESSAGE};
use bazi_core::{Handler, Method, Operation, RelationKind, Relationship};
use rand::rngs::StdRng;
use serde_json::{json, Value};

fn handler() -> Handler<FixedClock, StdRng> {
    Handler::new(fixed_calendar(2024), seeded_rng(7))
}

fn post(handler: &mut Handler<FixedClock, StdRng>, op: Operation, body: Value) -> (u16, Value) {
    let response = handler.handle(Method::Post, op, &body.to_string());
    (response.status, response.body.unwrap_or(Value::Null))
}

fn sample_game() -> (Value, Vec<Relationship>) {
    let chart = chart_from_symbols("甲己丙丁", "子丑申午");
    let harness = GameHarness::new(chart.clone());
    (serde_json::to_value(chart).unwrap(), harness.catalog)
}

#[test]
fn test_new_game_random_and_dated() {
    let mut handler = handler();

    let (status, body) = post(&mut handler, Operation::NewGame, json!({"advancedMode": true}));
    assert_eq!(status, 200);
    assert_eq!(body["chart"]["mode"], "extended");
    assert_eq!(body["chart"]["provenance"], "random");
    assert_eq!(body["chart"]["pillars"].as_array().unwrap().len(), 6);
    assert_eq!(body["chart"]["currentYear"], 2024);

    let (status, body) = post(
        &mut handler,
        Operation::NewGame,
        json!({"birthDate": {"year": 1990, "month": 5, "day": 17, "hour": 14, "isFemale": true}}),
    );
    assert_eq!(status, 200);
    assert_eq!(body["chart"]["mode"], "basic");
    assert_eq!(body["chart"]["birth"]["isFemale"], true);
    assert_eq!(body["chart"]["pillars"].as_array().unwrap().len(), 4);
}

#[test]
fn test_seeded_handlers_agree() {
    let (_, a) = post(&mut handler(), Operation::NewGame, json!({"advancedMode": true}));
    let (_, b) = post(&mut handler(), Operation::NewGame, json!({"advancedMode": true}));
    assert_eq!(a, b);
}

#[test]
fn test_full_session() {
    let mut handler = handler();
    let (chart, catalog) = sample_game();
    let mut found: Vec<Relationship> = Vec::new();

    // Combination at [0,1], selected in reverse.
    let (status, body) = post(
        &mut handler,
        Operation::CheckRelationship,
        json!({"positions": [1, 0], "chart": chart, "allRelationships": catalog, "foundRelationships": found}),
    );
    assert_eq!(status, 200);
    assert_eq!(body["found"], true);
    assert_eq!(body["relationship"]["type"], "stem-combination");
    assert_eq!(body["relationship"]["confirmedPositions"], json!([0, 1]));
    found.push(serde_json::from_value(body["relationship"].clone()).unwrap());

    // Same positions again.
    let (_, body) = post(
        &mut handler,
        Operation::CheckRelationship,
        json!({"positions": [0, 1], "chart": chart, "allRelationships": catalog, "foundRelationships": found}),
    );
    assert_eq!(body["found"], false);
    assert_eq!(body["message"], ALREADY_FOUND_MESSAGE);

    // Nothing between 丙 and 丁.
    let (_, body) = post(
        &mut handler,
        Operation::CheckRelationship,
        json!({"positions": [2, 3], "chart": chart, "allRelationships": catalog, "foundRelationships": found}),
    );
    assert_eq!(body["found"], false);
    assert_eq!(body["message"], NO_MATCH_MESSAGE);

    let (_, hints) = post(
        &mut handler,
        Operation::Hints,
        json!({"allRelationships": catalog, "foundRelationships": found}),
    );
    assert_eq!(hints["totalRemaining"], catalog.len() - 1);
    assert!(hints["counts"].get("stem-combination").is_none());
    assert_eq!(hints["counts"]["branch-clash"], 1);

    let (_, reveal) = post(
        &mut handler,
        Operation::Reveal,
        json!({"allRelationships": catalog, "foundRelationships": found}),
    );
    assert_eq!(reveal["reveal"]["found"].as_array().unwrap().len(), 1);
    assert_eq!(reveal["reveal"]["unfound"].as_array().unwrap().len(), catalog.len() - 1);
    assert_eq!(reveal["progress"]["score"], 15);
    assert_eq!(reveal["progress"]["complete"], false);
}

#[test]
fn test_shared_positions_need_separate_selection() {
    // 子丑 at [4,5] is both a six harmony and a half directional. The first
    // confirmation blocks the second selection of the same positions.
    let mut harness = GameHarness::new(chart_from_symbols("甲己丙丁", "子丑申午"));
    assert_eq!(harness.count_of(RelationKind::BranchSixHarmony), 1);
    assert_eq!(harness.count_of(RelationKind::BranchHalfDirectional), 1);

    let first = harness.select(&[4, 5]).unwrap();
    assert_eq!(
        first.relationship.map(|r| r.kind),
        Some(RelationKind::BranchSixHarmony)
    );
    let second = harness.select(&[5, 4]).unwrap();
    assert_eq!(second.message.as_deref(), Some(ALREADY_FOUND_MESSAGE));
    assert!(!harness.progress().complete);
}

#[test]
fn test_four_positions_rejected() {
    let mut handler = handler();
    let (chart, catalog) = sample_game();
    let (status, body) = post(
        &mut handler,
        Operation::CheckRelationship,
        json!({"positions": [0, 1, 2, 3], "chart": chart, "allRelationships": catalog}),
    );
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("Invalid number of positions"));
}

#[test]
fn test_off_chart_and_malformed_requests() {
    let mut handler = handler();
    let (chart, catalog) = sample_game();

    let (status, _) = post(
        &mut handler,
        Operation::CheckRelationship,
        json!({"positions": [0, 8], "chart": chart, "allRelationships": catalog}),
    );
    assert_eq!(status, 400);

    let response = handler.handle(Method::Post, Operation::CheckRelationship, "{not json");
    assert_eq!(response.status, 400);

    let (status, _) = post(
        &mut handler,
        Operation::NewGame,
        json!({"birthDate": {"year": 2023, "month": 2, "day": 30}}),
    );
    assert_eq!(status, 400);
}

#[test]
fn test_preflight_and_unknown_operation() {
    let mut handler = handler();
    for op in Operation::all() {
        let response = handler.handle(Method::Options, op, "");
        assert_eq!(response.status, 200);
        assert!(response.body.is_none());
    }
    assert_eq!(handler.handle_raw("OPTIONS", "new_game", "").status, 200);
    assert_eq!(handler.handle_raw("POST", "fortune", "{}").status, 404);
}

#[test]
fn test_settings_operation() {
    let (status, body) = post(&mut handler(), Operation::Settings, Value::Null);
    assert_eq!(status, 200);
    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 9);
    assert_eq!(categories[0]["label"], "天干五合");
    assert_eq!(categories[0]["enabled"], true);
    assert_eq!(body["settings"]["branch_punishment"], false);
}

#[test]
fn test_play_through_completes() {
    let mut harness = GameHarness::new(chart_from_symbols("甲庚丙辛", "寅午戌子"));
    let total = harness.catalog.len();
    let confirmed = harness.play_through();
    assert_eq!(confirmed, total);
    assert!(harness.progress().complete);
}
