//! Request/response operations.
//!
//! Each operation takes a JSON body and returns a [`Response`] carrying an
//! HTTP-style status. The transport in front of this module (a serverless
//! function, the headless binary, a test) only has to move strings around.
//!
//! # Example
//!
//! ```ignore
//! use bazi_core::api::{Handler, Method, Operation};
//!
//! let mut handler = Handler::from_entropy();
//! let response = handler.handle(Method::Post, Operation::NewGame, r#"{"advancedMode": true}"#);
//! assert_eq!(response.status, 200);
//! ```

use crate::calendar::{Calendar, CalendarError, Clock, SystemClock};
use crate::chart::{BirthDate, Chart, ChartError, ChartMode};
use crate::config::{ConfigError, EngineConfig};
use crate::relations::{Relationship, RelationshipEngine};
use crate::rules::{Domain, RuleError, RuleKind, RuleSettings};
use crate::verify::{self, Hints, Progress, Reveal, Selection, SelectionError, VerifyOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors surfaced at the request boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    InvalidDate(#[from] CalendarError),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation(_) | ApiError::InvalidDate(_) => 400,
            ApiError::UnknownOperation(_) => 404,
            ApiError::Internal(_) => 500,
        }
    }
}

impl From<SelectionError> for ApiError {
    fn from(err: SelectionError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<RuleError> for ApiError {
    fn from(err: RuleError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<ChartError> for ApiError {
    fn from(err: ChartError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

// ============================================================================
// Routing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    /// Cross-origin preflight; always answered with an empty 200.
    Options,
}

impl FromStr for Method {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(Method::Post),
            "OPTIONS" => Ok(Method::Options),
            other => Err(ApiError::Validation(format!("Unsupported method: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    NewGame,
    CheckRelationship,
    Hints,
    Reveal,
    Settings,
}

impl Operation {
    pub fn all() -> [Operation; 5] {
        [
            Operation::NewGame,
            Operation::CheckRelationship,
            Operation::Hints,
            Operation::Reveal,
            Operation::Settings,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::NewGame => "new_game",
            Operation::CheckRelationship => "check_relationship",
            Operation::Hints => "hints",
            Operation::Reveal => "reveal",
            Operation::Settings => "settings",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Operation {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('/').replace('-', "_");
        Operation::all()
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or(ApiError::UnknownOperation(s))
    }
}

/// A status plus an optional JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Response {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    pub fn preflight() -> Self {
        Self {
            status: 200,
            body: None,
        }
    }

    pub fn error(err: &ApiError) -> Self {
        let message = match err {
            // Internal detail stays in the logs.
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        Self {
            status: err.status(),
            body: Some(json!({ "error": message })),
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameRequest {
    #[serde(default, alias = "advanced_mode")]
    pub advanced_mode: bool,
    #[serde(default)]
    pub settings: RuleSettings,
    #[serde(default, alias = "birth_date")]
    pub birth_date: Option<BirthDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameResponse {
    pub chart: Chart,
    pub all_relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRelationshipRequest {
    #[serde(default)]
    pub positions: Option<Vec<usize>>,
    #[serde(default)]
    pub chart: Option<Chart>,
    #[serde(default, alias = "all_relationships")]
    pub all_relationships: Vec<Relationship>,
    #[serde(default, alias = "found_relationships")]
    pub found_relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(default, alias = "all_relationships")]
    pub all_relationships: Vec<Relationship>,
    #[serde(default, alias = "found_relationships")]
    pub found_relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealResponse {
    pub reveal: Reveal,
    pub progress: Progress,
}

/// One category as shown in a settings screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub key: String,
    pub label: String,
    pub arity: u8,
    pub domain: Domain,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub settings: RuleSettings,
    pub categories: Vec<CategoryInfo>,
}

// ============================================================================
// Operations
// ============================================================================

/// Generate a chart (from the birth date if given, otherwise at random) and
/// its full relationship catalog.
pub fn new_game<C: Clock, R: Rng>(
    request: &NewGameRequest,
    calendar: &Calendar<C>,
    rng: &mut R,
) -> Result<NewGameResponse, ApiError> {
    let mode = ChartMode::from_advanced(request.advanced_mode);
    let chart = match &request.birth_date {
        Some(birth) => calendar.derive_chart(birth, mode, rng)?,
        None => calendar.random_chart(mode, rng)?,
    };
    let all_relationships = RelationshipEngine::new(request.settings).enumerate(&chart);
    tracing::info!(
        chart = %chart,
        relationships = all_relationships.len(),
        "new game"
    );
    Ok(NewGameResponse {
        chart,
        all_relationships,
    })
}

/// Verify a selection against the caller's catalog and found set.
pub fn check_relationship(request: &CheckRelationshipRequest) -> Result<VerifyOutcome, ApiError> {
    let (positions, chart) = match (&request.positions, &request.chart) {
        (Some(positions), Some(chart)) if !positions.is_empty() => (positions, chart),
        _ => {
            return Err(ApiError::Validation(
                "Missing required data: chart and positions.".to_string(),
            ))
        }
    };
    chart.validate()?;
    let selection = Selection::on_chart(positions, chart)?;
    Ok(verify::verify(
        &selection,
        &request.all_relationships,
        &request.found_relationships,
    ))
}

pub fn hints(request: &SessionRequest) -> Hints {
    verify::hints(&request.all_relationships, &request.found_relationships)
}

pub fn reveal(request: &SessionRequest) -> RevealResponse {
    RevealResponse {
        reveal: verify::reveal(&request.all_relationships, &request.found_relationships),
        progress: verify::progress(&request.all_relationships, &request.found_relationships),
    }
}

pub fn settings() -> SettingsResponse {
    let settings = RuleSettings::default();
    let categories = RuleKind::all()
        .into_iter()
        .map(|kind| {
            let entry = kind.entry();
            CategoryInfo {
                key: kind.key().to_string(),
                label: kind.label().to_string(),
                arity: entry.arity,
                domain: entry.domain,
                enabled: settings.is_enabled(kind),
            }
        })
        .collect();
    SettingsResponse {
        settings,
        categories,
    }
}

fn parse_body<T: DeserializeOwned + Default>(body: &str) -> Result<T, ApiError> {
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(body).map_err(|e| ApiError::Validation(format!("Malformed request: {e}")))
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Routes requests to operations. Owns the calendar and random source so
/// every request draws from the same injected generator.
pub struct Handler<C: Clock = SystemClock, R: Rng = StdRng> {
    calendar: Calendar<C>,
    rng: R,
}

impl Handler<SystemClock, StdRng> {
    /// Wall clock, OS-seeded RNG, default configuration.
    pub fn from_entropy() -> Self {
        Self::new(Calendar::new(), StdRng::from_entropy())
    }

    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(Calendar::new().with_config(config)?, StdRng::from_entropy()))
    }

    /// Wall clock with a fixed RNG seed, for replayable sessions.
    pub fn from_seed(config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        Ok(Self::new(
            Calendar::new().with_config(config)?,
            StdRng::seed_from_u64(seed),
        ))
    }
}

impl<C: Clock, R: Rng> Handler<C, R> {
    pub fn new(calendar: Calendar<C>, rng: R) -> Self {
        Self { calendar, rng }
    }

    /// Handle one request. Never panics on bad input; every failure becomes
    /// an error response.
    pub fn handle(&mut self, method: Method, operation: Operation, body: &str) -> Response {
        if method == Method::Options {
            return Response::preflight();
        }
        match self.dispatch(operation, body) {
            Ok(value) => Response::ok(value),
            Err(err) => {
                match &err {
                    ApiError::Internal(detail) => {
                        tracing::error!(operation = %operation, detail = %detail, "request failed")
                    }
                    other => tracing::warn!(operation = %operation, error = %other, "request rejected"),
                }
                Response::error(&err)
            }
        }
    }

    /// Parse the route and method from strings, then handle.
    pub fn handle_raw(&mut self, method: &str, operation: &str, body: &str) -> Response {
        let route = method
            .parse::<Method>()
            .and_then(|m| operation.parse::<Operation>().map(|op| (m, op)));
        match route {
            Ok((method, operation)) => self.handle(method, operation, body),
            Err(err) => {
                tracing::warn!(error = %err, "unroutable request");
                Response::error(&err)
            }
        }
    }

    fn dispatch(&mut self, operation: Operation, body: &str) -> Result<Value, ApiError> {
        match operation {
            Operation::NewGame => {
                let request: NewGameRequest = parse_body(body)?;
                to_body(&new_game(&request, &self.calendar, &mut self.rng)?)
            }
            Operation::CheckRelationship => {
                let request: CheckRelationshipRequest = parse_body(body)?;
                to_body(&check_relationship(&request)?)
            }
            Operation::Hints => {
                let request: SessionRequest = parse_body(body)?;
                to_body(&hints(&request))
            }
            Operation::Reveal => {
                let request: SessionRequest = parse_body(body)?;
                to_body(&reveal(&request))
            }
            Operation::Settings => to_body(&settings()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixed_calendar, seeded_rng};

    fn handler() -> Handler<crate::calendar::FixedClock, StdRng> {
        Handler::new(fixed_calendar(2024), seeded_rng(42))
    }

    #[test]
    fn test_preflight() {
        let response = handler().handle(Method::Options, Operation::CheckRelationship, "garbage");
        assert_eq!(response, Response::preflight());
    }

    #[test]
    fn test_routing() {
        assert_eq!("/new-game".parse::<Operation>().unwrap(), Operation::NewGame);
        assert_eq!("options".parse::<Method>().unwrap(), Method::Options);
        let response = handler().handle_raw("POST", "horoscope", "{}");
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_new_game_from_birth_date() {
        let body = r#"{"advancedMode": false, "birthDate": {"year": 1984, "month": 2, "day": 4, "hour": 0}}"#;
        let response = handler().handle(Method::Post, Operation::NewGame, body);
        assert_eq!(response.status, 200);
        let body = response.body.unwrap();
        assert_eq!(body["chart"]["provenance"], "date");
        assert_eq!(body["chart"]["pillars"][2]["stem"], "甲");
        assert_eq!(body["chart"]["pillars"][2]["branch"], "子");
        assert!(body["allRelationships"].is_array());
    }

    #[test]
    fn test_new_game_invalid_date() {
        let body = r#"{"birthDate": {"year": 2023, "month": 13, "day": 1}}"#;
        let response = handler().handle(Method::Post, Operation::NewGame, body);
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_new_game_unknown_setting() {
        let body = r#"{"settings": {"地支暗合": true}}"#;
        let response = handler().handle(Method::Post, Operation::NewGame, body);
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_check_requires_chart() {
        let response = handler().handle(Method::Post, Operation::CheckRelationship, r#"{"positions": [0, 1]}"#);
        assert_eq!(response.status, 400);
        assert_eq!(
            response.body.unwrap()["error"],
            "Missing required data: chart and positions."
        );
    }

    #[test]
    fn test_settings_listing() {
        let response = handler().handle(Method::Post, Operation::Settings, "");
        let body = response.body.unwrap();
        assert_eq!(body["categories"].as_array().unwrap().len(), 9);
        assert_eq!(body["settings"]["branch_harm"], false);
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let response = Response::error(&ApiError::Internal("stack trace".to_string()));
        assert_eq!(response.status, 500);
        assert_eq!(response.body.unwrap()["error"], "Internal server error");
    }

    #[test]
    fn test_constructors_reject_bad_config() {
        let inverted = EngineConfig::default().with_random_years(2020, 1950);
        assert!(Handler::from_seed(inverted.clone(), 1).is_err());
        assert!(Handler::from_config(inverted).is_err());

        let mut handler = Handler::from_seed(EngineConfig::default().with_luck_steps(4, 4), 1).unwrap();
        let response = handler.handle(Method::Post, Operation::NewGame, r#"{"advancedMode": true}"#);
        assert_eq!(response.status, 200);
        assert_eq!(response.body.unwrap()["chart"]["luckSteps"], 4);
    }
}
