//! Testing utilities for the relationship game.
//!
//! This module provides tools for deterministic tests:
//! - `seeded_rng` and `FixedClock` to pin down every source of randomness
//! - `chart_from_symbols` for building charts straight from characters
//! - `GameHarness` for scripted select-and-verify sessions
//! - Assertion helpers for verifier outcomes

pub use crate::calendar::FixedClock;
use crate::calendar::Calendar;
use crate::chart::{BirthDate, Chart, ChartMode, Provenance};
use crate::ganzhi::{Branch, Pillar, Stem};
use crate::relations::{Relationship, RelationshipEngine};
use crate::rules::{RelationKind, RuleSettings};
use crate::verify::{self, Progress, Selection, SelectionError, VerifyOutcome};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A reproducible RNG.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A calendar whose annual pillar always reads `year`.
pub fn fixed_calendar(year: i32) -> Calendar<FixedClock> {
    Calendar::new().with_clock(FixedClock(year))
}

fn pillars_from_symbols(stems: &str, branches: &str) -> Vec<Pillar> {
    let stems: Vec<Stem> = stems
        .chars()
        .map(|c| Stem::from_char(c).unwrap_or_else(|| panic!("not a stem: {c}")))
        .collect();
    let branches: Vec<Branch> = branches
        .chars()
        .map(|c| Branch::from_char(c).unwrap_or_else(|| panic!("not a branch: {c}")))
        .collect();
    assert_eq!(stems.len(), branches.len(), "stem and branch counts differ");
    stems
        .into_iter()
        .zip(branches)
        .map(|(s, b)| Pillar::new(s, b))
        .collect()
}

/// Build a basic chart from four stems and four branches, e.g.
/// `chart_from_symbols("甲己丙丁", "子丑寅卯")`.
#[track_caller]
pub fn chart_from_symbols(stems: &str, branches: &str) -> Chart {
    Chart::from_pillars(
        ChartMode::Basic,
        Provenance::Random,
        BirthDate::new(2000, 1, 1, 0),
        pillars_from_symbols(stems, branches),
    )
    .expect("basic chart needs four pillars")
}

/// Build an extended chart from six stems and six branches.
#[track_caller]
pub fn extended_chart_from_symbols(stems: &str, branches: &str) -> Chart {
    Chart::from_pillars(
        ChartMode::Extended,
        Provenance::Random,
        BirthDate::new(2000, 1, 1, 0),
        pillars_from_symbols(stems, branches),
    )
    .expect("extended chart needs six pillars")
}

/// Plays one game the way a client would: it owns the found set and sends
/// the full state to the verifier on every selection.
pub struct GameHarness {
    pub chart: Chart,
    pub catalog: Vec<Relationship>,
    pub found: Vec<Relationship>,
}

impl GameHarness {
    /// Start a game on `chart` with default rules.
    pub fn new(chart: Chart) -> Self {
        Self::with_settings(chart, RuleSettings::default())
    }

    pub fn with_settings(chart: Chart, settings: RuleSettings) -> Self {
        let catalog = RelationshipEngine::new(settings).enumerate(&chart);
        Self {
            chart,
            catalog,
            found: Vec::new(),
        }
    }

    /// Submit a selection. Confirmed matches join the found set.
    pub fn select(&mut self, positions: &[usize]) -> Result<VerifyOutcome, SelectionError> {
        let selection = Selection::on_chart(positions, &self.chart)?;
        let outcome = verify::verify(&selection, &self.catalog, &self.found);
        if let Some(relationship) = &outcome.relationship {
            self.found.push(relationship.clone());
        }
        Ok(outcome)
    }

    /// Select every catalog entry in order, returning how many were confirmed.
    pub fn play_through(&mut self) -> usize {
        let targets: Vec<Vec<usize>> = self.catalog.iter().map(|r| r.positions.clone()).collect();
        targets
            .iter()
            .filter(|positions| matches!(self.select(positions), Ok(o) if o.found))
            .count()
    }

    pub fn progress(&self) -> Progress {
        verify::progress(&self.catalog, &self.found)
    }

    pub fn count_of(&self, kind: RelationKind) -> usize {
        self.catalog.iter().filter(|r| r.kind == kind).count()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the outcome confirmed a relationship of `kind`.
#[track_caller]
pub fn assert_found(outcome: &VerifyOutcome, kind: RelationKind) {
    assert!(outcome.found, "Expected a match, got {:?}", outcome.message);
    let actual = outcome.relationship.as_ref().map(|r| r.kind);
    assert_eq!(actual, Some(kind), "Expected {kind}, got {actual:?}");
}

/// Assert the outcome confirmed nothing, with `message`.
#[track_caller]
pub fn assert_not_found(outcome: &VerifyOutcome, message: &str) {
    assert!(!outcome.found, "Expected no match, got {:?}", outcome.relationship);
    assert_eq!(outcome.message.as_deref(), Some(message));
}

/// Assert the catalog holds a `kind` match at exactly `positions`.
#[track_caller]
pub fn assert_has_relationship(catalog: &[Relationship], kind: RelationKind, positions: &[usize]) {
    assert!(
        catalog.iter().any(|r| r.kind == kind && r.positions == positions),
        "Expected {kind} at {positions:?} in {:?}",
        catalog
            .iter()
            .map(|r| (r.kind, r.positions.clone()))
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::{ALREADY_FOUND_MESSAGE, NO_MATCH_MESSAGE};

    #[test]
    fn test_harness_session() {
        let mut harness = GameHarness::new(chart_from_symbols("甲己丙丁", "子丑申午"));

        let outcome = harness.select(&[0, 1]).unwrap();
        assert_found(&outcome, RelationKind::StemCombination);
        assert_eq!(harness.found.len(), 1);

        let again = harness.select(&[1, 0]).unwrap();
        assert_not_found(&again, ALREADY_FOUND_MESSAGE);

        let miss = harness.select(&[2, 3]).unwrap();
        assert_not_found(&miss, NO_MATCH_MESSAGE);

        assert!(harness.select(&[0, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_play_through() {
        let mut harness = GameHarness::new(chart_from_symbols("甲庚丙辛", "寅午戌子"));
        let confirmed = harness.play_through();
        assert!(confirmed > 0);
        assert_eq!(harness.progress().found_count, confirmed);
    }

    #[test]
    fn test_fixed_calendar_is_reproducible() {
        let calendar = fixed_calendar(2024);
        let a = calendar.random_chart(ChartMode::Extended, &mut seeded_rng(5)).unwrap();
        let b = calendar.random_chart(ChartMode::Extended, &mut seeded_rng(5)).unwrap();
        assert_eq!(a, b);
    }
}
