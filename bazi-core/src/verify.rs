//! Selection verification and session summaries.
//!
//! The verifier is stateless: the caller sends the full catalog and the
//! relationships it has already confirmed on every request. It only reads the
//! catalog's shape, never re-enumerates the chart.

use crate::chart::Chart;
use crate::relations::Relationship;
use crate::rules::RelationKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

pub const ALREADY_FOUND_MESSAGE: &str = "This relationship has already been found.";
pub const NO_MATCH_MESSAGE: &str = "No valid relationship found for the selection.";

/// Errors from validating a selection. These are client errors, distinct from
/// a selection that simply matches nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Invalid number of positions selected: {0} (expected 2 or 3)")]
    Arity(usize),
    #[error("Position {0} selected more than once")]
    Duplicate(usize),
    #[error("Position {position} is off the chart (limit {limit})")]
    OutOfRange { position: usize, limit: usize },
}

/// A validated, ascending set of 2 or 3 chart positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection(Vec<usize>);

impl Selection {
    /// Validate arity and distinctness. Does not check chart bounds.
    pub fn new(positions: &[usize]) -> Result<Self, SelectionError> {
        if !(2..=3).contains(&positions.len()) {
            return Err(SelectionError::Arity(positions.len()));
        }
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(SelectionError::Duplicate(pair[0]));
        }
        Ok(Self(sorted))
    }

    /// Validate and additionally require every position to lie on `chart`.
    pub fn on_chart(positions: &[usize], chart: &Chart) -> Result<Self, SelectionError> {
        let selection = Self::new(positions)?;
        let limit = chart.position_count();
        if let Some(&position) = selection.0.iter().find(|&&p| p >= limit) {
            return Err(SelectionError::OutOfRange { position, limit });
        }
        Ok(selection)
    }

    pub fn positions(&self) -> &[usize] {
        &self.0
    }
}

/// Result of checking a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<Relationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerifyOutcome {
    fn hit(relationship: Relationship) -> Self {
        Self {
            found: true,
            relationship: Some(relationship),
            message: None,
        }
    }

    fn miss(message: &str) -> Self {
        Self {
            found: false,
            relationship: None,
            message: Some(message.to_string()),
        }
    }
}

/// Check `selection` against `catalog`, skipping anything in `found`.
///
/// A position set already present in `found` is rejected regardless of type.
/// Otherwise the first catalog entry (in catalog order) with the same
/// position set and an unconfirmed identity wins.
pub fn verify(selection: &Selection, catalog: &[Relationship], found: &[Relationship]) -> VerifyOutcome {
    let wanted = selection.positions();

    if found.iter().any(|r| r.effective_positions() == wanted) {
        tracing::debug!(positions = ?wanted, "selection already discovered");
        return VerifyOutcome::miss(ALREADY_FOUND_MESSAGE);
    }

    let confirmed: HashSet<(RelationKind, Vec<usize>)> = found.iter().map(|r| r.identity()).collect();
    let hit = catalog.iter().find(|candidate| {
        let identity = candidate.identity();
        identity.1 == wanted && !confirmed.contains(&identity)
    });

    match hit {
        Some(relationship) => {
            tracing::debug!(positions = ?wanted, kind = %relationship.kind, "selection matched");
            VerifyOutcome::hit(relationship.confirmed_at(wanted))
        }
        None => {
            tracing::debug!(positions = ?wanted, "selection matched nothing");
            VerifyOutcome::miss(NO_MATCH_MESSAGE)
        }
    }
}

fn unfound<'a>(
    catalog: &'a [Relationship],
    found: &[Relationship],
) -> impl Iterator<Item = &'a Relationship> {
    let confirmed: HashSet<(RelationKind, Vec<usize>)> = found.iter().map(|r| r.identity()).collect();
    catalog.iter().filter(move |r| !confirmed.contains(&r.identity()))
}

/// Remaining relationships per type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hints {
    pub counts: BTreeMap<RelationKind, usize>,
    pub total_remaining: usize,
}

pub fn hints(catalog: &[Relationship], found: &[Relationship]) -> Hints {
    let mut counts = BTreeMap::new();
    let mut total_remaining = 0;
    for relationship in unfound(catalog, found) {
        *counts.entry(relationship.kind).or_insert(0) += 1;
        total_remaining += 1;
    }
    Hints {
        counts,
        total_remaining,
    }
}

/// Score and completion for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub score: i32,
    pub found_count: usize,
    pub total_count: usize,
    pub remaining: usize,
    pub complete: bool,
}

pub fn progress(catalog: &[Relationship], found: &[Relationship]) -> Progress {
    let remaining = unfound(catalog, found).count();
    Progress {
        score: found.iter().map(|r| r.score).sum(),
        found_count: found.len(),
        total_count: catalog.len(),
        remaining,
        complete: remaining == 0,
    }
}

/// The catalog split into confirmed and outstanding matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    /// The caller's confirmed copies, in catalog order.
    pub found: Vec<Relationship>,
    pub unfound: Vec<Relationship>,
}

pub fn reveal(catalog: &[Relationship], found: &[Relationship]) -> Reveal {
    let by_identity: BTreeMap<(RelationKind, Vec<usize>), &Relationship> =
        found.iter().map(|r| (r.identity(), r)).collect();

    let mut result = Reveal {
        found: Vec::new(),
        unfound: Vec::new(),
    };
    for relationship in catalog {
        match by_identity.get(&relationship.identity()) {
            Some(confirmed) => result.found.push((*confirmed).clone()),
            None => result.unfound.push(relationship.clone()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::enumerate;
    use crate::rules::RuleSettings;
    use crate::testing::chart_from_symbols;

    fn catalog() -> Vec<Relationship> {
        // 甲己 combination [0,1], 子丑 harmony [4,5], 子午 clash [4,7],
        // 子申 half triad [4,6], 子丑 half directional [4,5].
        let chart = chart_from_symbols("甲己丙丁", "子丑申午");
        enumerate(&chart, &RuleSettings::default())
    }

    #[test]
    fn test_selection_arity() {
        assert_eq!(Selection::new(&[1]), Err(SelectionError::Arity(1)));
        assert_eq!(Selection::new(&[0, 1, 2, 3]), Err(SelectionError::Arity(4)));
        assert_eq!(Selection::new(&[3, 3]), Err(SelectionError::Duplicate(3)));
        assert_eq!(Selection::new(&[5, 1]).unwrap().positions(), &[1, 5]);
    }

    #[test]
    fn test_selection_bounds() {
        let chart = chart_from_symbols("甲己丙丁", "子丑申午");
        assert_eq!(
            Selection::on_chart(&[0, 8], &chart),
            Err(SelectionError::OutOfRange { position: 8, limit: 8 })
        );
        assert!(Selection::on_chart(&[0, 7], &chart).is_ok());
    }

    #[test]
    fn test_verify_hit() {
        let catalog = catalog();
        let outcome = verify(&Selection::new(&[1, 0]).unwrap(), &catalog, &[]);
        assert!(outcome.found);
        let relationship = outcome.relationship.unwrap();
        assert_eq!(relationship.kind, RelationKind::StemCombination);
        assert_eq!(relationship.confirmed_positions, Some(vec![0, 1]));
    }

    #[test]
    fn test_verify_rejects_found_positions() {
        let catalog = catalog();
        let first = verify(&Selection::new(&[4, 5]).unwrap(), &catalog, &[]);
        let confirmed = first.relationship.unwrap();

        let again = verify(&Selection::new(&[5, 4]).unwrap(), &catalog, &[confirmed]);
        assert!(!again.found);
        assert_eq!(again.message.as_deref(), Some(ALREADY_FOUND_MESSAGE));
    }

    #[test]
    fn test_found_positions_block_any_type() {
        // A found entry at [4,6] blocks the selection even with an unrelated type.
        let mut blocker = catalog()[0].clone();
        blocker.confirmed_positions = Some(vec![6, 4]);
        let outcome = verify(&Selection::new(&[4, 6]).unwrap(), &catalog(), &[blocker]);
        assert!(!outcome.found);
        assert_eq!(outcome.message.as_deref(), Some(ALREADY_FOUND_MESSAGE));
    }

    #[test]
    fn test_verify_miss() {
        let outcome = verify(&Selection::new(&[2, 3]).unwrap(), &catalog(), &[]);
        assert!(!outcome.found);
        assert_eq!(outcome.message.as_deref(), Some(NO_MATCH_MESSAGE));
        assert!(outcome.relationship.is_none());
    }

    #[test]
    fn test_first_catalog_entry_wins() {
        let mut catalog = catalog();
        let mut twin = catalog[0].clone();
        twin.kind = RelationKind::StemClash;
        twin.score = 99;
        catalog.push(twin);

        let outcome = verify(&Selection::new(&[0, 1]).unwrap(), &catalog, &[]);
        assert_eq!(outcome.relationship.unwrap().kind, RelationKind::StemCombination);
    }

    #[test]
    fn test_hints_and_progress() {
        let catalog = catalog();
        let total = catalog.len();
        let confirmed = verify(&Selection::new(&[0, 1]).unwrap(), &catalog, &[])
            .relationship
            .unwrap();
        let found = vec![confirmed.clone()];

        let hints = hints(&catalog, &found);
        assert_eq!(hints.total_remaining, total - 1);
        assert!(!hints.counts.contains_key(&RelationKind::StemCombination));

        let progress = progress(&catalog, &found);
        assert_eq!(progress.score, confirmed.score);
        assert_eq!(progress.found_count, 1);
        assert_eq!(progress.remaining, total - 1);
        assert!(!progress.complete);

        let reveal = reveal(&catalog, &found);
        assert_eq!(reveal.found, vec![confirmed]);
        assert_eq!(reveal.unfound.len(), total - 1);
    }

    #[test]
    fn test_progress_complete() {
        let catalog = catalog();
        let found: Vec<_> = catalog.iter().map(|r| r.confirmed_at(&r.positions)).collect();
        let progress = progress(&catalog, &found);
        assert!(progress.complete);
        assert_eq!(progress.score, catalog.iter().map(|r| r.score).sum::<i32>());
    }
}
