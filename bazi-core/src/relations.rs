//! Relationship enumeration.
//!
//! Given a chart and the enabled categories, produce every relationship among
//! its positions. Output order is fixed: stem pairs, branch pairs, triads,
//! then directionals, each walked in ascending position order. The verifier
//! relies on this order to break ties.

use crate::chart::Chart;
use crate::ganzhi::{Branch, Symbol};
use crate::rules::{
    self, BranchPattern, RelationKind, RuleKind, RuleSettings, DIRECTIONALS, TRIADS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Pillar index at which the luck and annual pillars begin.
pub const EXTENDED_PILLAR_START: usize = 4;

/// Categories evaluated per branch pair, in catalog order.
const BRANCH_PAIR_RULES: [(RuleKind, RelationKind); 5] = [
    (RuleKind::BranchSixHarmony, RelationKind::BranchSixHarmony),
    (RuleKind::BranchClash, RelationKind::BranchClash),
    (RuleKind::BranchPunishment, RelationKind::BranchPunishment),
    (RuleKind::BranchHarm, RelationKind::BranchHarm),
    (RuleKind::BranchDestruction, RelationKind::BranchDestruction),
];

/// One relationship found on a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(rename = "type")]
    pub kind: RelationKind,
    /// Chart positions, ascending.
    pub positions: Vec<usize>,
    /// Symbols at `positions`, in the same order.
    pub characters: Vec<Symbol>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_description: Option<String>,
    #[serde(alias = "points")]
    pub score: i32,
    /// Positions the player selected when this match was confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "actualPositions")]
    pub confirmed_positions: Option<Vec<usize>>,
}

impl Relationship {
    /// Positions used for comparison: the confirmed ones when present.
    pub fn effective_positions(&self) -> Vec<usize> {
        let mut positions = self
            .confirmed_positions
            .clone()
            .unwrap_or_else(|| self.positions.clone());
        positions.sort_unstable();
        positions
    }

    /// Deduplication key: type plus sorted positions.
    pub fn identity(&self) -> (RelationKind, Vec<usize>) {
        (self.kind, self.effective_positions())
    }

    /// Copy of this match marked as confirmed at `selection`.
    pub fn confirmed_at(&self, selection: &[usize]) -> Relationship {
        Relationship {
            confirmed_positions: Some(selection.to_vec()),
            ..self.clone()
        }
    }
}

/// Enumerates relationships under a fixed set of enabled categories.
#[derive(Debug, Clone, Default)]
pub struct RelationshipEngine {
    settings: RuleSettings,
}

impl RelationshipEngine {
    pub fn new(settings: RuleSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    /// All relationships on `chart`. Pure and deterministic.
    pub fn enumerate(&self, chart: &Chart) -> Vec<Relationship> {
        let extended = chart.mode.is_extended();
        let mut found = Vec::new();

        self.stem_pairs(chart, extended, &mut found);
        self.branch_pairs(chart, extended, &mut found);
        if self.settings.branch_triad {
            for pattern in &TRIADS {
                match_pattern(
                    chart,
                    pattern,
                    (RelationKind::BranchTriad, RelationKind::BranchHalfTriad),
                    "半合化",
                    extended,
                    &mut found,
                );
            }
        }
        if self.settings.branch_directional {
            for pattern in &DIRECTIONALS {
                match_pattern(
                    chart,
                    pattern,
                    (
                        RelationKind::BranchDirectional,
                        RelationKind::BranchHalfDirectional,
                    ),
                    "半会化",
                    extended,
                    &mut found,
                );
            }
        }

        tracing::debug!(
            pillars = chart.pillar_count(),
            relationships = found.len(),
            "enumerated chart relationships"
        );
        found
    }

    fn stem_pairs(&self, chart: &Chart, extended: bool, out: &mut Vec<Relationship>) {
        let combination = self.settings.stem_combination;
        let clash = self.settings.stem_clash;
        if !combination && !clash {
            return;
        }

        let stems = chart.stems();
        for i in 0..stems.len() {
            for j in (i + 1)..stems.len() {
                let (a, b) = (stems[i], stems[j]);
                let touches_extended = extended && j >= EXTENDED_PILLAR_START;

                if combination {
                    if let Some(combo) = rules::stem_combination(a, b) {
                        out.push(Relationship {
                            kind: RelationKind::StemCombination,
                            positions: vec![i, j],
                            characters: vec![a.into(), b.into()],
                            description: format!("{a}{b}合化{}", combo.element),
                            full_description: Some(combo.name.to_string()),
                            score: RelationKind::StemCombination.score(touches_extended),
                            confirmed_positions: None,
                        });
                    }
                }

                if clash && rules::is_stem_clash(a, b) {
                    out.push(fixed_description(
                        RelationKind::StemClash,
                        vec![i, j],
                        vec![a.into(), b.into()],
                        touches_extended,
                    ));
                }
            }
        }
    }

    fn branch_pairs(&self, chart: &Chart, extended: bool, out: &mut Vec<Relationship>) {
        let active: Vec<_> = BRANCH_PAIR_RULES
            .iter()
            .filter(|(rule, _)| self.settings.is_enabled(*rule))
            .collect();
        if active.is_empty() {
            return;
        }

        let branches = chart.branches();
        for i in 0..branches.len() {
            for j in (i + 1)..branches.len() {
                let (a, b) = (branches[i], branches[j]);
                let touches_extended = extended && j >= EXTENDED_PILLAR_START;
                let positions = vec![chart.branch_position(i), chart.branch_position(j)];

                for (rule, kind) in &active {
                    if !rules::branch_pair_matches(*rule, a, b) {
                        continue;
                    }
                    if *kind == RelationKind::BranchSixHarmony {
                        let description = match rules::six_harmony_element(a, b) {
                            Some(element) => format!("{a}{b}六合化{element}"),
                            None => format!("{a}{b}六合"),
                        };
                        out.push(Relationship {
                            kind: *kind,
                            positions: positions.clone(),
                            characters: vec![a.into(), b.into()],
                            description,
                            full_description: None,
                            score: kind.score(touches_extended),
                            confirmed_positions: None,
                        });
                    } else {
                        out.push(fixed_description(
                            *kind,
                            positions.clone(),
                            vec![a.into(), b.into()],
                            touches_extended,
                        ));
                    }
                }
            }
        }
    }
}

/// Enumerate `chart` under `settings`.
pub fn enumerate(chart: &Chart, settings: &RuleSettings) -> Vec<Relationship> {
    RelationshipEngine::new(*settings).enumerate(chart)
}

fn fixed_description(
    kind: RelationKind,
    positions: Vec<usize>,
    characters: Vec<Symbol>,
    touches_extended: bool,
) -> Relationship {
    Relationship {
        kind,
        positions,
        characters,
        description: kind.rule().entry().description.unwrap_or_default().to_string(),
        full_description: None,
        score: kind.score(touches_extended),
        confirmed_positions: None,
    }
}

/// Locate `pattern` among the chart's branch slots.
///
/// Each pattern branch takes the first slot holding it that no earlier
/// pattern branch has consumed. Returns `(slot, branch)` pairs sorted by slot.
pub fn locate_pattern(branches: &[Branch], pattern: &BranchPattern) -> Vec<(usize, Branch)> {
    let mut consumed = BTreeSet::new();
    for wanted in pattern.branches {
        let slot = branches
            .iter()
            .enumerate()
            .find(|(slot, branch)| **branch == wanted && !consumed.contains(slot))
            .map(|(slot, _)| slot);
        if let Some(slot) = slot {
            consumed.insert(slot);
        }
    }
    consumed.into_iter().map(|slot| (slot, branches[slot])).collect()
}

fn match_pattern(
    chart: &Chart,
    pattern: &BranchPattern,
    (full_kind, half_kind): (RelationKind, RelationKind),
    half_suffix: &str,
    extended: bool,
    out: &mut Vec<Relationship>,
) {
    let hits = locate_pattern(&chart.branches(), pattern);
    let touches_extended = extended && hits.iter().any(|(slot, _)| *slot >= EXTENDED_PILLAR_START);
    let positions: Vec<usize> = hits.iter().map(|(slot, _)| chart.branch_position(*slot)).collect();
    let characters: Vec<Symbol> = hits.iter().map(|(_, b)| Symbol::Branch(*b)).collect();

    let (kind, description) = match hits.len() {
        3 => (full_kind, pattern.name.to_string()),
        2 => {
            // Named in triad order; characters keep chart order.
            let chars: String = pattern
                .branches
                .iter()
                .filter(|b| hits.iter().any(|(_, hit)| hit == *b))
                .map(|b| b.as_char())
                .collect();
            (half_kind, format!("{chars}{half_suffix}{}", pattern.element))
        }
        _ => return,
    };

    out.push(Relationship {
        kind,
        positions,
        characters,
        description,
        full_description: None,
        score: kind.score(touches_extended),
        confirmed_positions: None,
    });
}
