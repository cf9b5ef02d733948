//! Charts: the ordered pillars a game is played on.
//!
//! A chart with `N` pillars exposes `2N` selectable positions. Positions
//! `0..N` are the stems of each pillar, positions `N..2N` the branches of the
//! same pillars.

use crate::ganzhi::{Branch, Pillar, Stem, Symbol};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from constructing or validating a chart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("{mode} chart needs {expected} pillars, found {found}")]
    PillarCount {
        mode: ChartMode,
        expected: usize,
        found: usize,
    },
}

/// Basic charts carry the four natal pillars; extended charts add the luck
/// and annual pillars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    #[default]
    Basic,
    Extended,
}

impl ChartMode {
    pub fn from_advanced(advanced: bool) -> Self {
        if advanced {
            ChartMode::Extended
        } else {
            ChartMode::Basic
        }
    }

    pub fn pillar_count(&self) -> usize {
        match self {
            ChartMode::Basic => 4,
            ChartMode::Extended => 6,
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, ChartMode::Extended)
    }
}

impl fmt::Display for ChartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartMode::Basic => write!(f, "basic"),
            ChartMode::Extended => write!(f, "extended"),
        }
    }
}

/// Where a chart's birth data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Derived from a caller-supplied date.
    Date,
    /// Synthesized from the random source.
    Random,
}

/// Birth data a chart is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(default)]
    pub hour: u32,
    #[serde(default)]
    pub is_female: bool,
}

impl BirthDate {
    pub fn new(year: i32, month: u32, day: u32, hour: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            is_female: false,
        }
    }
}

/// Names of the pillar slots, in chart order.
pub const PILLAR_NAMES: [&str; 6] = ["year", "month", "day", "hour", "luck", "annual"];

/// An immutable game chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub mode: ChartMode,
    pub provenance: Provenance,
    pub birth: BirthDate,
    /// Year, month, day, hour, then luck and annual for extended charts.
    pub pillars: Vec<Pillar>,
    /// Year the annual pillar was read for. Wall-clock dependent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_year: Option<i32>,
    /// Steps walked from the month pillar to reach the luck pillar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub luck_steps: Option<u32>,
}

impl Chart {
    /// Build a chart from explicit pillars, checking the count against `mode`.
    pub fn from_pillars(
        mode: ChartMode,
        provenance: Provenance,
        birth: BirthDate,
        pillars: Vec<Pillar>,
    ) -> Result<Self, ChartError> {
        let chart = Self {
            mode,
            provenance,
            birth,
            pillars,
            current_year: None,
            luck_steps: None,
        };
        chart.validate()?;
        Ok(chart)
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        let expected = self.mode.pillar_count();
        if self.pillars.len() != expected {
            return Err(ChartError::PillarCount {
                mode: self.mode,
                expected,
                found: self.pillars.len(),
            });
        }
        Ok(())
    }

    pub fn pillar_count(&self) -> usize {
        self.pillars.len()
    }

    /// Number of selectable positions (stems plus branches).
    pub fn position_count(&self) -> usize {
        self.pillars.len() * 2
    }

    pub fn stems(&self) -> Vec<Stem> {
        self.pillars.iter().map(|p| p.stem).collect()
    }

    pub fn branches(&self) -> Vec<Branch> {
        self.pillars.iter().map(|p| p.branch).collect()
    }

    /// Position of the branch belonging to pillar `index`.
    pub fn branch_position(&self, index: usize) -> usize {
        index + self.pillars.len()
    }

    /// Symbol shown at `position`, if it is on the chart.
    pub fn symbol_at(&self, position: usize) -> Option<Symbol> {
        let n = self.pillars.len();
        if position < n {
            Some(Symbol::Stem(self.pillars[position].stem))
        } else {
            self.pillars.get(position - n).map(|p| Symbol::Branch(p.branch))
        }
    }

    /// Human-readable birth moment, e.g. `1990年5月12日8时`.
    pub fn date_info(&self) -> String {
        format!(
            "{}年{}月{}日{}时",
            self.birth.year, self.birth.month, self.birth.day, self.birth.hour
        )
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pillars: Vec<String> = self
            .pillars
            .iter()
            .zip(PILLAR_NAMES)
            .map(|(p, name)| format!("{name}:{p}"))
            .collect();
        write!(f, "{} [{}]", self.date_info(), pillars.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chart() -> Chart {
        let pillars = ["甲子", "丙寅", "戊辰", "庚午"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        Chart::from_pillars(
            ChartMode::Basic,
            Provenance::Date,
            BirthDate::new(1984, 2, 4, 0),
            pillars,
        )
        .unwrap()
    }

    #[test]
    fn test_position_addressing() {
        let chart = sample_chart();
        assert_eq!(chart.position_count(), 8);
        assert_eq!(chart.symbol_at(0), Some(Symbol::Stem(Stem::Jia)));
        assert_eq!(chart.symbol_at(3), Some(Symbol::Stem(Stem::Geng)));
        assert_eq!(chart.symbol_at(4), Some(Symbol::Branch(Branch::Zi)));
        assert_eq!(chart.symbol_at(7), Some(Symbol::Branch(Branch::Wu)));
        assert_eq!(chart.symbol_at(8), None);
        assert_eq!(chart.branch_position(2), 6);
    }

    #[test]
    fn test_pillar_count_must_match_mode() {
        let err = Chart::from_pillars(
            ChartMode::Extended,
            Provenance::Random,
            BirthDate::new(2000, 1, 1, 0),
            vec![Pillar::from_offset(0); 4],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ChartError::PillarCount {
                mode: ChartMode::Extended,
                expected: 6,
                found: 4
            }
        );
    }

    #[test]
    fn test_date_info() {
        assert_eq!(sample_chart().date_info(), "1984年2月4日0时");
    }

    #[test]
    fn test_chart_json_shape() {
        let json = serde_json::to_value(sample_chart()).unwrap();
        assert_eq!(json["mode"], "basic");
        assert_eq!(json["provenance"], "date");
        assert_eq!(json["pillars"][0]["stem"], "甲");
        assert_eq!(json["birth"]["isFemale"], false);
        assert!(json.get("currentYear").is_none());
    }
}
