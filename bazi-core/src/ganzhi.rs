//! Heavenly stems, earthly branches, and the pillars built from them.
//!
//! Both alphabets are cyclic: every index operation wraps with a true
//! (Euclidean) modulo so negative offsets land in the positive residue range.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a stem or branch character.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("Unknown heavenly stem: {0}")]
    UnknownStem(String),
    #[error("Unknown earthly branch: {0}")]
    UnknownBranch(String),
}

// ============================================================================
// Elements
// ============================================================================

/// The five elements a combination can transform into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    #[serde(rename = "木")]
    Wood,
    #[serde(rename = "火")]
    Fire,
    #[serde(rename = "土")]
    Earth,
    #[serde(rename = "金")]
    Metal,
    #[serde(rename = "水")]
    Water,
}

impl Element {
    pub fn as_char(&self) -> char {
        match self {
            Element::Wood => '木',
            Element::Fire => '火',
            Element::Earth => '土',
            Element::Metal => '金',
            Element::Water => '水',
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// ============================================================================
// Heavenly Stems
// ============================================================================

/// The ten heavenly stems (天干).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stem {
    #[serde(rename = "甲")]
    Jia,
    #[serde(rename = "乙")]
    Yi,
    #[serde(rename = "丙")]
    Bing,
    #[serde(rename = "丁")]
    Ding,
    #[serde(rename = "戊")]
    Wu,
    #[serde(rename = "己")]
    Ji,
    #[serde(rename = "庚")]
    Geng,
    #[serde(rename = "辛")]
    Xin,
    #[serde(rename = "壬")]
    Ren,
    #[serde(rename = "癸")]
    Gui,
}

impl Stem {
    pub const COUNT: usize = 10;

    pub fn all() -> [Stem; 10] {
        use Stem::*;
        [Jia, Yi, Bing, Ding, Wu, Ji, Geng, Xin, Ren, Gui]
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Stem at `index`, wrapping around the cycle in either direction.
    pub fn from_index(index: i64) -> Stem {
        Stem::all()[index.rem_euclid(Self::COUNT as i64) as usize]
    }

    /// Even-indexed stems are yang.
    pub fn is_yang(&self) -> bool {
        self.index() % 2 == 0
    }

    pub fn shift(&self, steps: i64) -> Stem {
        Stem::from_index(self.index() as i64 + steps)
    }

    pub fn as_char(&self) -> char {
        match self {
            Stem::Jia => '甲',
            Stem::Yi => '乙',
            Stem::Bing => '丙',
            Stem::Ding => '丁',
            Stem::Wu => '戊',
            Stem::Ji => '己',
            Stem::Geng => '庚',
            Stem::Xin => '辛',
            Stem::Ren => '壬',
            Stem::Gui => '癸',
        }
    }

    pub fn from_char(c: char) -> Option<Stem> {
        Stem::all().into_iter().find(|s| s.as_char() == c)
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Stem {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Stem::from_char(c).ok_or_else(|| SymbolError::UnknownStem(s.to_string()))
            }
            _ => Err(SymbolError::UnknownStem(s.to_string())),
        }
    }
}

// ============================================================================
// Earthly Branches
// ============================================================================

/// The twelve earthly branches (地支).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Branch {
    #[serde(rename = "子")]
    Zi,
    #[serde(rename = "丑")]
    Chou,
    #[serde(rename = "寅")]
    Yin,
    #[serde(rename = "卯")]
    Mao,
    #[serde(rename = "辰")]
    Chen,
    #[serde(rename = "巳")]
    Si,
    #[serde(rename = "午")]
    Wu,
    #[serde(rename = "未")]
    Wei,
    #[serde(rename = "申")]
    Shen,
    #[serde(rename = "酉")]
    You,
    #[serde(rename = "戌")]
    Xu,
    #[serde(rename = "亥")]
    Hai,
}

impl Branch {
    pub const COUNT: usize = 12;

    pub fn all() -> [Branch; 12] {
        use Branch::*;
        [Zi, Chou, Yin, Mao, Chen, Si, Wu, Wei, Shen, You, Xu, Hai]
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Branch at `index`, wrapping around the cycle in either direction.
    pub fn from_index(index: i64) -> Branch {
        Branch::all()[index.rem_euclid(Self::COUNT as i64) as usize]
    }

    pub fn shift(&self, steps: i64) -> Branch {
        Branch::from_index(self.index() as i64 + steps)
    }

    pub fn as_char(&self) -> char {
        match self {
            Branch::Zi => '子',
            Branch::Chou => '丑',
            Branch::Yin => '寅',
            Branch::Mao => '卯',
            Branch::Chen => '辰',
            Branch::Si => '巳',
            Branch::Wu => '午',
            Branch::Wei => '未',
            Branch::Shen => '申',
            Branch::You => '酉',
            Branch::Xu => '戌',
            Branch::Hai => '亥',
        }
    }

    pub fn from_char(c: char) -> Option<Branch> {
        Branch::all().into_iter().find(|b| b.as_char() == c)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Branch {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Branch::from_char(c).ok_or_else(|| SymbolError::UnknownBranch(s.to_string()))
            }
            _ => Err(SymbolError::UnknownBranch(s.to_string())),
        }
    }
}

// ============================================================================
// Symbols and Pillars
// ============================================================================

/// A single chart symbol: either a stem or a branch.
///
/// Serialized as its bare character; stems and branches share no characters,
/// so the untagged form round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Symbol {
    Stem(Stem),
    Branch(Branch),
}

impl Symbol {
    pub fn as_char(&self) -> char {
        match self {
            Symbol::Stem(s) => s.as_char(),
            Symbol::Branch(b) => b.as_char(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl From<Stem> for Symbol {
    fn from(stem: Stem) -> Self {
        Symbol::Stem(stem)
    }
}

impl From<Branch> for Symbol {
    fn from(branch: Branch) -> Self {
        Symbol::Branch(branch)
    }
}

/// One stem-branch pair labelling a year, month, day, or two-hour block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pillar {
    pub stem: Stem,
    pub branch: Branch,
}

impl Pillar {
    pub fn new(stem: Stem, branch: Branch) -> Self {
        Self { stem, branch }
    }

    /// Pillar whose stem and branch indices are `offset` reduced mod 10 and
    /// mod 12 respectively.
    pub fn from_offset(offset: i64) -> Self {
        Self {
            stem: Stem::from_index(offset),
            branch: Branch::from_index(offset),
        }
    }

    /// Walk both alphabets `steps` positions together (negative walks back).
    pub fn shift(&self, steps: i64) -> Self {
        Self {
            stem: self.stem.shift(steps),
            branch: self.branch.shift(steps),
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.stem, self.branch)
    }
}

impl FromStr for Pillar {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let stem = chars
            .next()
            .and_then(Stem::from_char)
            .ok_or_else(|| SymbolError::UnknownStem(s.to_string()))?;
        let branch = chars
            .next()
            .and_then(Branch::from_char)
            .ok_or_else(|| SymbolError::UnknownBranch(s.to_string()))?;
        if chars.next().is_some() {
            return Err(SymbolError::UnknownBranch(s.to_string()));
        }
        Ok(Pillar::new(stem, branch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_index_wraps_negative() {
        assert_eq!(Stem::from_index(-1), Stem::Gui);
        assert_eq!(Branch::from_index(-1), Branch::Hai);
        assert_eq!(Stem::from_index(23), Stem::Ding);
        assert_eq!(Branch::from_index(25), Branch::Chou);
    }

    #[test]
    fn test_yang_stems() {
        assert!(Stem::Jia.is_yang());
        assert!(!Stem::Yi.is_yang());
        assert!(Stem::Ren.is_yang());
    }

    #[test]
    fn test_pillar_shift() {
        let pillar = Pillar::new(Stem::Bing, Branch::Yin);
        assert_eq!(pillar.shift(2).to_string(), "戊辰");
        assert_eq!(pillar.shift(-3).to_string(), "癸亥");
    }

    #[test]
    fn test_parse_pillar() {
        let pillar: Pillar = "甲子".parse().unwrap();
        assert_eq!(pillar, Pillar::from_offset(0));
        assert!("子甲".parse::<Pillar>().is_err());
        assert!("甲子丑".parse::<Pillar>().is_err());
    }

    #[test]
    fn test_symbol_serializes_as_character() {
        let json = serde_json::to_string(&vec![
            Symbol::Stem(Stem::Jia),
            Symbol::Branch(Branch::Zi),
        ])
        .unwrap();
        assert_eq!(json, r#"["甲","子"]"#);

        let back: Vec<Symbol> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[1], Symbol::Branch(Branch::Zi));
    }
}
