//! Rule catalog: relationship categories, their pattern tables, and scoring.
//!
//! Everything here is static data. The enumerator in [`crate::relations`]
//! reads these tables; [`RuleSettings`] decides which categories it consults.
//!
//! Pattern tables are keyed by the unordered symbol pair: a pair matches when
//! either symbol names the other as its partner.

use crate::ganzhi::{Branch, Element, Stem};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Errors from rule configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Unknown rule setting: {0}")]
    UnknownSetting(String),
}

// ============================================================================
// Categories
// ============================================================================

/// Which alphabet a rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Stems,
    Branches,
}

/// A toggleable relationship category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    StemCombination,
    StemClash,
    BranchSixHarmony,
    BranchClash,
    BranchPunishment,
    BranchHarm,
    BranchDestruction,
    BranchTriad,
    BranchDirectional,
}

static RULE_KEYS: Lazy<HashMap<&'static str, RuleKind>> = Lazy::new(|| {
    let mut keys = HashMap::new();
    for kind in RuleKind::all() {
        keys.insert(kind.key(), kind);
        keys.insert(kind.label(), kind);
    }
    keys
});

impl RuleKind {
    pub fn all() -> [RuleKind; 9] {
        use RuleKind::*;
        [
            StemCombination,
            StemClash,
            BranchSixHarmony,
            BranchClash,
            BranchPunishment,
            BranchHarm,
            BranchDestruction,
            BranchTriad,
            BranchDirectional,
        ]
    }

    /// Settings key.
    pub fn key(&self) -> &'static str {
        match self {
            RuleKind::StemCombination => "stem_combination",
            RuleKind::StemClash => "stem_clash",
            RuleKind::BranchSixHarmony => "branch_six_harmony",
            RuleKind::BranchClash => "branch_clash",
            RuleKind::BranchPunishment => "branch_punishment",
            RuleKind::BranchHarm => "branch_harm",
            RuleKind::BranchDestruction => "branch_destruction",
            RuleKind::BranchTriad => "branch_triad",
            RuleKind::BranchDirectional => "branch_directional",
        }
    }

    /// Traditional name.
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::StemCombination => "天干五合",
            RuleKind::StemClash => "天干相冲",
            RuleKind::BranchSixHarmony => "地支六合",
            RuleKind::BranchClash => "地支相冲",
            RuleKind::BranchPunishment => "地支相刑",
            RuleKind::BranchHarm => "地支相害",
            RuleKind::BranchDestruction => "地支相破",
            RuleKind::BranchTriad => "地支三合局",
            RuleKind::BranchDirectional => "地支三会方",
        }
    }

    /// Look up a category by settings key (snake or kebab case) or by its
    /// traditional name.
    pub fn from_key(key: &str) -> Option<RuleKind> {
        let key = key.trim();
        RULE_KEYS
            .get(key)
            .or_else(|| RULE_KEYS.get(key.replace('-', "_").as_str()))
            .copied()
    }

    pub fn entry(&self) -> &'static RuleEntry {
        &RULE_CATALOG[*self as usize]
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// The `type` tag carried by every relationship match.
///
/// Triad and directional categories each produce two tags: the full
/// three-branch pattern and the two-branch half pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    StemCombination,
    StemClash,
    BranchSixHarmony,
    BranchClash,
    BranchPunishment,
    BranchHarm,
    BranchDestruction,
    BranchTriad,
    BranchHalfTriad,
    BranchDirectional,
    BranchHalfDirectional,
}

impl RelationKind {
    /// The category that produces this tag.
    pub fn rule(&self) -> RuleKind {
        match self {
            RelationKind::StemCombination => RuleKind::StemCombination,
            RelationKind::StemClash => RuleKind::StemClash,
            RelationKind::BranchSixHarmony => RuleKind::BranchSixHarmony,
            RelationKind::BranchClash => RuleKind::BranchClash,
            RelationKind::BranchPunishment => RuleKind::BranchPunishment,
            RelationKind::BranchHarm => RuleKind::BranchHarm,
            RelationKind::BranchDestruction => RuleKind::BranchDestruction,
            RelationKind::BranchTriad | RelationKind::BranchHalfTriad => RuleKind::BranchTriad,
            RelationKind::BranchDirectional | RelationKind::BranchHalfDirectional => {
                RuleKind::BranchDirectional
            }
        }
    }

    pub fn is_half(&self) -> bool {
        matches!(
            self,
            RelationKind::BranchHalfTriad | RelationKind::BranchHalfDirectional
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelationKind::BranchTriad => "地支三合",
            RelationKind::BranchHalfTriad => "地支半合",
            RelationKind::BranchDirectional => "地支三会",
            RelationKind::BranchHalfDirectional => "地支半会",
            other => other.rule().label(),
        }
    }

    /// Score for a match of this kind.
    pub fn score(&self, extended: bool) -> i32 {
        let entry = self.rule().entry();
        if self.is_half() {
            entry.half.map(|h| h.pick(extended)).unwrap_or_default()
        } else {
            entry.base.pick(extended) + entry.modifier
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Score for matches touching only natal positions vs. matches touching a
/// luck or annual position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoring {
    pub basic: i32,
    pub extended: i32,
}

impl Scoring {
    pub const fn new(basic: i32, extended: i32) -> Self {
        Self { basic, extended }
    }

    pub fn pick(&self, extended: bool) -> i32 {
        if extended {
            self.extended
        } else {
            self.basic
        }
    }
}

/// Static description of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleEntry {
    pub kind: RuleKind,
    /// Number of participants in a full match.
    pub arity: u8,
    pub domain: Domain,
    pub base: Scoring,
    /// Added to `base` for full matches.
    pub modifier: i32,
    /// Score of the two-branch variant, for three-branch patterns.
    pub half: Option<Scoring>,
    /// Fixed description for categories that do not name a transformation.
    pub description: Option<&'static str>,
}

const STEM_BASE: Scoring = Scoring::new(10, 15);
const BRANCH_BASE: Scoring = Scoring::new(12, 18);

/// Indexed by `RuleKind as usize`.
pub static RULE_CATALOG: [RuleEntry; 9] = [
    RuleEntry {
        kind: RuleKind::StemCombination,
        arity: 2,
        domain: Domain::Stems,
        base: STEM_BASE,
        modifier: 5,
        half: None,
        description: None,
    },
    RuleEntry {
        kind: RuleKind::StemClash,
        arity: 2,
        domain: Domain::Stems,
        base: STEM_BASE,
        modifier: -2,
        half: None,
        description: Some("天干相冲，主冲突不和"),
    },
    RuleEntry {
        kind: RuleKind::BranchSixHarmony,
        arity: 2,
        domain: Domain::Branches,
        base: BRANCH_BASE,
        modifier: 0,
        half: None,
        description: None,
    },
    RuleEntry {
        kind: RuleKind::BranchClash,
        arity: 2,
        domain: Domain::Branches,
        base: BRANCH_BASE,
        modifier: -2,
        half: None,
        description: Some("地支相冲，主动荡变化"),
    },
    RuleEntry {
        kind: RuleKind::BranchPunishment,
        arity: 2,
        domain: Domain::Branches,
        base: BRANCH_BASE,
        modifier: 3,
        half: None,
        description: Some("地支相刑，主刑伤阻滞"),
    },
    RuleEntry {
        kind: RuleKind::BranchHarm,
        arity: 2,
        domain: Domain::Branches,
        base: BRANCH_BASE,
        modifier: 0,
        half: None,
        description: Some("地支相害，主暗中损害"),
    },
    RuleEntry {
        kind: RuleKind::BranchDestruction,
        arity: 2,
        domain: Domain::Branches,
        base: BRANCH_BASE,
        modifier: -2,
        half: None,
        description: Some("地支相破，主破坏损失"),
    },
    RuleEntry {
        kind: RuleKind::BranchTriad,
        arity: 3,
        domain: Domain::Branches,
        base: Scoring::new(20, 30),
        modifier: 0,
        half: Some(Scoring::new(12, 18)),
        description: None,
    },
    RuleEntry {
        kind: RuleKind::BranchDirectional,
        arity: 3,
        domain: Domain::Branches,
        base: Scoring::new(18, 27),
        modifier: 0,
        half: Some(Scoring::new(10, 15)),
        description: None,
    },
];

// ============================================================================
// Pattern tables
// ============================================================================

/// A stem pair that combines and transforms.
#[derive(Debug, Clone, Copy)]
pub struct StemCombination {
    pub pair: (Stem, Stem),
    pub element: Element,
    /// Classical name of the combination.
    pub name: &'static str,
}

pub static STEM_COMBINATIONS: [StemCombination; 5] = [
    StemCombination {
        pair: (Stem::Jia, Stem::Ji),
        element: Element::Earth,
        name: "中正之合 化土",
    },
    StemCombination {
        pair: (Stem::Yi, Stem::Geng),
        element: Element::Metal,
        name: "仁义之合 化金",
    },
    StemCombination {
        pair: (Stem::Bing, Stem::Xin),
        element: Element::Water,
        name: "威制之合 化水",
    },
    StemCombination {
        pair: (Stem::Ding, Stem::Ren),
        element: Element::Wood,
        name: "淫慝之合 化木",
    },
    StemCombination {
        pair: (Stem::Wu, Stem::Gui),
        element: Element::Fire,
        name: "无情之合 化火",
    },
];

pub static STEM_CLASHES: [(Stem, Stem); 4] = [
    (Stem::Jia, Stem::Geng),
    (Stem::Yi, Stem::Xin),
    (Stem::Bing, Stem::Ren),
    (Stem::Ding, Stem::Gui),
];

fn same_pair<T: PartialEq>(pair: &(T, T), a: &T, b: &T) -> bool {
    (pair.0 == *a && pair.1 == *b) || (pair.0 == *b && pair.1 == *a)
}

pub fn stem_combination(a: Stem, b: Stem) -> Option<&'static StemCombination> {
    STEM_COMBINATIONS.iter().find(|c| same_pair(&c.pair, &a, &b))
}

pub fn is_stem_clash(a: Stem, b: Stem) -> bool {
    STEM_CLASHES.iter().any(|pair| same_pair(pair, &a, &b))
}

/// Each branch's single partner for every pairwise branch category.
#[derive(Debug, Clone, Copy)]
pub struct BranchPartners {
    pub harmony: Branch,
    pub clash: Branch,
    pub punishment: Branch,
    pub harm: Branch,
    pub destruction: Branch,
}

const fn partners(
    harmony: Branch,
    clash: Branch,
    punishment: Branch,
    harm: Branch,
    destruction: Branch,
) -> BranchPartners {
    BranchPartners {
        harmony,
        clash,
        punishment,
        harm,
        destruction,
    }
}

/// Indexed by branch index. 辰, 午, 酉 and 亥 punish themselves.
///
/// Each branch lists one punishment partner, so the cycles 寅巳申 and 丑戌未
/// only close because pairs are matched symmetrically by
/// [`branch_pair_matches`]: 申 names 寅 and 寅 names 巳, so 寅申 still matches.
pub static BRANCH_PARTNERS: [BranchPartners; 12] = {
    use Branch::*;
    [
        partners(Chou, Wu, Mao, Wei, You),   // 子
        partners(Zi, Wei, Xu, Wu, Chen),     // 丑
        partners(Hai, Shen, Si, Si, Hai),    // 寅
        partners(Xu, You, Zi, Chen, Wu),     // 卯
        partners(You, Xu, Chen, Mao, Chou),  // 辰
        partners(Shen, Hai, Shen, Yin, Shen), // 巳
        partners(Wei, Zi, Wu, Chou, Mao),    // 午
        partners(Wu, Chou, Chou, Zi, Xu),    // 未
        partners(Si, Yin, Yin, Hai, Si),     // 申
        partners(Chen, Mao, You, Xu, Zi),    // 酉
        partners(Mao, Chen, Wei, You, Wei),  // 戌
        partners(Yin, Si, Hai, Shen, Yin),   // 亥
    ]
};

impl BranchPartners {
    pub fn of(branch: Branch) -> &'static BranchPartners {
        &BRANCH_PARTNERS[branch.index()]
    }

    /// Partner under a pairwise branch category; `None` for other categories.
    pub fn partner(&self, kind: RuleKind) -> Option<Branch> {
        match kind {
            RuleKind::BranchSixHarmony => Some(self.harmony),
            RuleKind::BranchClash => Some(self.clash),
            RuleKind::BranchPunishment => Some(self.punishment),
            RuleKind::BranchHarm => Some(self.harm),
            RuleKind::BranchDestruction => Some(self.destruction),
            _ => None,
        }
    }
}

/// Whether two branches form a pair under `kind`, in either order.
pub fn branch_pair_matches(kind: RuleKind, a: Branch, b: Branch) -> bool {
    BranchPartners::of(a).partner(kind) == Some(b) || BranchPartners::of(b).partner(kind) == Some(a)
}

pub static SIX_HARMONY_ELEMENTS: [((Branch, Branch), Element); 6] = [
    ((Branch::Zi, Branch::Chou), Element::Earth),
    ((Branch::Yin, Branch::Hai), Element::Wood),
    ((Branch::Mao, Branch::Xu), Element::Fire),
    ((Branch::Chen, Branch::You), Element::Metal),
    ((Branch::Si, Branch::Shen), Element::Water),
    ((Branch::Wu, Branch::Wei), Element::Earth),
];

pub fn six_harmony_element(a: Branch, b: Branch) -> Option<Element> {
    SIX_HARMONY_ELEMENTS
        .iter()
        .find(|(pair, _)| same_pair(pair, &a, &b))
        .map(|(_, element)| *element)
}

/// A three-branch pattern and the element it forms.
#[derive(Debug, Clone, Copy)]
pub struct BranchPattern {
    pub branches: [Branch; 3],
    pub element: Element,
    pub name: &'static str,
}

/// Trine groupings (三合局).
pub static TRIADS: [BranchPattern; 4] = [
    BranchPattern {
        branches: [Branch::Shen, Branch::Zi, Branch::Chen],
        element: Element::Water,
        name: "申子辰三合水局",
    },
    BranchPattern {
        branches: [Branch::Yin, Branch::Wu, Branch::Xu],
        element: Element::Fire,
        name: "寅午戌三合火局",
    },
    BranchPattern {
        branches: [Branch::Si, Branch::You, Branch::Chou],
        element: Element::Metal,
        name: "巳酉丑三合金局",
    },
    BranchPattern {
        branches: [Branch::Hai, Branch::Mao, Branch::Wei],
        element: Element::Wood,
        name: "亥卯未三合木局",
    },
];

/// Seasonal groupings (三会方).
pub static DIRECTIONALS: [BranchPattern; 4] = [
    BranchPattern {
        branches: [Branch::Hai, Branch::Zi, Branch::Chou],
        element: Element::Water,
        name: "亥子丑三会水方",
    },
    BranchPattern {
        branches: [Branch::Yin, Branch::Mao, Branch::Chen],
        element: Element::Wood,
        name: "寅卯辰三会木方",
    },
    BranchPattern {
        branches: [Branch::Si, Branch::Wu, Branch::Wei],
        element: Element::Fire,
        name: "巳午未三会火方",
    },
    BranchPattern {
        branches: [Branch::Shen, Branch::You, Branch::Xu],
        element: Element::Metal,
        name: "申酉戌三会金方",
    },
];

// ============================================================================
// Settings
// ============================================================================

/// One switch per category.
///
/// Deserializes from a `{key: bool}` map. Keys may be the snake_case setting
/// key or the traditional name; missing keys keep their default, unknown keys
/// are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, bool>")]
pub struct RuleSettings {
    pub stem_combination: bool,
    pub stem_clash: bool,
    pub branch_six_harmony: bool,
    pub branch_clash: bool,
    pub branch_punishment: bool,
    pub branch_harm: bool,
    pub branch_destruction: bool,
    pub branch_triad: bool,
    pub branch_directional: bool,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            stem_combination: true,
            stem_clash: true,
            branch_six_harmony: true,
            branch_clash: true,
            branch_punishment: false,
            branch_harm: false,
            branch_destruction: false,
            branch_triad: true,
            branch_directional: true,
        }
    }
}

impl RuleSettings {
    pub fn all_enabled() -> Self {
        let mut settings = Self::default();
        for kind in RuleKind::all() {
            settings.set(kind, true);
        }
        settings
    }

    pub fn all_disabled() -> Self {
        let mut settings = Self::default();
        for kind in RuleKind::all() {
            settings.set(kind, false);
        }
        settings
    }

    /// Enable only the given categories.
    pub fn only(kinds: &[RuleKind]) -> Self {
        let mut settings = Self::all_disabled();
        for kind in kinds {
            settings.set(*kind, true);
        }
        settings
    }

    pub fn is_enabled(&self, kind: RuleKind) -> bool {
        match kind {
            RuleKind::StemCombination => self.stem_combination,
            RuleKind::StemClash => self.stem_clash,
            RuleKind::BranchSixHarmony => self.branch_six_harmony,
            RuleKind::BranchClash => self.branch_clash,
            RuleKind::BranchPunishment => self.branch_punishment,
            RuleKind::BranchHarm => self.branch_harm,
            RuleKind::BranchDestruction => self.branch_destruction,
            RuleKind::BranchTriad => self.branch_triad,
            RuleKind::BranchDirectional => self.branch_directional,
        }
    }

    pub fn set(&mut self, kind: RuleKind, enabled: bool) {
        let slot = match kind {
            RuleKind::StemCombination => &mut self.stem_combination,
            RuleKind::StemClash => &mut self.stem_clash,
            RuleKind::BranchSixHarmony => &mut self.branch_six_harmony,
            RuleKind::BranchClash => &mut self.branch_clash,
            RuleKind::BranchPunishment => &mut self.branch_punishment,
            RuleKind::BranchHarm => &mut self.branch_harm,
            RuleKind::BranchDestruction => &mut self.branch_destruction,
            RuleKind::BranchTriad => &mut self.branch_triad,
            RuleKind::BranchDirectional => &mut self.branch_directional,
        };
        *slot = enabled;
    }

    pub fn with(mut self, kind: RuleKind, enabled: bool) -> Self {
        self.set(kind, enabled);
        self
    }

    pub fn enabled(&self) -> impl Iterator<Item = RuleKind> + '_ {
        RuleKind::all().into_iter().filter(|k| self.is_enabled(*k))
    }

    /// Apply overrides on top of the defaults.
    pub fn from_overrides<'a, I>(overrides: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let mut settings = Self::default();
        for (key, enabled) in overrides {
            let kind =
                RuleKind::from_key(key).ok_or_else(|| RuleError::UnknownSetting(key.to_string()))?;
            settings.set(kind, enabled);
        }
        Ok(settings)
    }
}

impl TryFrom<BTreeMap<String, bool>> for RuleSettings {
    type Error = RuleError;

    fn try_from(map: BTreeMap<String, bool>) -> Result<Self, Self::Error> {
        Self::from_overrides(map.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}
