//! Calendar-to-pillar conversion.
//!
//! Uses a fixed 60-cycle epoch: 1984 is the 甲子 year and 1984-02-04 the
//! 甲子 day. Month branches follow the civil calendar month (January is the
//! 寅 month) rather than true solar terms.

use crate::chart::{BirthDate, Chart, ChartMode, Provenance};
use crate::config::{ConfigError, EngineConfig};
use crate::ganzhi::{Branch, Pillar, Stem};
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use thiserror::Error;

/// Error type for calendar derivation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Invalid date: {year}-{month}-{day}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("Invalid hour: {0} (expected 0-23)")]
    InvalidHour(u32),
}

/// Year whose pillar is 甲子.
pub const EPOCH_YEAR: i32 = 1984;

/// Month stem that opens the year, keyed by `year_stem / 2` (丙戊庚壬甲).
const MONTH_STEM_STARTS: [Stem; 5] = [Stem::Bing, Stem::Wu, Stem::Geng, Stem::Ren, Stem::Jia];

/// Hour stem at the 子 hour, keyed by `day_stem / 2` (甲丙戊庚壬).
const HOUR_STEM_STARTS: [Stem; 5] = [Stem::Jia, Stem::Bing, Stem::Wu, Stem::Geng, Stem::Ren];

/// 1984-02-04, the 甲子 day, counted in days from 0001-01-01 (day 1).
pub const EPOCH_DAY_FROM_CE: i32 = 724_310;

/// Source of the current year for the annual pillar.
pub trait Clock {
    fn current_year(&self) -> i32;
}

/// Reads the local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_year(&self) -> i32 {
        chrono::Local::now().year()
    }
}

/// Always reports the same year.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i32);

impl Clock for FixedClock {
    fn current_year(&self) -> i32 {
        self.0
    }
}

pub fn year_pillar(year: i32) -> Pillar {
    Pillar::from_offset((year - EPOCH_YEAR) as i64)
}

pub fn month_pillar(year: i32, month: u32) -> Result<Pillar, CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidDate {
            year,
            month,
            day: 1,
        });
    }
    let year_stem = year_pillar(year).stem;
    let start = MONTH_STEM_STARTS[year_stem.index() / 2];
    Ok(Pillar::new(
        start.shift(month as i64 - 1),
        Branch::from_index(month as i64 + 1),
    ))
}

/// Day pillar from the count of whole days since the epoch day.
pub fn day_pillar(date: NaiveDate) -> Pillar {
    Pillar::from_offset(days_since_epoch(date))
}

pub fn days_since_epoch(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - i64::from(EPOCH_DAY_FROM_CE)
}

/// Hour pillar. 23:00 and 00:00 both fall in the first (子) slot.
pub fn hour_pillar(day_stem: Stem, hour: u32) -> Result<Pillar, CalendarError> {
    if hour > 23 {
        return Err(CalendarError::InvalidHour(hour));
    }
    let slot = ((hour + 1) / 2) % 12;
    let start = HOUR_STEM_STARTS[day_stem.index() / 2];
    Ok(Pillar::new(
        start.shift(slot as i64),
        Branch::from_index(slot as i64),
    ))
}

/// Luck pillar: the month pillar walked `steps` positions, forward when the
/// year stem's polarity matches the subject's (yang with male, yin with
/// female), backward otherwise.
pub fn luck_pillar(year_stem: Stem, month: Pillar, is_female: bool, steps: u32) -> Pillar {
    let forward = year_stem.is_yang() != is_female;
    let steps = steps as i64;
    month.shift(if forward { steps } else { -steps })
}

fn calendar_date(birth: &BirthDate) -> Result<NaiveDate, CalendarError> {
    NaiveDate::from_ymd_opt(birth.year, birth.month, birth.day).ok_or(
        CalendarError::InvalidDate {
            year: birth.year,
            month: birth.month,
            day: birth.day,
        },
    )
}

/// Derives charts from birth data.
///
/// The clock is only consulted for extended charts.
#[derive(Debug, Clone)]
pub struct Calendar<C: Clock = SystemClock> {
    config: EngineConfig,
    clock: C,
}

impl Calendar<SystemClock> {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            clock: SystemClock,
        }
    }
}

impl Default for Calendar<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Calendar<C> {
    /// Replace the clock used for the annual pillar.
    pub fn with_clock<D: Clock>(self, clock: D) -> Calendar<D> {
        Calendar {
            config: self.config,
            clock,
        }
    }

    /// Replace the generator ranges. Rejects a config whose ranges are empty
    /// or whose day cap would produce impossible dates.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Derive the four natal pillars, without luck or annual pillars.
    pub fn natal_pillars(&self, birth: &BirthDate) -> Result<[Pillar; 4], CalendarError> {
        let date = calendar_date(birth)?;
        let year = year_pillar(birth.year);
        let month = month_pillar(birth.year, birth.month)?;
        let day = day_pillar(date);
        let hour = hour_pillar(day.stem, birth.hour)?;
        Ok([year, month, day, hour])
    }

    /// Derive a chart from a caller-supplied birth date.
    ///
    /// The RNG is only used in extended mode, to pick the luck step count.
    pub fn derive_chart<R: Rng>(
        &self,
        birth: &BirthDate,
        mode: ChartMode,
        rng: &mut R,
    ) -> Result<Chart, CalendarError> {
        self.build_chart(birth, mode, Provenance::Date, rng)
    }

    /// Synthesize birth data from the RNG and derive its chart.
    pub fn random_chart<R: Rng>(&self, mode: ChartMode, rng: &mut R) -> Result<Chart, CalendarError> {
        let birth = BirthDate {
            year: rng.gen_range(self.config.random_years()),
            month: rng.gen_range(1..=12),
            day: rng.gen_range(1..=self.config.random_day_max),
            hour: rng.gen_range(0..=23),
            is_female: rng.gen_bool(0.5),
        };
        self.build_chart(&birth, mode, Provenance::Random, rng)
    }

    fn build_chart<R: Rng>(
        &self,
        birth: &BirthDate,
        mode: ChartMode,
        provenance: Provenance,
        rng: &mut R,
    ) -> Result<Chart, CalendarError> {
        let natal = self.natal_pillars(birth)?;
        let mut pillars = natal.to_vec();
        let mut current_year = None;
        let mut luck_steps = None;

        if mode.is_extended() {
            let steps = rng.gen_range(self.config.luck_steps());
            let current = self.clock.current_year();
            pillars.push(luck_pillar(natal[0].stem, natal[1], birth.is_female, steps));
            pillars.push(year_pillar(current));
            current_year = Some(current);
            luck_steps = Some(steps);
        }

        tracing::debug!(
            mode = %mode,
            date = %format!("{}-{}-{} {}h", birth.year, birth.month, birth.day, birth.hour),
            pillars = pillars.len(),
            "derived chart"
        );

        Ok(Chart {
            mode,
            provenance,
            birth: *birth,
            pillars,
            current_year,
            luck_steps,
        })
    }
}
