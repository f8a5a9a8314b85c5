//! Phase segmentation of the plan calendar
//!
//! The range from the start Monday to race Sunday is cut into whole weeks:
//! Development first, then Specific, then Taper. The Taper length is a share
//! of the total with a floor; the rest is split between Development and
//! Specific by relative shares.

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::PlanConfig;
use crate::models::TrainingPhase;

/// Calendar dates of each phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhasePartition {
    start_date: NaiveDate,
    race_date: NaiveDate,
    dates: BTreeMap<TrainingPhase, Vec<NaiveDate>>,
}

impl PhasePartition {
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn race_date(&self) -> NaiveDate {
        self.race_date
    }

    /// Ordered dates of a phase, empty when the phase got no weeks
    pub fn dates(&self, phase: TrainingPhase) -> &[NaiveDate] {
        self.dates.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate phases in plan order with their dates
    pub fn iter(&self) -> impl Iterator<Item = (TrainingPhase, &[NaiveDate])> + '_ {
        TrainingPhase::ALL
            .into_iter()
            .map(move |phase| (phase, self.dates(phase)))
    }

    /// First and last date of a phase
    pub fn bounds(&self, phase: TrainingPhase) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self.dates(phase);
        Some((*dates.first()?, *dates.last()?))
    }

    /// Phase owning `date`, if the date is in range
    pub fn phase_of(&self, date: NaiveDate) -> Option<TrainingPhase> {
        self.iter()
            .find(|(_, dates)| dates.binary_search(&date).is_ok())
            .map(|(phase, _)| phase)
    }

    /// Number of Monday-aligned weeks spanned by the partition
    pub fn total_weeks(&self) -> u32 {
        ((self.race_date - self.start_date).num_days() / 7 + 1) as u32
    }

    /// Week index (0-based) of a date, None before the start date
    pub fn week_index(&self, date: NaiveDate) -> Option<u32> {
        let days = (date - self.start_date).num_days();
        (days >= 0).then(|| (days / 7) as u32)
    }

    /// Monday of week `week`
    pub fn week_start(&self, week: u32) -> NaiveDate {
        self.start_date + Duration::weeks(week as i64)
    }

    /// Phase with the most days in week `week`
    ///
    /// Ties go to the earlier phase. A week with no dated day falls back to
    /// Taper past the end of the Taper phase and to Development otherwise.
    pub fn week_phase(&self, week: u32) -> TrainingPhase {
        let monday = self.week_start(week);
        let days: Vec<NaiveDate> = (0..7).map(|d| monday + Duration::days(d)).collect();

        let mut best: Option<(TrainingPhase, usize)> = None;
        for (phase, dates) in self.iter() {
            let count = days
                .iter()
                .filter(|day| dates.binary_search(*day).is_ok())
                .count();
            if count > best.map(|(_, c)| c).unwrap_or(0) {
                best = Some((phase, count));
            }
        }

        match best {
            Some((phase, _)) => phase,
            None => match self.bounds(TrainingPhase::Taper) {
                Some((_, taper_end)) if monday > taper_end => TrainingPhase::Taper,
                _ => TrainingPhase::Development,
            },
        }
    }

    /// Number of weeks whose majority phase is `phase`
    pub fn week_count(&self, phase: TrainingPhase) -> u32 {
        (0..self.total_weeks())
            .filter(|week| self.week_phase(*week) == phase)
            .count() as u32
    }
}

/// Splits a plan range into training phases
#[derive(Debug, Clone)]
pub struct PhaseCalculator {
    min_taper_weeks: u32,
    taper_ratio: Decimal,
    development_share: u32,
    specific_share: u32,
}

impl Default for PhaseCalculator {
    fn default() -> Self {
        Self::from_config(&PlanConfig::default())
    }
}

impl PhaseCalculator {
    pub fn from_config(config: &PlanConfig) -> Self {
        Self {
            min_taper_weeks: config.min_taper_weeks,
            taper_ratio: config.taper_phase_ratio,
            development_share: config.development_share,
            specific_share: config.specific_share,
        }
    }

    /// Week counts (development, specific, taper) for a plan of `total_weeks`
    pub fn week_split(&self, total_weeks: u32) -> (u32, u32, u32) {
        let scaled_taper = (Decimal::from(total_weeks) * self.taper_ratio)
            .round()
            .to_u32()
            .unwrap_or(0);
        let taper = self.min_taper_weeks.max(scaled_taper).min(total_weeks);
        let remaining = total_weeks - taper;

        let shares = self.development_share + self.specific_share;
        let development = if shares == 0 {
            remaining
        } else {
            (Decimal::from(remaining * self.development_share) / Decimal::from(shares))
                .round()
                .to_u32()
                .unwrap_or(0)
                .min(remaining)
        };

        (development, remaining - development, taper)
    }

    /// Assign every date from `start_date` to `race_date` to a phase
    pub fn calculate(&self, start_date: NaiveDate, race_date: NaiveDate) -> PhasePartition {
        let total_weeks = if race_date < start_date {
            0
        } else {
            ((race_date - start_date).num_days() / 7 + 1) as u32
        };
        let (development, specific, taper) = self.week_split(total_weeks);

        debug!(total_weeks, development, specific, taper, "Phase split");

        let mut dates = BTreeMap::new();
        let mut week = 0u32;
        for (phase, weeks) in [
            (TrainingPhase::Development, development),
            (TrainingPhase::Specific, specific),
            (TrainingPhase::Taper, taper),
        ] {
            let phase_dates: Vec<NaiveDate> = (week..week + weeks)
                .flat_map(|w| {
                    let monday = start_date + Duration::weeks(w as i64);
                    (0..7).map(move |d| monday + Duration::days(d))
                })
                .filter(|date| *date <= race_date)
                .collect();
            dates.insert(phase, phase_dates);
            week += weeks;
        }

        PhasePartition {
            start_date,
            race_date,
            dates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_split() {
        let calculator = PhaseCalculator::default();
        assert_eq!(calculator.week_split(13), (5, 4, 4));
        assert_eq!(calculator.week_split(20), (9, 7, 4));
        // round(26 * 0.2) = 5
        assert_eq!(calculator.week_split(26), (12, 9, 5));
    }

    #[test]
    fn test_partition_covers_range() {
        let start = date(2024, 1, 1);
        let race = date(2024, 3, 31);
        let partition = PhaseCalculator::default().calculate(start, race);

        let all: Vec<NaiveDate> = partition.iter().flat_map(|(_, d)| d.to_vec()).collect();
        let unique: HashSet<NaiveDate> = all.iter().copied().collect();
        assert_eq!(all.len(), 91);
        assert_eq!(unique.len(), 91);
        assert_eq!(all.first(), Some(&start));
        assert_eq!(all.last(), Some(&race));

        assert_eq!(partition.dates(TrainingPhase::Development).len(), 35);
        assert_eq!(partition.dates(TrainingPhase::Specific).len(), 28);
        assert_eq!(partition.dates(TrainingPhase::Taper).len(), 28);
    }

    #[test]
    fn test_week_and_date_lookup() {
        let partition = PhaseCalculator::default().calculate(date(2024, 1, 1), date(2024, 3, 31));

        assert_eq!(partition.total_weeks(), 13);
        assert_eq!(partition.week_phase(0), TrainingPhase::Development);
        assert_eq!(partition.week_phase(5), TrainingPhase::Specific);
        assert_eq!(partition.week_phase(12), TrainingPhase::Taper);
        assert_eq!(partition.week_phase(40), TrainingPhase::Taper);
        assert_eq!(partition.week_count(TrainingPhase::Specific), 4);

        assert_eq!(partition.phase_of(date(2024, 2, 5)), Some(TrainingPhase::Specific));
        assert_eq!(partition.phase_of(date(2024, 4, 1)), None);
        assert_eq!(partition.week_index(date(2024, 1, 14)), Some(1));
        assert_eq!(partition.week_index(date(2023, 12, 31)), None);
        assert_eq!(
            partition.bounds(TrainingPhase::Taper),
            Some((date(2024, 3, 4), date(2024, 3, 31)))
        );
    }

    #[test]
    fn test_empty_phase_is_allowed() {
        let mut config = PlanConfig::default();
        config.specific_share = 0;
        let partition = PhaseCalculator::from_config(&config).calculate(date(2024, 1, 1), date(2024, 3, 31));

        assert!(partition.dates(TrainingPhase::Specific).is_empty());
        assert_eq!(partition.bounds(TrainingPhase::Specific), None);
        assert_eq!(partition.dates(TrainingPhase::Development).len(), 63);
    }
}
