//! Weekday placement and construction of sessions
//!
//! Each week gets a fixed set of rest days, then sessions are placed in
//! priority order: intermediate race, long run, threshold, easy runs. Easy
//! volume is split with a seeded random source so runs vary in length but
//! generation stays reproducible.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::config::PlanConfig;
use crate::models::{Session, SessionType, TrainingPhase};
use crate::phases::PhasePartition;
use crate::profile::{Race, RaceKind, UserProfile};
use crate::volume::WeeklyVolumes;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Position in the threshold interval rotation
///
/// Threaded from one week to the next; each placed threshold session
/// consumes one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalRotation {
    position: usize,
}

impl IntervalRotation {
    /// Interval length for the current session and the rotation for the next
    pub fn advance(self, options: &[u32]) -> (u32, IntervalRotation) {
        let minutes = match options.len() {
            0 => 1,
            len => options[self.position % len],
        };
        (
            minutes,
            IntervalRotation {
                position: self.position + 1,
            },
        )
    }
}

/// Everything the distributor needs to know about one week
#[derive(Debug, Clone)]
pub struct WeekContext<'a> {
    pub index: u32,
    pub monday: NaiveDate,
    pub phase: TrainingPhase,
    pub volume: Decimal,
    pub intermediate_race: Option<&'a Race>,
    /// Set when the main race falls in this week
    pub main_race_date: Option<NaiveDate>,
}

/// Sessions placed for one week
#[derive(Debug, Clone)]
pub struct WeekSessions {
    /// Sessions in date order, main race day excluded
    pub sessions: Vec<Session>,
    /// Rotation to hand to the next week
    pub rotation: IntervalRotation,
    /// Session types that found no free day
    pub skipped: Vec<SessionType>,
}

/// Places sessions on weekdays and builds their blocks
pub struct SessionDistributor<'a, R = StdRng> {
    config: &'a PlanConfig,
    rng: R,
}

impl<'a> SessionDistributor<'a, StdRng> {
    /// Distributor with a generator seeded from `easy_split_seed`
    pub fn new(config: &'a PlanConfig) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(config.easy_split_seed))
    }
}

impl<'a, R: Rng> SessionDistributor<'a, R> {
    pub fn with_rng(config: &'a PlanConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Sessions for every date of the plan except the main race day
    pub fn distribute(
        &mut self,
        profile: &UserProfile,
        partition: &PhasePartition,
        volumes: &WeeklyVolumes,
    ) -> BTreeMap<NaiveDate, Session> {
        let race_date = profile.race_date();
        let mut rotation = IntervalRotation::default();
        let mut sessions = BTreeMap::new();

        for (&index, &volume) in volumes {
            let monday = partition.week_start(index);
            let sunday = monday + Duration::days(6);
            let in_week = |date: NaiveDate| date >= monday && date <= sunday;

            let week = WeekContext {
                index,
                monday,
                phase: partition.week_phase(index),
                volume,
                intermediate_race: profile.intermediate_races().iter().find(|r| in_week(r.date())),
                main_race_date: in_week(race_date).then_some(race_date),
            };

            let placed = self.distribute_week(profile, &week, rotation);
            rotation = placed.rotation;
            sessions.extend(
                placed
                    .sessions
                    .into_iter()
                    .filter(|s| s.date < race_date)
                    .map(|s| (s.date, s)),
            );
        }

        sessions
    }

    /// Place one week of sessions
    pub fn distribute_week(
        &mut self,
        profile: &UserProfile,
        week: &WeekContext<'_>,
        rotation: IntervalRotation,
    ) -> WeekSessions {
        let config = self.config;
        let easy_pace = profile.easy_pace();
        let specific_pace = profile.specific_pace();
        let split = config.block_split();
        let date_of = |day: Weekday| week.monday + Duration::days(day.num_days_from_monday() as i64);

        let (mut training, mut rest) = self.weekly_days(profile.sessions_per_week());

        if let Some(race_date) = week.main_race_date {
            occupy(&mut training, &mut rest, race_date.weekday());
        }

        let has_threshold = week.phase != TrainingPhase::Taper && week.intermediate_race.is_none();
        let mut long_run_volume = week.volume * config.long_run_volume_ratio;
        let (threshold_volume, mut easy_volume) = if has_threshold {
            (
                week.volume * config.threshold_volume_ratio,
                week.volume * config.easy_volume_ratio,
            )
        } else {
            (Decimal::ZERO, week.volume - long_run_volume)
        };
        if week.main_race_date.is_some() {
            long_run_volume = long_run_volume.min(config.race_week_long_run_cap_km);
            easy_volume = week.volume - long_run_volume;
        }

        let mut placed: BTreeMap<NaiveDate, Session> = BTreeMap::new();
        let mut skipped = Vec::new();
        let mut rotation = rotation;

        if let Some(race) = week.intermediate_race {
            occupy(&mut training, &mut rest, race.date().weekday());
            placed.insert(
                race.date(),
                Session::race(
                    race.date(),
                    week.phase,
                    race.distance_km(),
                    race.target_pace().unwrap_or(specific_pace),
                    format!("Intermediate race: {}", race.label()),
                    true,
                ),
            );
        }

        match take_preferred(&mut training, config.long_run_day) {
            Some(day) => {
                placed.insert(
                    date_of(day),
                    Session::long_run(date_of(day), week.phase, long_run_volume, easy_pace, specific_pace, split),
                );
            }
            None => {
                debug!(week = week.index, "No free day for the long run, skipped");
                skipped.push(SessionType::LongRun);
            }
        }

        if has_threshold {
            match take_preferred(&mut training, config.threshold_day) {
                Some(day) => {
                    let (minutes, next) = rotation.advance(self.interval_options(profile));
                    rotation = next;
                    placed.insert(
                        date_of(day),
                        Session::threshold(
                            date_of(day),
                            week.phase,
                            threshold_volume,
                            easy_pace,
                            specific_pace,
                            minutes,
                            split,
                        ),
                    );
                }
                None => {
                    debug!(week = week.index, "No free day for the threshold session, skipped");
                    skipped.push(SessionType::Threshold);
                }
            }
        }

        let easy_distances = self.split_easy_volume(easy_volume, training.len());
        for (day, distance) in training.iter().zip(easy_distances) {
            let description = week
                .main_race_date
                .map(|_| "Light easy run before race day".to_string());
            placed.insert(
                date_of(*day),
                Session::easy(date_of(*day), week.phase, distance, easy_pace, description),
            );
        }

        for day in &rest {
            placed
                .entry(date_of(*day))
                .or_insert_with(|| Session::rest(date_of(*day), week.phase));
        }

        trace!(
            week = week.index,
            phase = %week.phase,
            volume = %week.volume,
            sessions = placed.values().filter(|s| s.is_training()).count(),
            "Week distributed"
        );

        WeekSessions {
            sessions: placed.into_values().collect(),
            rotation,
            skipped,
        }
    }

    /// Training and rest weekdays for `sessions_per_week`, both in calendar order
    fn weekly_days(&self, sessions_per_week: u8) -> (Vec<Weekday>, Vec<Weekday>) {
        let rest_count = 7usize.saturating_sub(sessions_per_week as usize);
        let chosen: Vec<Weekday> = self
            .config
            .rest_day_priority
            .iter()
            .copied()
            .take(rest_count)
            .collect();

        WEEK.iter().copied().partition(|day| !chosen.contains(day))
    }

    fn interval_options(&self, profile: &UserProfile) -> &'a [u32] {
        let config: &'a PlanConfig = self.config;
        match profile.main_race().kind() {
            RaceKind::TenK => &config.threshold_minutes_10k,
            _ => &config.threshold_minutes_default,
        }
    }

    /// Split `total` km over `days` easy runs
    ///
    /// Shares come from random coefficients in the configured range,
    /// normalized and rounded to 0.1 km. The rounding residual goes to the
    /// largest share so the split always sums to `total` rounded.
    pub fn split_easy_volume(&mut self, total: Decimal, days: usize) -> Vec<Decimal> {
        match days {
            0 => Vec::new(),
            1 => vec![total.round_dp(1)],
            _ => {
                let (low, high) = (
                    self.config.easy_split_min_coefficient,
                    self.config.easy_split_max_coefficient,
                );
                let coefficients: Vec<Decimal> = (0..days)
                    .map(|_| Decimal::from_f64(self.rng.gen_range(low..high)).unwrap_or(Decimal::ONE))
                    .collect();
                let sum: Decimal = coefficients.iter().sum();

                let mut shares: Vec<Decimal> = coefficients
                    .iter()
                    .map(|c| {
                        (total * c)
                            .checked_div(sum)
                            .unwrap_or(Decimal::ZERO)
                            .round_dp(1)
                    })
                    .collect();

                let residual = total.round_dp(1) - shares.iter().sum::<Decimal>();
                if !residual.is_zero() {
                    let largest = shares
                        .iter()
                        .enumerate()
                        .fold(0, |best, (i, share)| if *share > shares[best] { i } else { best });
                    shares[largest] += residual;
                }

                shares
            }
        }
    }
}

/// Take a day out of the pools for a race
///
/// A race on a rest day keeps the training budget by moving the earliest
/// training day to rest.
fn occupy(training: &mut Vec<Weekday>, rest: &mut Vec<Weekday>, day: Weekday) {
    if let Some(pos) = training.iter().position(|d| *d == day) {
        training.remove(pos);
    } else if let Some(pos) = rest.iter().position(|d| *d == day) {
        rest.remove(pos);
        if !training.is_empty() {
            rest.push(training.remove(0));
        }
    }
}

/// Preferred weekday if still free, else the first free training day
fn take_preferred(training: &mut Vec<Weekday>, preferred: Weekday) -> Option<Weekday> {
    let pos = training.iter().position(|d| *d == preferred).or_else(|| {
        (!training.is_empty()).then_some(0)
    })?;
    Some(training.remove(pos))
}
