use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, span, Level};

use crate::config::PlanConfig;
use crate::distributor::SessionDistributor;
use crate::error::{PlanError, Result};
use crate::models::{Session, SessionType, TrainingPhase};
use crate::phases::{PhaseCalculator, PhasePartition};
use crate::profile::UserProfile;
use crate::simulation::ProfileOverrides;
use crate::volume::{VolumeCalculator, WeeklyVolumes};

/// Aggregates for one training phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub weeks: u32,
    pub total_volume: Decimal,
    #[serde(with = "crate::pace::duration_millis")]
    pub total_duration: Duration,
    pub average_weekly_volume: Decimal,
    pub session_counts: BTreeMap<SessionType, usize>,
}

/// A generated plan: one session per calendar day up to race day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingPlan {
    profile: UserProfile,
    sessions: BTreeMap<NaiveDate, Session>,
    phases: PhasePartition,
    weekly_volumes: WeeklyVolumes,
}

impl TrainingPlan {
    /// Reassemble a plan read back from storage
    pub(crate) fn from_parts(
        profile: UserProfile,
        sessions: BTreeMap<NaiveDate, Session>,
        phases: PhasePartition,
        weekly_volumes: WeeklyVolumes,
    ) -> Self {
        Self {
            profile,
            sessions,
            phases,
            weekly_volumes,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn phases(&self) -> &PhasePartition {
        &self.phases
    }

    pub fn weekly_volumes(&self) -> &WeeklyVolumes {
        &self.weekly_volumes
    }

    pub fn start_date(&self) -> NaiveDate {
        self.profile.start_date()
    }

    pub fn race_date(&self) -> NaiveDate {
        self.profile.race_date()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session(&self, date: NaiveDate) -> Option<&Session> {
        self.sessions.get(&date)
    }

    /// Sessions in date order
    pub fn sessions(&self) -> impl Iterator<Item = &Session> + '_ {
        self.sessions.values()
    }

    /// 0-based week index of a date, counted from the plan start
    pub fn week_number(&self, date: NaiveDate) -> Option<u32> {
        self.phases.week_index(date)
    }

    /// Dates of week `week` that fall inside the plan range
    pub fn week_dates(&self, week: u32) -> Vec<NaiveDate> {
        let monday = self.phases.week_start(week);
        (0..7)
            .map(|d| monday + Duration::days(d))
            .filter(|date| *date >= self.start_date() && *date <= self.race_date())
            .collect()
    }

    /// Phase of a date: the session's phase when present, else the partition's
    pub fn phase_for_date(&self, date: NaiveDate) -> Option<TrainingPhase> {
        self.sessions
            .get(&date)
            .map(|s| s.phase)
            .or_else(|| self.phases.phase_of(date))
    }

    pub fn sessions_by_week(&self) -> BTreeMap<u32, Vec<&Session>> {
        let mut weeks: BTreeMap<u32, Vec<&Session>> = BTreeMap::new();
        for session in self.sessions.values() {
            if let Some(week) = self.week_number(session.date) {
                weeks.entry(week).or_default().push(session);
            }
        }
        weeks
    }

    pub fn sessions_by_type(&self) -> BTreeMap<SessionType, Vec<&Session>> {
        let mut groups: BTreeMap<SessionType, Vec<&Session>> = BTreeMap::new();
        for session in self.sessions.values() {
            groups.entry(session.session_type).or_default().push(session);
        }
        groups
    }

    pub fn sessions_by_phase(&self) -> BTreeMap<TrainingPhase, Vec<&Session>> {
        let mut groups: BTreeMap<TrainingPhase, Vec<&Session>> = BTreeMap::new();
        for session in self.sessions.values() {
            groups.entry(session.phase).or_default().push(session);
        }
        groups
    }

    fn week_sessions(&self, week: u32) -> impl Iterator<Item = &Session> + '_ {
        let monday = self.phases.week_start(week);
        self.sessions
            .range(monday..monday + Duration::days(7))
            .map(|(_, session)| session)
    }

    /// Target volume of a week, or the sum of its sessions when no target exists
    pub fn weekly_volume(&self, week: u32) -> Decimal {
        match self.weekly_volumes.get(&week) {
            Some(volume) => *volume,
            None => self
                .week_sessions(week)
                .map(Session::total_distance)
                .sum::<Decimal>()
                .round_dp(1),
        }
    }

    pub fn weekly_duration(&self, week: u32) -> Duration {
        self.week_sessions(week)
            .fold(Duration::zero(), |acc, s| acc + s.total_duration())
    }

    /// Sum of session distances
    pub fn total_volume(&self) -> Decimal {
        self.sessions
            .values()
            .map(Session::total_distance)
            .sum::<Decimal>()
            .round_dp(1)
    }

    pub fn total_duration(&self) -> Duration {
        self.sessions
            .values()
            .fold(Duration::zero(), |acc, s| acc + s.total_duration())
    }

    /// Per-phase aggregates over the sessions still in the plan
    pub fn phase_stats(&self) -> BTreeMap<TrainingPhase, PhaseStats> {
        let by_phase = self.sessions_by_phase();
        let mut stats = BTreeMap::new();

        for (phase, dates) in self.phases.iter() {
            let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
                continue;
            };
            let sessions = by_phase.get(&phase).map(Vec::as_slice).unwrap_or(&[]);

            let weeks = self.phases.week_count(phase);
            let total_volume: Decimal = sessions.iter().map(|s| s.total_distance()).sum();
            let total_duration = sessions
                .iter()
                .fold(Duration::zero(), |acc, s| acc + s.total_duration());
            let average_weekly_volume = if weeks > 0 {
                (total_volume / Decimal::from(weeks)).round_dp(1)
            } else {
                Decimal::ZERO
            };

            let mut session_counts = BTreeMap::new();
            for session in sessions {
                *session_counts.entry(session.session_type).or_insert(0) += 1;
            }

            stats.insert(
                phase,
                PhaseStats {
                    start_date: *first,
                    end_date: *last,
                    weeks,
                    total_volume: total_volume.round_dp(1),
                    total_duration,
                    average_weekly_volume,
                    session_counts,
                },
            );
        }

        stats
    }

    /// Copy of the plan keeping only sessions on or after `date`
    fn truncated_from(&self, date: NaiveDate) -> Self {
        Self {
            profile: self.profile.clone(),
            sessions: self.sessions.range(date..).map(|(d, s)| (*d, s.clone())).collect(),
            phases: self.phases.clone(),
            weekly_volumes: self.weekly_volumes.clone(),
        }
    }
}

/// Runs phase segmentation, volume progression and session placement
#[derive(Debug, Clone, Default)]
pub struct PlanGenerator {
    config: PlanConfig,
}

impl PlanGenerator {
    pub fn new(config: PlanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Build the full plan for a profile
    pub fn generate_plan(&self, profile: &UserProfile) -> Result<TrainingPlan> {
        let span = span!(Level::DEBUG, "generate_plan", race_date = %profile.race_date());
        let _guard = span.enter();

        // The profile may have been validated against a different config
        let profile = UserProfile::with_config(profile.to_input(), &self.config)?;

        let phases = PhaseCalculator::from_config(&self.config)
            .calculate(profile.start_date(), profile.race_date());

        let race_dates: Vec<NaiveDate> = profile.intermediate_races().iter().map(|r| r.date()).collect();
        let weekly_volumes = VolumeCalculator::from_config(&self.config).calculate(
            profile.min_volume(),
            profile.max_volume(),
            &phases,
            &race_dates,
        );
        debug!(weeks = weekly_volumes.len(), "Weekly volumes assigned");

        let mut sessions =
            SessionDistributor::new(&self.config).distribute(&profile, &phases, &weekly_volumes);

        let race = profile.main_race();
        sessions.insert(
            race.date(),
            Session::race(
                race.date(),
                TrainingPhase::Taper,
                race.distance_km(),
                profile.specific_pace(),
                format!("Main race: {}", race.label()),
                false,
            ),
        );

        let plan = TrainingPlan {
            profile,
            sessions,
            phases,
            weekly_volumes,
        };

        info!(
            weeks = plan.phases.total_weeks(),
            development = plan.phases.week_count(TrainingPhase::Development),
            specific = plan.phases.week_count(TrainingPhase::Specific),
            taper = plan.phases.week_count(TrainingPhase::Taper),
            sessions = plan.len(),
            total_km = %plan.total_volume(),
            "Training plan generated"
        );

        Ok(plan)
    }

    /// Drop sessions before `current_date`
    ///
    /// Phases and weekly volumes are kept as generated, including entries
    /// for weeks that no longer hold sessions.
    pub fn adjust_plan(&self, plan: &TrainingPlan, current_date: NaiveDate) -> Result<TrainingPlan> {
        if current_date > plan.race_date() {
            return Err(PlanError::InvalidState(format!(
                "{} is after race day {}",
                current_date,
                plan.race_date()
            )));
        }
        if current_date < plan.start_date() {
            return Ok(plan.clone());
        }

        let adjusted = plan.truncated_from(current_date);
        info!(
            %current_date,
            removed = plan.len() - adjusted.len(),
            remaining = adjusted.len(),
            "Plan adjusted"
        );
        Ok(adjusted)
    }

    /// Generate a plan for `profile` with `overrides` applied
    pub fn simulate_plan(&self, profile: &UserProfile, overrides: &ProfileOverrides) -> Result<TrainingPlan> {
        let derived = overrides.apply(profile, &self.config)?;
        self.generate_plan(&derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pace::Pace;
    use crate::profile::{ProfileInput, RaceInput, RaceKind};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile() -> UserProfile {
        UserProfile::new(ProfileInput {
            start_date: date(2024, 1, 1),
            main_race: RaceInput::new(date(2024, 3, 31), RaceKind::HalfMarathon),
            pace_5k: Pace::from_min_sec(4, 30),
            pace_10k: Pace::from_min_sec(4, 45),
            pace_half: Pace::from_min_sec(5, 0),
            pace_marathon: Pace::from_min_sec(5, 30),
            sessions_per_week: 4,
            min_volume: dec!(20),
            max_volume: dec!(40),
            intermediate_races: Vec::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_plan_generation() {
        let plan = PlanGenerator::default().generate_plan(&profile()).unwrap();

        assert_eq!(plan.len(), 91);
        let race = plan.session(date(2024, 3, 31)).unwrap();
        assert_eq!(race.session_type, SessionType::Race);
        assert_eq!(race.phase, TrainingPhase::Taper);
        assert!(!race.is_intermediate_race);
        assert_eq!(race.total_distance(), dec!(21.1));
        assert_eq!(plan.weekly_volume(0), dec!(20));
    }

    #[test]
    fn test_generation_is_reproducible() {
        let generator = PlanGenerator::default();
        let first = generator.generate_plan(&profile()).unwrap();
        let second = generator.generate_plan(&profile()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_generator_revalidates_profile() {
        let mut config = PlanConfig::default();
        config.min_weeks_before_race = 20;
        let generator = PlanGenerator::new(config).unwrap();

        assert!(matches!(
            generator.generate_plan(&profile()),
            Err(PlanError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PlanConfig::default();
        config.warmup_ratio = dec!(0.5);
        assert!(matches!(PlanGenerator::new(config), Err(PlanError::Configuration(_))));
    }

    #[test]
    fn test_queries() {
        let plan = PlanGenerator::default().generate_plan(&profile()).unwrap();

        let weeks = plan.sessions_by_week();
        assert_eq!(weeks.len(), 13);
        assert!(weeks.values().all(|w| w.len() == 7));

        let by_type = plan.sessions_by_type();
        assert_eq!(by_type[&SessionType::Race].len(), 1);
        assert_eq!(by_type[&SessionType::LongRun].len(), 13);

        assert_eq!(plan.week_number(date(2024, 3, 31)), Some(12));
        assert_eq!(plan.week_dates(12).len(), 7);
        assert_eq!(plan.phase_for_date(date(2024, 1, 10)), Some(TrainingPhase::Development));
        assert_eq!(plan.phase_for_date(date(2024, 5, 1)), None);
        assert!(plan.weekly_duration(3) > Duration::zero());

        let weekly_sum: Duration = (0..13).fold(Duration::zero(), |acc, w| acc + plan.weekly_duration(w));
        assert_eq!(weekly_sum, plan.total_duration());
    }

    #[test]
    fn test_phase_stats() {
        let plan = PlanGenerator::default().generate_plan(&profile()).unwrap();
        let stats = plan.phase_stats();

        let development = &stats[&TrainingPhase::Development];
        assert_eq!(development.weeks, 5);
        assert_eq!(development.start_date, date(2024, 1, 1));
        assert_eq!(development.end_date, date(2024, 2, 4));
        assert_eq!(development.session_counts[&SessionType::Threshold], 5);

        let taper = &stats[&TrainingPhase::Taper];
        assert_eq!(taper.weeks, 4);
        assert_eq!(taper.session_counts[&SessionType::Race], 1);
        assert!(!taper.session_counts.contains_key(&SessionType::Threshold));

        let total: Decimal = stats.values().map(|s| s.total_volume).sum();
        assert_eq!(total, plan.total_volume());
    }

    #[test]
    fn test_adjust_plan() {
        let generator = PlanGenerator::default();
        let plan = generator.generate_plan(&profile()).unwrap();

        let past_race = generator.adjust_plan(&plan, date(2024, 4, 1));
        assert!(matches!(past_race, Err(PlanError::InvalidState(_))));

        let before_start = generator.adjust_plan(&plan, date(2023, 12, 1)).unwrap();
        assert_eq!(before_start, plan);

        let unchanged = generator.adjust_plan(&plan, date(2024, 1, 1)).unwrap();
        assert_eq!(unchanged.len(), 91);

        let adjusted = generator.adjust_plan(&plan, date(2024, 3, 1)).unwrap();
        assert_eq!(adjusted.len(), 31);
        assert!(adjusted.session(date(2024, 2, 29)).is_none());
        assert_eq!(adjusted.weekly_volumes(), plan.weekly_volumes());

        let race_day = generator.adjust_plan(&plan, date(2024, 3, 31)).unwrap();
        assert_eq!(race_day.len(), 1);
    }
}
