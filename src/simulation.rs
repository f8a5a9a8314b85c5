//! What-if support: profile overrides, plan comparison and preset scenarios

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::PlanConfig;
use crate::error::ValidationError;
use crate::models::{SessionType, TrainingPhase};
use crate::pace::{duration_millis, Pace};
use crate::profile::{RaceInput, RaceKind, UserProfile};
use crate::training_plan::TrainingPlan;
use crate::volume::WeeklyVolumes;

/// Partial replacement of the main race
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceOverride {
    pub date: Option<NaiveDate>,
    pub kind: Option<RaceKind>,
    pub name: Option<String>,
    pub distance_km: Option<Decimal>,
    #[serde(with = "crate::profile::hms_option", skip_serializing_if = "Option::is_none")]
    pub target_time: Option<Duration>,
}

/// Fields to replace in a profile; unset fields keep their value
///
/// Intermediate races are merged by date: an override on the date of an
/// existing race replaces it, any other override is added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOverrides {
    pub start_date: Option<NaiveDate>,
    pub main_race: Option<RaceOverride>,
    pub pace_5k: Option<Pace>,
    pub pace_10k: Option<Pace>,
    pub pace_half: Option<Pace>,
    pub pace_marathon: Option<Pace>,
    pub sessions_per_week: Option<u8>,
    pub min_volume: Option<Decimal>,
    pub max_volume: Option<Decimal>,
    pub intermediate_races: Vec<RaceInput>,
}

impl ProfileOverrides {
    pub fn is_empty(&self) -> bool {
        *self == ProfileOverrides::default()
    }

    /// Validated copy of `profile` with the overrides applied
    pub fn apply(&self, profile: &UserProfile, config: &PlanConfig) -> Result<UserProfile, ValidationError> {
        let mut input = profile.to_input();

        if let Some(start_date) = self.start_date {
            input.start_date = start_date;
        }
        if let Some(race) = &self.main_race {
            let main = &mut input.main_race;
            if let Some(date) = race.date {
                main.date = date;
            }
            if let Some(kind) = race.kind {
                main.kind = kind;
            }
            if race.name.is_some() {
                main.name = race.name.clone();
            }
            if race.distance_km.is_some() {
                main.distance_km = race.distance_km;
            }
            if race.target_time.is_some() {
                main.target_time = race.target_time;
            }
        }

        input.pace_5k = self.pace_5k.unwrap_or(input.pace_5k);
        input.pace_10k = self.pace_10k.unwrap_or(input.pace_10k);
        input.pace_half = self.pace_half.unwrap_or(input.pace_half);
        input.pace_marathon = self.pace_marathon.unwrap_or(input.pace_marathon);
        input.sessions_per_week = self.sessions_per_week.unwrap_or(input.sessions_per_week);
        input.min_volume = self.min_volume.unwrap_or(input.min_volume);
        input.max_volume = self.max_volume.unwrap_or(input.max_volume);

        for replacement in &self.intermediate_races {
            match input
                .intermediate_races
                .iter_mut()
                .find(|r| r.date == replacement.date)
            {
                Some(existing) => *existing = replacement.clone(),
                None => input.intermediate_races.push(replacement.clone()),
            }
        }

        UserProfile::with_config(input, config)
    }
}

/// Preset what-if variation of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub overrides: ProfileOverrides,
}

/// Standard variations: session count, volume, later start and pace shifts
pub fn scenarios(profile: &UserProfile) -> Vec<Scenario> {
    let bounds = PlanConfig::default();
    let sessions = profile.sessions_per_week();
    let mut scenarios = Vec::new();

    if sessions < bounds.max_sessions_per_week {
        scenarios.push(Scenario {
            name: format!("Increase to {} sessions per week", sessions + 1),
            description: "More weekly sessions to spread the load".to_string(),
            overrides: ProfileOverrides {
                sessions_per_week: Some(sessions + 1),
                ..Default::default()
            },
        });
    }
    if sessions > bounds.min_sessions_per_week {
        scenarios.push(Scenario {
            name: format!("Reduce to {} sessions per week", sessions - 1),
            description: "Fewer, longer sessions".to_string(),
            overrides: ProfileOverrides {
                sessions_per_week: Some(sessions - 1),
                ..Default::default()
            },
        });
    }

    for (name, description, factor) in [
        ("Increase volume (+20%)", "More kilometres for endurance", dec!(1.2)),
        ("Reduce volume (-20%)", "Fewer kilometres to limit injury risk", dec!(0.8)),
    ] {
        scenarios.push(Scenario {
            name: name.to_string(),
            description: description.to_string(),
            overrides: ProfileOverrides {
                min_volume: Some((profile.min_volume() * factor).round_dp(1)),
                max_volume: Some((profile.max_volume() * factor).round_dp(1)),
                ..Default::default()
            },
        });
    }

    let lead_weeks = (profile.race_date() - profile.start_date()).num_days() / 7;
    if lead_weeks > 16 {
        scenarios.push(Scenario {
            name: "Start 4 weeks later".to_string(),
            description: "Shorter preparation period".to_string(),
            overrides: ProfileOverrides {
                start_date: Some(profile.start_date() + Duration::weeks(4)),
                ..Default::default()
            },
        });
    }

    for (name, description, sign) in [
        ("Faster paces", "Harder training towards an ambitious goal", -1),
        ("Slower paces", "Easier training for comfort", 1),
    ] {
        scenarios.push(Scenario {
            name: name.to_string(),
            description: description.to_string(),
            overrides: ProfileOverrides {
                pace_5k: Some(profile.pace_5k().plus_seconds(sign * 10)),
                pace_10k: Some(profile.pace_10k().plus_seconds(sign * 8)),
                pace_half: Some(profile.pace_half().plus_seconds(sign * 5)),
                pace_marathon: Some(profile.pace_marathon().plus_seconds(sign * 3)),
                ..Default::default()
            },
        });
    }

    scenarios
}

/// Total volume of two plans side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeComparison {
    pub original: Decimal,
    pub simulated: Decimal,
    pub difference: Decimal,
    /// Difference relative to the original, 0 when the original is empty
    pub difference_percent: Decimal,
}

/// Week count and volume of a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub weeks: u32,
    pub total_volume: Decimal,
}

/// Differences between an original and a simulated plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanComparison {
    pub volume: VolumeComparison,
    #[serde(with = "duration_millis")]
    pub original_duration: Duration,
    #[serde(with = "duration_millis")]
    pub simulated_duration: Duration,
    #[serde(with = "duration_millis")]
    pub duration_difference: Duration,
    pub original_session_counts: BTreeMap<SessionType, usize>,
    pub simulated_session_counts: BTreeMap<SessionType, usize>,
    pub original_weekly_volumes: WeeklyVolumes,
    pub simulated_weekly_volumes: WeeklyVolumes,
    pub original_phases: BTreeMap<TrainingPhase, PhaseSummary>,
    pub simulated_phases: BTreeMap<TrainingPhase, PhaseSummary>,
}

pub fn compare_plans(original: &TrainingPlan, simulated: &TrainingPlan) -> PlanComparison {
    let original_volume = original.total_volume();
    let simulated_volume = simulated.total_volume();
    let difference = simulated_volume - original_volume;
    let difference_percent = (difference * dec!(100))
        .checked_div(original_volume)
        .unwrap_or(Decimal::ZERO)
        .round_dp(1);

    let original_duration = original.total_duration();
    let simulated_duration = simulated.total_duration();

    PlanComparison {
        volume: VolumeComparison {
            original: original_volume,
            simulated: simulated_volume,
            difference,
            difference_percent,
        },
        original_duration,
        simulated_duration,
        duration_difference: simulated_duration - original_duration,
        original_session_counts: session_counts(original),
        simulated_session_counts: session_counts(simulated),
        original_weekly_volumes: original.weekly_volumes().clone(),
        simulated_weekly_volumes: simulated.weekly_volumes().clone(),
        original_phases: phase_summaries(original),
        simulated_phases: phase_summaries(simulated),
    }
}

fn session_counts(plan: &TrainingPlan) -> BTreeMap<SessionType, usize> {
    plan.sessions_by_type()
        .into_iter()
        .map(|(session_type, sessions)| (session_type, sessions.len()))
        .collect()
}

fn phase_summaries(plan: &TrainingPlan) -> BTreeMap<TrainingPhase, PhaseSummary> {
    plan.phase_stats()
        .into_iter()
        .map(|(phase, stats)| {
            (
                phase,
                PhaseSummary {
                    weeks: stats.weeks,
                    total_volume: stats.total_volume,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileInput;
    use crate::training_plan::PlanGenerator;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile_with(race_date: NaiveDate, races: Vec<RaceInput>) -> UserProfile {
        UserProfile::new(ProfileInput {
            start_date: date(2024, 1, 1),
            main_race: RaceInput::new(race_date, RaceKind::Marathon),
            pace_5k: Pace::from_min_sec(4, 30),
            pace_10k: Pace::from_min_sec(4, 45),
            pace_half: Pace::from_min_sec(5, 0),
            pace_marathon: Pace::from_min_sec(5, 30),
            sessions_per_week: 4,
            min_volume: dec!(30),
            max_volume: dec!(50),
            intermediate_races: races,
        })
        .unwrap()
    }

    #[test]
    fn test_overrides_replace_fields() {
        let profile = profile_with(date(2024, 3, 31), Vec::new());
        let overrides = ProfileOverrides {
            sessions_per_week: Some(6),
            max_volume: Some(dec!(60)),
            main_race: Some(RaceOverride {
                kind: Some(RaceKind::HalfMarathon),
                ..Default::default()
            }),
            ..Default::default()
        };

        let derived = overrides.apply(&profile, &PlanConfig::default()).unwrap();
        assert_eq!(derived.sessions_per_week(), 6);
        assert_eq!(derived.max_volume(), dec!(60));
        assert_eq!(derived.min_volume(), dec!(30));
        assert_eq!(derived.main_race().kind(), RaceKind::HalfMarathon);
        assert_eq!(derived.race_date(), date(2024, 3, 31));
        // Original untouched
        assert_eq!(profile.sessions_per_week(), 4);
    }

    #[test]
    fn test_intermediate_races_merged_by_date() {
        let profile = profile_with(
            date(2024, 3, 31),
            vec![
                RaceInput::new(date(2024, 2, 4), RaceKind::TenK),
                RaceInput::new(date(2024, 3, 3), RaceKind::TenK),
            ],
        );
        let overrides = ProfileOverrides {
            intermediate_races: vec![
                RaceInput::new(date(2024, 2, 4), RaceKind::HalfMarathon),
                RaceInput::new(date(2024, 2, 18), RaceKind::TenK),
            ],
            ..Default::default()
        };

        let derived = overrides.apply(&profile, &PlanConfig::default()).unwrap();
        let races: Vec<(NaiveDate, RaceKind)> = derived
            .intermediate_races()
            .iter()
            .map(|r| (r.date(), r.kind()))
            .collect();
        assert_eq!(
            races,
            vec![
                (date(2024, 2, 4), RaceKind::HalfMarathon),
                (date(2024, 2, 18), RaceKind::TenK),
                (date(2024, 3, 3), RaceKind::TenK),
            ]
        );
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let profile = profile_with(date(2024, 3, 31), Vec::new());
        let overrides = ProfileOverrides {
            pace_10k: Some(Pace::from_min_sec(4, 20)),
            ..Default::default()
        };
        assert_eq!(
            overrides.apply(&profile, &PlanConfig::default()),
            Err(ValidationError::PaceOrder)
        );
    }

    #[test]
    fn test_scenarios() {
        let short = profile_with(date(2024, 3, 31), Vec::new());
        let names: Vec<String> = scenarios(&short).into_iter().map(|s| s.name).collect();
        assert_eq!(names.len(), 6);
        assert!(!names.iter().any(|n| n.contains("later")));

        let long = profile_with(date(2024, 5, 26), Vec::new());
        let all = scenarios(&long);
        assert_eq!(all.len(), 7);

        let later = all.iter().find(|s| s.name.contains("later")).unwrap();
        assert_eq!(later.overrides.start_date, Some(date(2024, 1, 29)));

        let more = all.iter().find(|s| s.name.contains("+20%")).unwrap();
        assert_eq!(more.overrides.min_volume, Some(dec!(36.0)));
        assert_eq!(more.overrides.max_volume, Some(dec!(60.0)));

        let faster = all.iter().find(|s| s.name == "Faster paces").unwrap();
        assert_eq!(faster.overrides.pace_5k, Some(Pace::from_min_sec(4, 20)));
        assert_eq!(faster.overrides.pace_marathon, Some(Pace::from_min_sec(5, 27)));
    }

    #[test]
    fn test_scenarios_respect_session_bounds() {
        let mut input = profile_with(date(2024, 3, 31), Vec::new()).to_input();
        input.sessions_per_week = 7;
        let profile = UserProfile::new(input).unwrap();

        let names: Vec<String> = scenarios(&profile).into_iter().map(|s| s.name).collect();
        assert!(names.iter().any(|n| n == "Reduce to 6 sessions per week"));
        assert!(!names.iter().any(|n| n.starts_with("Increase to")));
    }

    #[test]
    fn test_compare_plans() {
        let generator = PlanGenerator::default();
        let profile = profile_with(date(2024, 3, 31), Vec::new());
        let original = generator.generate_plan(&profile).unwrap();

        let overrides = ProfileOverrides {
            min_volume: Some(dec!(36)),
            max_volume: Some(dec!(60)),
            ..Default::default()
        };
        let simulated = generator.simulate_plan(&profile, &overrides).unwrap();
        let comparison = compare_plans(&original, &simulated);

        assert!(comparison.volume.difference > Decimal::ZERO);
        assert!(comparison.volume.difference_percent > dec!(10));
        assert!(comparison.duration_difference > Duration::zero());
        assert_eq!(comparison.original_session_counts, comparison.simulated_session_counts);
        assert_eq!(comparison.original_phases[&TrainingPhase::Taper].weeks, 4);
        assert_eq!(comparison.simulated_weekly_volumes[&0], dec!(36));

        let same = compare_plans(&original, &original);
        assert_eq!(same.volume.difference, Decimal::ZERO);
        assert_eq!(same.volume.difference_percent, Decimal::ZERO);
    }
}
