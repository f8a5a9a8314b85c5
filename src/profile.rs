//! Race and runner profile inputs
//!
//! `Race` and `UserProfile` can only be obtained through validating
//! constructors. Their plain `*Input` counterparts are what users edit and
//! what gets serialized; deserializing a profile always re-runs validation.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::config::PlanConfig;
use crate::error::ValidationError;
use crate::pace::Pace;

/// Race categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceKind {
    #[serde(rename = "10k")]
    TenK,
    HalfMarathon,
    Marathon,
    /// Any other distance; the distance must be given explicitly
    Other,
}

impl RaceKind {
    /// Official distance in km, None for `Other`
    pub fn standard_distance(&self) -> Option<Decimal> {
        match self {
            RaceKind::TenK => Some(dec!(10.0)),
            RaceKind::HalfMarathon => Some(dec!(21.1)),
            RaceKind::Marathon => Some(dec!(42.2)),
            RaceKind::Other => None,
        }
    }
}

impl fmt::Display for RaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceKind::TenK => write!(f, "10K"),
            RaceKind::HalfMarathon => write!(f, "Half marathon"),
            RaceKind::Marathon => write!(f, "Marathon"),
            RaceKind::Other => write!(f, "Race"),
        }
    }
}

/// Editable race description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceInput {
    pub date: NaiveDate,
    pub kind: RaceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Required for `Other`, ignored for standard kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<Decimal>,
    /// Goal finishing time, written as `hh:mm:ss`
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hms_option")]
    pub target_time: Option<Duration>,
}

impl RaceInput {
    pub fn new(date: NaiveDate, kind: RaceKind) -> Self {
        Self {
            date,
            kind,
            name: None,
            distance_km: None,
            target_time: None,
        }
    }

    pub fn with_distance(mut self, distance_km: Decimal) -> Self {
        self.distance_km = Some(distance_km);
        self
    }

    pub fn with_target_time(mut self, target_time: Duration) -> Self {
        self.target_time = Some(target_time);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A validated race on a Sunday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RaceInput", into = "RaceInput")]
pub struct Race {
    date: NaiveDate,
    kind: RaceKind,
    name: Option<String>,
    distance_km: Decimal,
    target_time: Option<Duration>,
    target_pace: Option<Pace>,
}

impl Race {
    pub fn new(input: RaceInput) -> Result<Self, ValidationError> {
        if input.date.weekday() != Weekday::Sun {
            return Err(ValidationError::RaceNotSunday { date: input.date });
        }

        let distance_km = match input.kind.standard_distance() {
            Some(distance) => distance,
            None => match input.distance_km {
                Some(distance) if distance > Decimal::ZERO => distance,
                _ => return Err(ValidationError::MissingDistance { date: input.date }),
            },
        };

        let target_pace = match input.target_time {
            Some(time) => Some(Pace::from_time_and_distance(time, distance_km).ok_or_else(|| {
                ValidationError::InvalidPace(format!("target time for race on {} is not positive", input.date))
            })?),
            None => None,
        };

        Ok(Self {
            date: input.date,
            kind: input.kind,
            name: input.name,
            distance_km,
            target_time: input.target_time,
            target_pace,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn kind(&self) -> RaceKind {
        self.kind
    }

    pub fn distance_km(&self) -> Decimal {
        self.distance_km
    }

    pub fn target_time(&self) -> Option<Duration> {
        self.target_time
    }

    /// Goal pace derived from the target time
    pub fn target_pace(&self) -> Option<Pace> {
        self.target_pace
    }

    /// Display label, falling back to the race kind and distance
    pub fn label(&self) -> String {
        match (&self.name, self.kind) {
            (Some(name), _) => name.clone(),
            (None, RaceKind::Other) => format!("{} km race", self.distance_km),
            (None, kind) => kind.to_string(),
        }
    }

    pub fn to_input(&self) -> RaceInput {
        RaceInput {
            date: self.date,
            kind: self.kind,
            name: self.name.clone(),
            distance_km: match self.kind {
                RaceKind::Other => Some(self.distance_km),
                _ => None,
            },
            target_time: self.target_time,
        }
    }
}

impl TryFrom<RaceInput> for Race {
    type Error = ValidationError;

    fn try_from(input: RaceInput) -> Result<Self, Self::Error> {
        Race::new(input)
    }
}

impl From<Race> for RaceInput {
    fn from(race: Race) -> Self {
        race.to_input()
    }
}

/// Editable runner profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileInput {
    /// First day of the plan, a Monday
    pub start_date: NaiveDate,

    /// Goal race
    pub main_race: RaceInput,

    /// Reference paces, fastest first
    pub pace_5k: Pace,
    pub pace_10k: Pace,
    pub pace_half: Pace,
    pub pace_marathon: Pace,

    /// Running days per week
    pub sessions_per_week: u8,

    /// Weekly volume bounds in km
    pub min_volume: Decimal,
    pub max_volume: Decimal,

    /// Tune-up races before the main race
    #[serde(default)]
    pub intermediate_races: Vec<RaceInput>,
}

/// A validated runner profile, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProfileInput", into = "ProfileInput")]
pub struct UserProfile {
    start_date: NaiveDate,
    main_race: Race,
    pace_5k: Pace,
    pace_10k: Pace,
    pace_half: Pace,
    pace_marathon: Pace,
    sessions_per_week: u8,
    min_volume: Decimal,
    max_volume: Decimal,
    intermediate_races: Vec<Race>,
}

impl UserProfile {
    /// Validate with the default plan parameters
    pub fn new(input: ProfileInput) -> Result<Self, ValidationError> {
        Self::with_config(input, &PlanConfig::default())
    }

    /// Validate against the lead time and session bounds of `config`
    pub fn with_config(input: ProfileInput, config: &PlanConfig) -> Result<Self, ValidationError> {
        if input.start_date.weekday() != Weekday::Mon {
            return Err(ValidationError::StartNotMonday {
                date: input.start_date,
            });
        }

        let main_race = Race::new(input.main_race)?;
        if main_race.kind() == RaceKind::Other && main_race.target_time().is_none() {
            return Err(ValidationError::MissingTargetTime {
                date: main_race.date(),
            });
        }

        let lead_weeks = (main_race.date() - input.start_date).num_days() / 7;
        if lead_weeks < config.min_weeks_before_race as i64 {
            return Err(ValidationError::InsufficientLeadTime {
                weeks: lead_weeks,
                required: config.min_weeks_before_race,
            });
        }

        if !(input.pace_5k < input.pace_10k
            && input.pace_10k < input.pace_half
            && input.pace_half < input.pace_marathon)
        {
            return Err(ValidationError::PaceOrder);
        }

        for value in [input.min_volume, input.max_volume] {
            if value <= Decimal::ZERO {
                return Err(ValidationError::NonPositiveVolume { value });
            }
        }
        if input.min_volume > input.max_volume {
            return Err(ValidationError::VolumeOrder {
                min: input.min_volume,
                max: input.max_volume,
            });
        }

        if input.sessions_per_week < config.min_sessions_per_week
            || input.sessions_per_week > config.max_sessions_per_week
        {
            return Err(ValidationError::SessionsOutOfRange {
                value: input.sessions_per_week,
                min: config.min_sessions_per_week,
                max: config.max_sessions_per_week,
            });
        }

        let mut seen = HashSet::new();
        let mut intermediate_races = Vec::with_capacity(input.intermediate_races.len());
        for race_input in input.intermediate_races {
            let race = Race::new(race_input)?;
            if race.date() <= input.start_date || race.date() >= main_race.date() {
                return Err(ValidationError::RaceOutsideRange {
                    date: race.date(),
                    start: input.start_date,
                    end: main_race.date(),
                });
            }
            if !seen.insert(race.date()) {
                return Err(ValidationError::DuplicateRaceDate { date: race.date() });
            }
            intermediate_races.push(race);
        }
        intermediate_races.sort_by_key(|r| r.date());

        Ok(Self {
            start_date: input.start_date,
            main_race,
            pace_5k: input.pace_5k,
            pace_10k: input.pace_10k,
            pace_half: input.pace_half,
            pace_marathon: input.pace_marathon,
            sessions_per_week: input.sessions_per_week,
            min_volume: input.min_volume,
            max_volume: input.max_volume,
            intermediate_races,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn race_date(&self) -> NaiveDate {
        self.main_race.date()
    }

    pub fn main_race(&self) -> &Race {
        &self.main_race
    }

    pub fn intermediate_races(&self) -> &[Race] {
        &self.intermediate_races
    }

    /// Intermediate race held on `date`, if any
    pub fn intermediate_race_on(&self, date: NaiveDate) -> Option<&Race> {
        self.intermediate_races.iter().find(|r| r.date() == date)
    }

    pub fn pace_5k(&self) -> Pace {
        self.pace_5k
    }

    pub fn pace_10k(&self) -> Pace {
        self.pace_10k
    }

    pub fn pace_half(&self) -> Pace {
        self.pace_half
    }

    pub fn pace_marathon(&self) -> Pace {
        self.pace_marathon
    }

    pub fn sessions_per_week(&self) -> u8 {
        self.sessions_per_week
    }

    pub fn min_volume(&self) -> Decimal {
        self.min_volume
    }

    pub fn max_volume(&self) -> Decimal {
        self.max_volume
    }

    /// Number of Monday-aligned weeks from start date to race day
    pub fn total_weeks(&self) -> u32 {
        ((self.race_date() - self.start_date).num_days() / 7 + 1) as u32
    }

    /// Pace for easy running and recoveries
    ///
    /// Marathon pace + 30 s for standard races. For other distances the
    /// offset depends on where the goal pace sits: faster than 10K pace
    /// +40 s, faster than marathon pace +30 s, otherwise +20 s.
    pub fn easy_pace(&self) -> Pace {
        match (self.main_race.kind(), self.main_race.target_pace()) {
            (RaceKind::Other, Some(target)) => {
                if target < self.pace_10k {
                    target.plus_seconds(40)
                } else if target < self.pace_marathon {
                    target.plus_seconds(30)
                } else {
                    target.plus_seconds(20)
                }
            }
            _ => self.pace_marathon.plus_seconds(30),
        }
    }

    /// Race pace of the goal race, also used for threshold intervals
    pub fn specific_pace(&self) -> Pace {
        match self.main_race.kind() {
            RaceKind::TenK => self.pace_10k,
            RaceKind::HalfMarathon => self.pace_half,
            RaceKind::Marathon => self.pace_marathon,
            RaceKind::Other => self.main_race.target_pace().unwrap_or(self.pace_marathon),
        }
    }

    /// Editable copy of the profile
    pub fn to_input(&self) -> ProfileInput {
        ProfileInput {
            start_date: self.start_date,
            main_race: self.main_race.to_input(),
            pace_5k: self.pace_5k,
            pace_10k: self.pace_10k,
            pace_half: self.pace_half,
            pace_marathon: self.pace_marathon,
            sessions_per_week: self.sessions_per_week,
            min_volume: self.min_volume,
            max_volume: self.max_volume,
            intermediate_races: self.intermediate_races.iter().map(Race::to_input).collect(),
        }
    }
}

impl TryFrom<ProfileInput> for UserProfile {
    type Error = ValidationError;

    fn try_from(input: ProfileInput) -> Result<Self, Self::Error> {
        UserProfile::new(input)
    }
}

impl From<UserProfile> for ProfileInput {
    fn from(profile: UserProfile) -> Self {
        profile.to_input()
    }
}

/// `Option<Duration>` as an `hh:mm:ss` string
pub(crate) mod hms_option {
    use chrono::Duration;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::pace::{format_duration, parse_duration};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&format_duration(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => parse_duration(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid duration '{}', expected hh:mm:ss", s))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn base_input() -> ProfileInput {
        ProfileInput {
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
        }
    }

    #[test]
    fn test_valid_profile() {
        let profile = UserProfile::new(base_input()).unwrap();
        assert_eq!(profile.total_weeks(), 13);
        assert_eq!(profile.specific_pace(), Pace::from_min_sec(5, 0));
        assert_eq!(profile.easy_pace(), Pace::from_min_sec(6, 0));
        assert_eq!(profile.main_race().distance_km(), dec!(21.1));
    }

    #[test]
    fn test_pace_order_violation() {
        let mut input = base_input();
        input.pace_10k = Pace::from_min_sec(4, 20);
        assert_eq!(UserProfile::new(input), Err(ValidationError::PaceOrder));
    }

    #[test]
    fn test_date_checks() {
        let mut input = base_input();
        input.start_date = date(2024, 1, 2);
        assert!(matches!(
            UserProfile::new(input),
            Err(ValidationError::StartNotMonday { .. })
        ));

        let mut input = base_input();
        input.main_race.date = date(2024, 3, 30);
        assert!(matches!(
            UserProfile::new(input),
            Err(ValidationError::RaceNotSunday { .. })
        ));

        let mut input = base_input();
        input.main_race.date = date(2024, 3, 17);
        assert_eq!(
            UserProfile::new(input),
            Err(ValidationError::InsufficientLeadTime { weeks: 10, required: 12 })
        );
    }

    #[test]
    fn test_volume_and_session_checks() {
        let mut input = base_input();
        input.min_volume = dec!(50);
        assert!(matches!(
            UserProfile::new(input),
            Err(ValidationError::VolumeOrder { .. })
        ));

        let mut input = base_input();
        input.min_volume = Decimal::ZERO;
        assert!(matches!(
            UserProfile::new(input),
            Err(ValidationError::NonPositiveVolume { .. })
        ));

        let mut input = base_input();
        input.sessions_per_week = 2;
        assert!(matches!(
            UserProfile::new(input),
            Err(ValidationError::SessionsOutOfRange { value: 2, .. })
        ));
    }

    #[test]
    fn test_intermediate_race_checks() {
        let mut input = base_input();
        input.intermediate_races = vec![
            RaceInput::new(date(2024, 3, 3), RaceKind::TenK),
            RaceInput::new(date(2024, 1, 21), RaceKind::TenK),
        ];
        let profile = UserProfile::new(input).unwrap();
        assert_eq!(profile.intermediate_races()[0].date(), date(2024, 1, 21));
        assert!(profile.intermediate_race_on(date(2024, 3, 3)).is_some());

        let mut input = base_input();
        input.intermediate_races = vec![RaceInput::new(date(2024, 3, 31), RaceKind::TenK)];
        assert!(matches!(
            UserProfile::new(input),
            Err(ValidationError::RaceOutsideRange { .. })
        ));

        let mut input = base_input();
        input.intermediate_races = vec![
            RaceInput::new(date(2024, 2, 4), RaceKind::TenK),
            RaceInput::new(date(2024, 2, 4), RaceKind::HalfMarathon),
        ];
        assert!(matches!(
            UserProfile::new(input),
            Err(ValidationError::DuplicateRaceDate { .. })
        ));

        let mut input = base_input();
        input.intermediate_races = vec![RaceInput::new(date(2024, 2, 4), RaceKind::Other)];
        assert!(matches!(
            UserProfile::new(input),
            Err(ValidationError::MissingDistance { .. })
        ));
    }

    #[test]
    fn test_other_race_paces() {
        let mut input = base_input();
        input.main_race = RaceInput::new(date(2024, 3, 31), RaceKind::Other).with_distance(dec!(15));
        assert!(matches!(
            UserProfile::new(input.clone()),
            Err(ValidationError::MissingTargetTime { .. })
        ));

        // 15 km in 1:10:00 => 04:40/km, faster than 10K pace
        input.main_race.target_time = Some(Duration::seconds(4200));
        let profile = UserProfile::new(input.clone()).unwrap();
        assert_eq!(profile.specific_pace(), Pace::from_min_sec(4, 40));
        assert_eq!(profile.easy_pace(), Pace::from_min_sec(5, 20));

        // 05:10/km sits between 10K and marathon pace
        input.main_race.target_time = Some(Duration::seconds(15 * 310));
        let profile = UserProfile::new(input.clone()).unwrap();
        assert_eq!(profile.easy_pace(), Pace::from_min_sec(5, 40));

        // 06:00/km is slower than marathon pace
        input.main_race.target_time = Some(Duration::seconds(15 * 360));
        let profile = UserProfile::new(input).unwrap();
        assert_eq!(profile.easy_pace(), Pace::from_min_sec(6, 20));
    }

    #[test]
    fn test_config_bounds_are_honoured() {
        let mut config = PlanConfig::default();
        config.min_weeks_before_race = 14;
        assert!(matches!(
            UserProfile::with_config(base_input(), &config),
            Err(ValidationError::InsufficientLeadTime { required: 14, .. })
        ));
    }

    #[test]
    fn test_profile_serde_revalidates() {
        let profile = UserProfile::new(base_input()).unwrap();
        let json = serde_json::to_string(&profile).unwrap();
        let back: UserProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(profile, back);

        let broken = json.replace("2024-01-01", "2024-01-02");
        assert!(serde_json::from_str::<UserProfile>(&broken).is_err());
    }

    #[test]
    fn test_profile_from_toml() {
        let toml_str = r#"
            start_date = "2024-01-01"
            pace_5k = "04:30"
            pace_10k = "04:45"
            pace_half = "05:00"
            pace_marathon = "05:30"
            sessions_per_week = 5
            min_volume = "30"
            max_volume = "50"

            [main_race]
            date = "2024-03-31"
            kind = "marathon"
            target_time = "03:50:00"

            [[intermediate_races]]
            date = "2024-02-25"
            kind = "half_marathon"
        "#;
        let profile: UserProfile = toml::from_str(toml_str).unwrap();
        assert_eq!(profile.main_race().kind(), RaceKind::Marathon);
        assert_eq!(profile.main_race().target_time(), Some(Duration::seconds(13800)));
        assert_eq!(profile.intermediate_races().len(), 1);
        assert_eq!(profile.sessions_per_week(), 5);
    }
}
