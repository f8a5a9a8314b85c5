//! Running pace and duration helpers
//!
//! Paces are stored as seconds per kilometre. The Riegel estimates at the
//! bottom are convenience helpers for choosing reference paces; plan
//! generation never calls them.

use chrono::Duration;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Riegel fatigue exponent
const RIEGEL_EXPONENT: f64 = 1.06;

/// Pace in seconds per kilometre
///
/// Serialized as `"mm:ss"` (with a fractional seconds part when needed) so
/// profile files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pace(Decimal);

impl Pace {
    /// Build a pace from seconds per kilometre, rejecting non-positive values
    pub fn from_seconds(seconds: Decimal) -> Result<Self, ValidationError> {
        if seconds <= Decimal::ZERO {
            return Err(ValidationError::InvalidPace(format!(
                "{} s/km is not a positive pace",
                seconds
            )));
        }
        Ok(Pace(seconds.round_dp(3)))
    }

    /// Build a pace from whole minutes and seconds per kilometre
    pub fn from_min_sec(minutes: u32, seconds: u32) -> Self {
        Pace(Decimal::from(minutes * 60 + seconds))
    }

    /// Pace needed to cover `distance_km` in `time`
    pub fn from_time_and_distance(time: Duration, distance_km: Decimal) -> Option<Self> {
        if distance_km <= Decimal::ZERO {
            return None;
        }
        let seconds = Decimal::from(time.num_milliseconds()) / dec!(1000);
        Pace::from_seconds(seconds / distance_km).ok()
    }

    /// Seconds per kilometre
    pub fn seconds(&self) -> Decimal {
        self.0
    }

    /// A slower (positive) or faster (negative) pace
    pub fn plus_seconds(&self, seconds: i64) -> Self {
        Pace(self.0 + Decimal::from(seconds))
    }

    /// Distance covered in one minute at this pace
    pub fn km_per_minute(&self) -> Decimal {
        dec!(60).checked_div(self.0).unwrap_or(Decimal::ZERO)
    }

    /// Time needed to run `distance_km` at this pace, to the millisecond
    pub fn duration_for(&self, distance_km: Decimal) -> Duration {
        let millis = (self.0 * distance_km * dec!(1000)).round();
        Duration::milliseconds(millis.to_i64().unwrap_or(0))
    }

    /// Lossless `mm:ss[.fff]` form used for serialization
    fn to_canonical(self) -> String {
        let total = self.0.normalize();
        let minutes = (total / dec!(60)).floor();
        let seconds = total - minutes * dec!(60);
        let whole = seconds.trunc();
        let (minutes, whole_seconds) = (minutes.to_i64().unwrap_or(0), whole.to_i64().unwrap_or(0));

        if seconds.fract().is_zero() {
            format!("{:02}:{:02}", minutes, whole_seconds)
        } else {
            let fraction = (seconds - whole).normalize().to_string();
            format!("{:02}:{:02}{}", minutes, whole_seconds, fraction.trim_start_matches('0'))
        }
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.round().to_i64().unwrap_or(0);
        write!(f, "{:02}:{:02}/km", total / 60, total % 60)
    }
}

impl FromStr for Pace {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches("/km").trim();
        let invalid = || ValidationError::InvalidPace(format!("expected mm:ss, got '{}'", s));

        let (minutes, seconds) = trimmed.split_once(':').ok_or_else(invalid)?;
        let minutes: u32 = minutes.trim().parse().map_err(|_| invalid())?;
        let seconds = Decimal::from_str(seconds.trim()).map_err(|_| invalid())?;
        if seconds < Decimal::ZERO || seconds >= dec!(60) {
            return Err(invalid());
        }

        Pace::from_seconds(Decimal::from(minutes) * dec!(60) + seconds)
    }
}

impl TryFrom<String> for Pace {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pace> for String {
    fn from(pace: Pace) -> Self {
        pace.to_canonical()
    }
}

/// Parse `hh:mm:ss` or `mm:ss` into a duration
pub fn parse_duration(s: &str) -> Option<Duration> {
    let parts: Vec<i64> = s
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<i64>())
        .collect::<Result<_, _>>()
        .ok()?;

    if parts.iter().any(|p| *p < 0) {
        return None;
    }

    match parts.as_slice() {
        [h, m, sec] if *m < 60 && *sec < 60 => Some(Duration::seconds(h * 3600 + m * 60 + sec)),
        [m, sec] if *sec < 60 => Some(Duration::seconds(m * 60 + sec)),
        _ => None,
    }
}

/// Format a duration as `hh:mm:ss`, rounded to the second
pub fn format_duration(duration: Duration) -> String {
    let total = (duration.num_milliseconds() + 500).div_euclid(1000).max(0);
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Serde helper storing a duration as whole milliseconds
pub mod duration_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        Ok(Duration::milliseconds(millis))
    }

    /// Same encoding for optional durations
    pub mod option {
        use chrono::Duration;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_some(&d.num_milliseconds()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let millis = Option::<i64>::deserialize(deserializer)?;
            Ok(millis.map(Duration::milliseconds))
        }
    }
}

/// Riegel race-time prediction: T2 = T1 * (D2 / D1)^1.06
pub fn riegel_time(reference_km: Decimal, reference_time: Duration, target_km: Decimal) -> Option<Duration> {
    let reference = reference_km.to_f64()?;
    let target = target_km.to_f64()?;
    if reference <= 0.0 || target <= 0.0 {
        return None;
    }

    let seconds = reference_time.num_milliseconds() as f64 / 1000.0;
    let predicted = seconds * (target / reference).powf(RIEGEL_EXPONENT);
    Some(Duration::seconds(predicted.round() as i64))
}

/// Riegel-equivalent paces over the standard race distances
pub fn equivalent_paces(reference: Pace, reference_km: Decimal) -> Vec<(&'static str, Pace)> {
    let reference_time = reference.duration_for(reference_km);

    [
        ("5K", dec!(5.0)),
        ("10K", dec!(10.0)),
        ("Half marathon", dec!(21.1)),
        ("Marathon", dec!(42.2)),
    ]
    .into_iter()
    .filter_map(|(name, km)| {
        let time = riegel_time(reference_km, reference_time, km)?;
        Pace::from_time_and_distance(time, km).map(|pace| (name, pace))
    })
    .collect()
}
