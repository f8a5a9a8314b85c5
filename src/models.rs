use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pace::{duration_millis, format_duration, Pace};

/// Training phases, in plan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrainingPhase {
    /// General aerobic development
    Development,
    /// Race-specific preparation
    Specific,
    /// Volume reduction before race day
    Taper,
}

impl TrainingPhase {
    pub const ALL: [TrainingPhase; 3] = [
        TrainingPhase::Development,
        TrainingPhase::Specific,
        TrainingPhase::Taper,
    ];
}

impl fmt::Display for TrainingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingPhase::Development => write!(f, "Development"),
            TrainingPhase::Specific => write!(f, "Specific"),
            TrainingPhase::Taper => write!(f, "Taper"),
        }
    }
}

/// Session types for a single calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionType {
    LongRun,
    Threshold,
    Easy,
    Rest,
    Race,
}

impl SessionType {
    pub const ALL: [SessionType; 5] = [
        SessionType::LongRun,
        SessionType::Threshold,
        SessionType::Easy,
        SessionType::Rest,
        SessionType::Race,
    ];

    /// Weight applied to distance in the difficulty score
    fn difficulty_factor(&self) -> Decimal {
        match self {
            SessionType::Easy => dec!(1.0),
            SessionType::LongRun => dec!(1.5),
            SessionType::Threshold => dec!(2.0),
            SessionType::Race => dec!(2.5),
            SessionType::Rest => Decimal::ZERO,
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::LongRun => write!(f, "Long run"),
            SessionType::Threshold => write!(f, "Threshold"),
            SessionType::Easy => write!(f, "Easy"),
            SessionType::Rest => write!(f, "Rest"),
            SessionType::Race => write!(f, "Race"),
        }
    }
}

/// Charge/discharge marker for a week in the periodization cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekLoad {
    Charge,
    Discharge,
}

/// Warm-up / main block proportions of a structured session; the cool-down
/// takes whatever distance is left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSplit {
    pub warmup: Decimal,
    pub active: Decimal,
}

impl BlockSplit {
    /// Split a rounded total into (warm-up, active, cool-down) distances
    fn distances(&self, total: Decimal) -> (Decimal, Decimal, Decimal) {
        let warmup = (total * self.warmup).round_dp(1);
        let active = (total * self.active).round_dp(1);
        let cooldown = (total - warmup - active).round_dp(1);
        (warmup, active, cooldown)
    }
}

/// Atomic effort segment within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBlock {
    /// Distance in kilometres
    pub distance_km: Decimal,

    /// Target pace for the segment
    pub pace: Pace,

    /// Free-text description
    pub description: String,
}

impl SessionBlock {
    pub fn new(distance_km: Decimal, pace: Pace, description: impl Into<String>) -> Self {
        Self {
            distance_km,
            pace,
            description: description.into(),
        }
    }

    /// Time spent on the block (pace x distance)
    pub fn duration(&self) -> Duration {
        self.pace.duration_for(self.distance_km)
    }
}

/// One calendar day of the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Calendar date
    pub date: NaiveDate,

    /// Kind of session
    pub session_type: SessionType,

    /// Phase the session belongs to
    pub phase: TrainingPhase,

    /// Ordered blocks, empty for rest days
    pub blocks: Vec<SessionBlock>,

    /// Human-readable summary
    pub description: String,

    /// Race session that is not the main race
    pub is_intermediate_race: bool,
}

impl Session {
    /// Continuous run at easy pace
    pub fn easy(
        date: NaiveDate,
        phase: TrainingPhase,
        distance_km: Decimal,
        easy_pace: Pace,
        description: Option<String>,
    ) -> Self {
        let distance = distance_km.round_dp(1);
        let block = SessionBlock::new(distance, easy_pace, format!("Continuous run at {}", easy_pace));

        Self {
            date,
            session_type: SessionType::Easy,
            phase,
            blocks: vec![block],
            description: description.unwrap_or_else(|| format!("Easy run of {} km", distance)),
            is_intermediate_race: false,
        }
    }

    /// Long run: race-pace main block in the Specific phase, all easy otherwise
    pub fn long_run(
        date: NaiveDate,
        phase: TrainingPhase,
        distance_km: Decimal,
        easy_pace: Pace,
        specific_pace: Pace,
        split: BlockSplit,
    ) -> Self {
        let total = distance_km.round_dp(1);

        let (blocks, description) = if phase == TrainingPhase::Specific {
            let (warmup, active, cooldown) = split.distances(total);
            (
                vec![
                    SessionBlock::new(warmup, easy_pace, format!("Warm-up at {}", easy_pace)),
                    SessionBlock::new(active, specific_pace, format!("Main block at {}", specific_pace)),
                    SessionBlock::new(cooldown, easy_pace, format!("Cool-down at {}", easy_pace)),
                ],
                format!("Long run of {} km with {} km at race pace", total, active),
            )
        } else {
            (
                vec![SessionBlock::new(total, easy_pace, format!("Continuous run at {}", easy_pace))],
                format!("Long run of {} km at easy pace", total),
            )
        };

        Self {
            date,
            session_type: SessionType::LongRun,
            phase,
            blocks,
            description,
            is_intermediate_race: false,
        }
    }

    /// Threshold session: warm-up, `interval_minutes` on/off repeats, cool-down
    pub fn threshold(
        date: NaiveDate,
        phase: TrainingPhase,
        distance_km: Decimal,
        easy_pace: Pace,
        threshold_pace: Pace,
        interval_minutes: u32,
        split: BlockSplit,
    ) -> Self {
        let total = distance_km.round_dp(1);
        let (warmup, active, cooldown) = split.distances(total);

        let minutes = Decimal::from(interval_minutes.max(1));
        let threshold_per_rep = minutes * threshold_pace.km_per_minute();
        let recovery_per_rep = minutes * easy_pace.km_per_minute();
        let reps = active
            .checked_div(threshold_per_rep + recovery_per_rep)
            .map(|r| r.round().to_u32().unwrap_or(1))
            .unwrap_or(1)
            .max(1);

        let threshold_distance = threshold_per_rep.round_dp(1);
        let recovery_distance = recovery_per_rep.round_dp(1);

        let mut blocks = Vec::with_capacity(reps as usize * 2 + 2);
        blocks.push(SessionBlock::new(warmup, easy_pace, format!("Warm-up at {}", easy_pace)));
        for rep in 1..=reps {
            blocks.push(SessionBlock::new(
                threshold_distance,
                threshold_pace,
                format!("Interval {}/{} at {}", rep, reps, threshold_pace),
            ));
            blocks.push(SessionBlock::new(
                recovery_distance,
                easy_pace,
                format!("Recovery {}/{} at {}", rep, reps, easy_pace),
            ));
        }
        blocks.push(SessionBlock::new(cooldown, easy_pace, format!("Cool-down at {}", easy_pace)));

        let description = format!(
            "Threshold: {} warm-up at {}, {}x({}' at {} / {}' at {}), {} cool-down at {}",
            format_duration(easy_pace.duration_for(warmup)),
            easy_pace,
            reps,
            interval_minutes,
            threshold_pace,
            interval_minutes,
            easy_pace,
            format_duration(easy_pace.duration_for(cooldown)),
            easy_pace,
        );

        Self {
            date,
            session_type: SessionType::Threshold,
            phase,
            blocks,
            description,
            is_intermediate_race: false,
        }
    }

    /// Rest day, no blocks
    pub fn rest(date: NaiveDate, phase: TrainingPhase) -> Self {
        Self {
            date,
            session_type: SessionType::Rest,
            phase,
            blocks: Vec::new(),
            description: "Rest day".to_string(),
            is_intermediate_race: false,
        }
    }

    /// Race day, single block at race pace
    pub fn race(
        date: NaiveDate,
        phase: TrainingPhase,
        distance_km: Decimal,
        pace: Pace,
        description: impl Into<String>,
        is_intermediate: bool,
    ) -> Self {
        let distance = distance_km.round_dp(1);

        Self {
            date,
            session_type: SessionType::Race,
            phase,
            blocks: vec![SessionBlock::new(distance, pace, format!("Race at {}", pace))],
            description: description.into(),
            is_intermediate_race: is_intermediate,
        }
    }

    /// Sum of block distances, rounded to 0.1 km
    pub fn total_distance(&self) -> Decimal {
        self.blocks
            .iter()
            .map(|b| b.distance_km)
            .sum::<Decimal>()
            .round_dp(1)
    }

    /// Sum of block durations, rounded to the second
    pub fn total_duration(&self) -> Duration {
        let millis: i64 = self.blocks.iter().map(|b| b.duration().num_milliseconds()).sum();
        Duration::seconds((millis + 500).div_euclid(1000))
    }

    /// Type-weighted distance scaled by intensity (faster average pace scores higher)
    pub fn difficulty_score(&self) -> Decimal {
        if self.session_type == SessionType::Rest {
            return Decimal::ZERO;
        }

        let total = self.total_distance();
        let base = total * self.session_type.difficulty_factor();
        if total.is_zero() {
            return base.round_dp(2);
        }

        let weighted_pace: Decimal = self
            .blocks
            .iter()
            .map(|b| b.pace.seconds() * b.distance_km / total)
            .sum();

        match dec!(360).checked_div(weighted_pace) {
            Some(intensity) => (base * intensity).round_dp(2),
            None => base.round_dp(2),
        }
    }

    /// Whether the day involves running
    pub fn is_training(&self) -> bool {
        self.session_type != SessionType::Rest
    }
}

/// Serializable summary row of a session, used by exports and the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub date: NaiveDate,
    pub session_type: SessionType,
    pub phase: TrainingPhase,
    pub distance_km: Decimal,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub description: String,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            date: session.date,
            session_type: session.session_type,
            phase: session.phase,
            distance_km: session.total_distance(),
            duration: session.total_duration(),
            description: session.description.clone(),
        }
    }
}
