//! Plan exports: session and weekly CSV, JSON and a plain-text calendar

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::models::{SessionType, TrainingPhase};
use crate::training_plan::{PhaseStats, TrainingPlan};

pub mod csv;
pub mod json;
pub mod text;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Text => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
}

impl From<::csv::Error> for ExportError {
    fn from(err: ::csv::Error) -> Self {
        ExportError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::SerializationError(err.to_string())
    }
}

/// Totals for one plan week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    /// 1-based week number
    pub week: u32,
    pub week_start: NaiveDate,
    pub phase: TrainingPhase,
    pub target_volume: Decimal,
    pub planned_volume: Decimal,
    #[serde(with = "crate::pace::duration_millis")]
    pub duration: Duration,
    pub training_days: usize,
    pub rest_days: usize,
    pub has_race: bool,
}

/// Per-week totals for every week that still holds sessions
pub fn weekly_summaries(plan: &TrainingPlan) -> Vec<WeekSummary> {
    plan.sessions_by_week()
        .into_iter()
        .map(|(week, sessions)| {
            let planned_volume: Decimal = sessions.iter().map(|s| s.total_distance()).sum();
            let rest_days = sessions
                .iter()
                .filter(|s| s.session_type == SessionType::Rest)
                .count();

            WeekSummary {
                week: week + 1,
                week_start: plan.phases().week_start(week),
                phase: plan.phases().week_phase(week),
                target_volume: plan.weekly_volume(week),
                planned_volume: planned_volume.round_dp(1),
                duration: plan.weekly_duration(week),
                training_days: sessions.len() - rest_days,
                rest_days,
                has_race: sessions.iter().any(|s| s.session_type == SessionType::Race),
            }
        })
        .collect()
}

/// Serializable overview of a plan
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub generated_at: DateTime<Utc>,
    pub race: String,
    pub start_date: NaiveDate,
    pub race_date: NaiveDate,
    pub total_weeks: u32,
    pub total_volume: Decimal,
    #[serde(with = "crate::pace::duration_millis")]
    pub total_duration: Duration,
    pub phases: BTreeMap<TrainingPhase, PhaseStats>,
    pub weeks: Vec<WeekSummary>,
}

impl PlanReport {
    pub fn from_plan(plan: &TrainingPlan) -> Self {
        Self {
            generated_at: Utc::now(),
            race: plan.profile().main_race().label(),
            start_date: plan.start_date(),
            race_date: plan.race_date(),
            total_weeks: plan.phases().total_weeks(),
            total_volume: plan.total_volume(),
            total_duration: plan.total_duration(),
            phases: plan.phase_stats(),
            weeks: weekly_summaries(plan),
        }
    }
}

/// Write `plan` to `output_path` in the given format
pub fn export_plan<P: AsRef<Path>>(
    plan: &TrainingPlan,
    format: ExportFormat,
    output_path: P,
) -> Result<(), ExportError> {
    if plan.is_empty() {
        return Err(ExportError::InsufficientData("plan has no sessions".to_string()));
    }

    let path = output_path.as_ref();
    match format {
        ExportFormat::Csv => csv::export_sessions_csv(plan, path)?,
        ExportFormat::Json => json::export_plan(plan, path)?,
        ExportFormat::Text => text::export_calendar(plan, path)?,
    }

    info!(path = %path.display(), ?format, sessions = plan.len(), "Plan exported");
    Ok(())
}
