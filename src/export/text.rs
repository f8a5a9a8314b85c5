use super::{weekly_summaries, ExportError, PlanReport};
use crate::models::SessionType;
use crate::pace::format_duration;
use crate::training_plan::TrainingPlan;
use chrono::Datelike;
use std::io::Write;
use std::path::Path;

/// Export the plan as a week-by-week text calendar
pub fn export_calendar<P: AsRef<Path>>(plan: &TrainingPlan, output_path: P) -> Result<(), ExportError> {
    let mut file = std::fs::File::create(output_path)?;
    let report = PlanReport::from_plan(plan);

    // Header
    writeln!(file, "=")?;
    writeln!(file, "TRAINING PLAN: {}", report.race)?;
    writeln!(file, "=")?;
    writeln!(file)?;
    writeln!(
        file,
        "Period: {} to {} ({} weeks)",
        report.start_date.format("%Y-%m-%d"),
        report.race_date.format("%Y-%m-%d"),
        report.total_weeks
    )?;
    writeln!(file, "Total Volume: {} km", report.total_volume)?;
    writeln!(file, "Total Duration: {}", format_duration(report.total_duration))?;
    writeln!(file)?;

    writeln!(file, "PHASES")?;
    writeln!(file, "-")?;
    for (phase, stats) in &report.phases {
        writeln!(
            file,
            "{:<12} {} to {}  {:>2} weeks  {:>7} km  avg {} km/week",
            phase.to_string(),
            stats.start_date.format("%Y-%m-%d"),
            stats.end_date.format("%Y-%m-%d"),
            stats.weeks,
            stats.total_volume,
            stats.average_weekly_volume
        )?;
    }
    writeln!(file)?;

    let by_week = plan.sessions_by_week();
    for summary in weekly_summaries(plan) {
        writeln!(
            file,
            "WEEK {} ({}, {})  target {} km, planned {} km",
            summary.week,
            summary.week_start.format("%Y-%m-%d"),
            summary.phase,
            summary.target_volume,
            summary.planned_volume
        )?;
        writeln!(file, "{:-<72}", "")?;

        for session in by_week.get(&(summary.week - 1)).into_iter().flatten() {
            if session.session_type == SessionType::Rest {
                writeln!(file, "{} {}  Rest", session.date.weekday(), session.date.format("%m-%d"))?;
                continue;
            }
            writeln!(
                file,
                "{} {}  {:<10} {:>5} km  {}  {}",
                session.date.weekday(),
                session.date.format("%m-%d"),
                session.session_type.to_string(),
                session.total_distance(),
                format_duration(session.total_duration()),
                session.description
            )?;
        }
        writeln!(file)?;
    }

    writeln!(file, "End of Plan")?;

    Ok(())
}
