use super::{weekly_summaries, ExportError};
use crate::pace::format_duration;
use crate::training_plan::TrainingPlan;
use chrono::Datelike;
use csv::Writer;
use std::fs::File;
use std::path::Path;

/// One row per calendar day of the plan
pub fn export_sessions_csv<P: AsRef<Path>>(plan: &TrainingPlan, output_path: P) -> Result<(), ExportError> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record([
        "date",
        "weekday",
        "week",
        "phase",
        "type",
        "distance_km",
        "duration",
        "intermediate_race",
        "description",
    ])?;

    for session in plan.sessions() {
        let week = plan
            .week_number(session.date)
            .map_or_else(String::new, |w| (w + 1).to_string());

        writer.write_record([
            session.date.format("%Y-%m-%d").to_string(),
            session.date.weekday().to_string(),
            week,
            session.phase.to_string(),
            session.session_type.to_string(),
            session.total_distance().to_string(),
            format_duration(session.total_duration()),
            if session.is_intermediate_race { "1" } else { "0" }.to_string(),
            session.description.clone(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// One row per plan week with target and planned volume
pub fn export_weekly_csv<P: AsRef<Path>>(plan: &TrainingPlan, output_path: P) -> Result<(), ExportError> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record([
        "week",
        "week_start",
        "phase",
        "target_km",
        "planned_km",
        "duration",
        "training_days",
        "rest_days",
        "race",
    ])?;

    for summary in weekly_summaries(plan) {
        writer.write_record([
            summary.week.to_string(),
            summary.week_start.format("%Y-%m-%d").to_string(),
            summary.phase.to_string(),
            summary.target_volume.to_string(),
            summary.planned_volume.to_string(),
            format_duration(summary.duration),
            summary.training_days.to_string(),
            summary.rest_days.to_string(),
            if summary.has_race { "1" } else { "0" }.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sample_plan;
    use tempfile::NamedTempFile;

    #[test]
    fn test_export_sessions_csv() {
        let plan = sample_plan();
        let temp_file = NamedTempFile::new().unwrap();
        export_sessions_csv(&plan, temp_file.path()).unwrap();

        let mut reader = csv::Reader::from_path(temp_file.path()).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "date");
        assert_eq!(&headers[8], "description");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 91);
        assert_eq!(&rows[0][0], "2024-01-01");
        assert_eq!(&rows[0][1], "Mon");
        assert_eq!(&rows[0][2], "1");

        let race = rows.last().unwrap();
        assert_eq!(&race[0], "2024-03-31");
        assert_eq!(&race[4], "Race");
        assert_eq!(&race[5], "21.1");
        assert_eq!(&race[7], "0");
    }

    #[test]
    fn test_export_weekly_csv() {
        let plan = sample_plan();
        let temp_file = NamedTempFile::new().unwrap();
        export_weekly_csv(&plan, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 14);
        assert!(lines[0].starts_with("week,week_start,phase"));
        assert!(lines[1].starts_with("1,2024-01-01,Development,"));
    }
}
