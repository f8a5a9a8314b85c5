use super::{ExportError, PlanReport};
use crate::models::SessionSummary;
use crate::training_plan::TrainingPlan;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Serialize)]
struct PlanExport<'a> {
    report: PlanReport,
    sessions: Vec<SessionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a TrainingPlan>,
}

/// Export the plan overview followed by one summary per session
pub fn export_plan<P: AsRef<Path>>(plan: &TrainingPlan, output_path: P) -> Result<(), ExportError> {
    let export = PlanExport {
        report: PlanReport::from_plan(plan),
        sessions: plan.sessions().map(SessionSummary::from).collect(),
        plan: None,
    };
    export_json(&export, output_path)
}

/// Export the overview and the complete plan, blocks included
pub fn export_plan_detailed<P: AsRef<Path>>(plan: &TrainingPlan, output_path: P) -> Result<(), ExportError> {
    let export = PlanExport {
        report: PlanReport::from_plan(plan),
        sessions: plan.sessions().map(SessionSummary::from).collect(),
        plan: Some(plan),
    };
    export_json(&export, output_path)
}

/// Export any serializable data structure to JSON
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<(), ExportError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json_data = serde_json::to_string_pretty(data)?;

    let mut file = std::fs::File::create(output_path)?;
    file.write_all(json_data.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sample_plan;
    use tempfile::NamedTempFile;

    #[test]
    fn test_export_plan() {
        let plan = sample_plan();
        let temp_file = NamedTempFile::new().unwrap();
        export_plan(&plan, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["report"]["race"], "Spring Half");
        assert_eq!(value["report"]["total_weeks"], 13);
        assert_eq!(value["sessions"].as_array().unwrap().len(), 91);
        assert!(value.get("plan").is_none());
    }

    #[test]
    fn test_export_plan_detailed() {
        let plan = sample_plan();
        let temp_file = NamedTempFile::new().unwrap();
        export_plan_detailed(&plan, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("\"blocks\""));
        assert!(content.contains("\"weekly_volumes\""));
    }

    #[test]
    fn test_export_json_generic() {
        let data = serde_json::json!({ "weeks": 13, "race": "half_marathon" });
        let temp_file = NamedTempFile::new().unwrap();
        export_json(&data, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("\"weeks\": 13"));
    }
}
