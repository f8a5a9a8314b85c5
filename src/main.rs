use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use stridekit::export::{self, ExportFormat};
use stridekit::pace::{equivalent_paces, format_duration, parse_duration};
use stridekit::{
    compare_plans, init_logging, scenarios, AppConfig, ErrorSeverity, JsonPlanStore, Pace,
    PlanComparison, PlanError, PlanGenerator, PlanRepository, ProfileInput, ProfileOverrides,
    SessionType, TrainingPhase, TrainingPlan, UserProfile,
};

/// StrideKit - Race Training Plan Generator
///
/// Builds a day-by-day running plan from a runner profile and a goal race:
/// development, specific and taper phases with progressive weekly volume.
#[derive(Parser)]
#[command(name = "stridekit")]
#[command(author = "StrideKit Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Race training plan generator", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a plan from a profile file
    Generate {
        /// Profile file (TOML)
        #[arg(short, long)]
        profile: PathBuf,

        /// Save the plan under this key
        #[arg(short, long)]
        save: Option<String>,

        /// Write one CSV row per day
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,

        /// Write the plan report as JSON
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Include every session block in the JSON output
        #[arg(long, requires = "json")]
        detailed: bool,

        /// Write one CSV row per week
        #[arg(long, value_name = "FILE")]
        weekly_csv: Option<PathBuf>,

        /// Write a text calendar
        #[arg(long, value_name = "FILE")]
        text: Option<PathBuf>,
    },

    /// Show a saved plan
    Show {
        /// Plan key
        key: String,

        /// Show the sessions of one week (1-based)
        #[arg(short, long)]
        week: Option<u32>,
    },

    /// Drop the sessions before a date
    Adjust {
        /// Plan key
        key: String,

        /// Current date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// Save the adjusted plan under this key
        #[arg(short, long)]
        save: Option<String>,
    },

    /// Compare a saved plan with a variant built from profile overrides
    Simulate {
        /// Plan key
        key: String,

        /// Overrides file (TOML)
        #[arg(short, long)]
        overrides: PathBuf,
    },

    /// Run the preset what-if scenarios against a saved plan
    Scenarios {
        /// Plan key
        key: String,
    },

    /// List saved plans
    List,

    /// Delete a saved plan
    Delete {
        /// Plan key
        key: String,
    },

    /// Equivalent paces from a race result
    Paces {
        /// Race distance in km
        #[arg(short, long)]
        distance: Decimal,

        /// Finish time (hh:mm:ss or mm:ss)
        #[arg(short, long)]
        time: String,
    },

    /// Configure application settings
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "Week")]
    week: u32,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Target km")]
    target: String,
    #[tabled(rename = "Planned km")]
    planned: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Runs")]
    runs: usize,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "Type")]
    session_type: String,
    #[tabled(rename = "km")]
    distance: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Tabled)]
struct ComparisonRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Original")]
    original: String,
    #[tabled(rename = "Simulated")]
    simulated: String,
}

#[derive(Tabled)]
struct ScenarioRow {
    #[tabled(rename = "Scenario")]
    name: String,
    #[tabled(rename = "Total km")]
    volume: String,
    #[tabled(rename = "Change")]
    change: String,
    #[tabled(rename = "Duration")]
    duration: String,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<PlanError>() {
            Some(plan_err) => {
                match plan_err.severity() {
                    ErrorSeverity::Error => tracing::error!(error = %plan_err, "command failed"),
                    ErrorSeverity::Warning => tracing::warn!(error = %plan_err, "command rejected"),
                }
                eprintln!("{} {}", "Error:".red().bold(), plan_err.user_message())
            }
            None => eprintln!("{} {:#}", "Error:".red().bold(), err),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let app_config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    let mut log_config = app_config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config).context("Failed to initialize logging")?;

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {}", log_config.level.to_filter()).dimmed());
    }

    let generator = PlanGenerator::new(app_config.plan.clone())?;
    let store = JsonPlanStore::with_config(&app_config.storage.data_dir, app_config.plan.clone());

    match cli.command {
        Commands::Generate {
            profile,
            save,
            csv,
            json,
            detailed,
            weekly_csv,
            text,
        } => {
            let profile = load_profile(&profile, &app_config)?;
            println!("{}", "Generating training plan...".green().bold());

            let plan = generator.generate_plan(&profile)?;
            print_plan_summary(&plan);

            let json = match json {
                Some(path) if detailed => {
                    export::json::export_plan_detailed(&plan, &path)
                        .with_context(|| format!("Failed to export plan to {}", path.display()))?;
                    println!("  Exported: {}", path.display());
                    None
                }
                other => other,
            };
            if let Some(path) = weekly_csv {
                export::csv::export_weekly_csv(&plan, &path)
                    .with_context(|| format!("Failed to export weekly summary to {}", path.display()))?;
                println!("  Exported: {}", path.display());
            }

            for (path, format) in [
                (csv, ExportFormat::Csv),
                (json, ExportFormat::Json),
                (text, ExportFormat::Text),
            ] {
                if let Some(path) = path {
                    export::export_plan(&plan, format, &path)
                        .with_context(|| format!("Failed to export plan to {}", path.display()))?;
                    println!("  Exported: {}", path.display());
                }
            }

            if let Some(key) = save {
                store.save(&key, &plan)?;
                println!("{}", format!("✓ Plan saved as '{}'", key).green());
            }
        }

        Commands::Show { key, week } => {
            let plan = store.load(&key)?;
            match week {
                Some(week) => print_week(&plan, week)?,
                None => print_plan_summary(&plan),
            }
        }

        Commands::Adjust { key, date, save } => {
            let plan = store.load(&key)?;
            let adjusted = generator.adjust_plan(&plan, date)?;

            println!("{}", format!("Plan adjusted from {}", date).cyan().bold());
            println!(
                "  Removed {} sessions, {} remaining",
                plan.len() - adjusted.len(),
                adjusted.len()
            );
            print_plan_summary(&adjusted);

            if let Some(new_key) = save {
                store.save(&new_key, &adjusted)?;
                println!("{}", format!("✓ Adjusted plan saved as '{}'", new_key).green());
            }
        }

        Commands::Simulate { key, overrides } => {
            let plan = store.load(&key)?;
            let content = fs::read_to_string(&overrides)
                .with_context(|| format!("Failed to read overrides file: {}", overrides.display()))?;
            let overrides: ProfileOverrides =
                toml::from_str(&content).with_context(|| "Failed to parse overrides")?;

            if overrides.is_empty() {
                println!("{}", "No overrides given: the simulated plan matches the original".yellow());
            }

            let original = generator.generate_plan(plan.profile())?;
            let simulated = generator.simulate_plan(plan.profile(), &overrides)?;
            print_comparison(&compare_plans(&original, &simulated));
        }

        Commands::Scenarios { key } => {
            let plan = store.load(&key)?;
            let original = generator.generate_plan(plan.profile())?;

            let mut rows = Vec::new();
            for scenario in scenarios(plan.profile()) {
                let row = match generator.simulate_plan(plan.profile(), &scenario.overrides) {
                    Ok(simulated) => {
                        let comparison = compare_plans(&original, &simulated);
                        ScenarioRow {
                            name: scenario.name,
                            volume: comparison.volume.simulated.to_string(),
                            change: format!("{:+}%", comparison.volume.difference_percent),
                            duration: format_duration(comparison.simulated_duration),
                        }
                    }
                    Err(err) => ScenarioRow {
                        name: scenario.name,
                        volume: "-".to_string(),
                        change: "-".to_string(),
                        duration: err.user_message(),
                    },
                };
                rows.push(row);
            }

            println!("{}", format!("Scenarios for '{}'", key).cyan().bold());
            println!("  Baseline: {} km, {}", original.total_volume(), format_duration(original.total_duration()));
            println!("{}", Table::new(rows).with(Style::rounded()));
        }

        Commands::List => {
            let keys = store.list()?;
            if keys.is_empty() {
                println!("No saved plans in {}", store.dir().display());
                return Ok(());
            }

            for key in keys {
                match store.load(&key) {
                    Ok(plan) => println!(
                        "  {:<24} {} on {} ({} weeks)",
                        key.bold(),
                        plan.profile().main_race().label(),
                        plan.race_date(),
                        plan.phases().total_weeks()
                    ),
                    Err(err) => println!("  {:<24} {}", key.bold(), err.to_string().red()),
                }
            }
        }

        Commands::Delete { key } => {
            store.delete(&key)?;
            println!("{}", format!("✓ Deleted '{}'", key).green());
        }

        Commands::Paces { distance, time } => {
            let Some(duration) = parse_duration(&time) else {
                bail!("Invalid time '{}': expected hh:mm:ss or mm:ss", time);
            };
            let Some(pace) = Pace::from_time_and_distance(duration, distance) else {
                bail!("Distance must be positive, got {}", distance);
            };

            println!("{}", format!("{} km in {}: {}", distance, format_duration(duration), pace).cyan().bold());
            for (name, equivalent) in equivalent_paces(pace, distance) {
                println!("  {:<14} {}", name, equivalent);
            }
        }

        Commands::Config { init } => {
            let path = cli.config.unwrap_or_else(AppConfig::default_config_path);
            if init {
                let mut config = AppConfig::default();
                config.save_to_file(&path)?;
                println!("{}", format!("✓ Configuration written to {}", path.display()).green());
            } else {
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", toml::to_string_pretty(&app_config).context("Failed to render configuration")?);
            }
        }
    }

    Ok(())
}

fn load_profile(path: &Path, app_config: &AppConfig) -> Result<UserProfile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile file: {}", path.display()))?;
    let input: ProfileInput =
        toml::from_str(&content).with_context(|| format!("Failed to parse profile: {}", path.display()))?;

    Ok(UserProfile::with_config(input, &app_config.plan).map_err(PlanError::from)?)
}

fn phase_color(phase: TrainingPhase) -> ColoredString {
    match phase {
        TrainingPhase::Development => phase.to_string().blue(),
        TrainingPhase::Specific => phase.to_string().magenta(),
        TrainingPhase::Taper => phase.to_string().yellow(),
    }
}

fn print_plan_summary(plan: &TrainingPlan) {
    let race = plan.profile().main_race();
    println!();
    println!("{}", format!("{} on {}", race.label(), race.date()).bold());
    println!(
        "  {} to {} | {} weeks | {} km | {}",
        plan.start_date(),
        plan.race_date(),
        plan.phases().total_weeks(),
        plan.total_volume(),
        format_duration(plan.total_duration())
    );

    for (phase, stats) in plan.phase_stats() {
        println!(
            "  {:<12} {} weeks, {} km (avg {} km/week)",
            phase_color(phase),
            stats.weeks,
            stats.total_volume,
            stats.average_weekly_volume
        );
    }

    let rows: Vec<WeekRow> = export::weekly_summaries(plan)
        .into_iter()
        .map(|summary| WeekRow {
            week: summary.week,
            start: summary.week_start.to_string(),
            phase: summary.phase.to_string(),
            target: summary.target_volume.to_string(),
            planned: summary.planned_volume.to_string(),
            duration: format_duration(summary.duration),
            runs: summary.training_days,
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_week(plan: &TrainingPlan, week: u32) -> Result<()> {
    let total = plan.phases().total_weeks();
    if week == 0 || week > total {
        bail!("Week {} is outside the plan (1 to {})", week, total);
    }
    let index = week - 1;

    let rows: Vec<SessionRow> = plan
        .sessions_by_week()
        .remove(&index)
        .unwrap_or_default()
        .into_iter()
        .map(|session| SessionRow {
            date: session.date.to_string(),
            day: session.date.format("%a").to_string(),
            session_type: session.session_type.to_string(),
            distance: if session.session_type == SessionType::Rest {
                "-".to_string()
            } else {
                session.total_distance().to_string()
            },
            duration: format_duration(session.total_duration()),
            description: session.description.clone(),
        })
        .collect();

    println!(
        "{}",
        format!(
            "Week {} of {} | {} | target {} km",
            week,
            total,
            phase_color(plan.phases().week_phase(index)),
            plan.weekly_volume(index)
        )
        .bold()
    );
    if rows.is_empty() {
        println!("{}", "  No sessions left in this week".dimmed());
    } else {
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
    Ok(())
}

fn print_comparison(comparison: &PlanComparison) {
    let mut rows = vec![
        ComparisonRow {
            metric: "Total km".to_string(),
            original: comparison.volume.original.to_string(),
            simulated: comparison.volume.simulated.to_string(),
        },
        ComparisonRow {
            metric: "Total duration".to_string(),
            original: format_duration(comparison.original_duration),
            simulated: format_duration(comparison.simulated_duration),
        },
    ];

    for phase in TrainingPhase::ALL {
        let describe = |summary: Option<&stridekit::simulation::PhaseSummary>| {
            summary.map_or_else(
                || "-".to_string(),
                |s| format!("{} weeks, {} km", s.weeks, s.total_volume),
            )
        };
        rows.push(ComparisonRow {
            metric: phase.to_string(),
            original: describe(comparison.original_phases.get(&phase)),
            simulated: describe(comparison.simulated_phases.get(&phase)),
        });
    }

    for session_type in SessionType::ALL {
        let count = |counts: &std::collections::BTreeMap<SessionType, usize>| {
            counts.get(&session_type).copied().unwrap_or(0).to_string()
        };
        rows.push(ComparisonRow {
            metric: format!("{} sessions", session_type),
            original: count(&comparison.original_session_counts),
            simulated: count(&comparison.simulated_session_counts),
        });
    }

    println!("{}", "Simulation".cyan().bold());
    println!("{}", Table::new(rows).with(Style::rounded()));

    let change = format!(
        "Volume change: {:+} km ({:+}%)",
        comparison.volume.difference, comparison.volume.difference_percent
    );
    if comparison.volume.difference < Decimal::ZERO {
        println!("{}", change.yellow());
    } else {
        println!("{}", change.green());
    }
}
