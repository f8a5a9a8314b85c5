use anyhow::{Context, Result};
use chrono::{DateTime, Utc, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PlanError;
use crate::logging::LogConfig;
use crate::models::{BlockSplit, WeekLoad};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Plan generation parameters
    #[serde(default)]
    pub plan: PlanConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LogConfig,

    /// Saved plan location
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Plan storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding saved plans
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            data_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".stridekit")
                .join("plans"),
        }
    }
}

/// Tunable constants of the generation pipeline
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Minimum full weeks between start date and race date
    pub min_weeks_before_race: u32,

    /// Allowed range for sessions per week
    pub min_sessions_per_week: u8,
    pub max_sessions_per_week: u8,

    /// Lower bound on the Taper length in weeks
    pub min_taper_weeks: u32,

    /// Share of total weeks spent in Taper
    pub taper_phase_ratio: Decimal,

    /// Development:Specific week split, as relative shares
    pub development_share: u32,
    pub specific_share: u32,

    /// Repeating load cycle over Development and Specific weeks
    pub charge_discharge_pattern: Vec<WeekLoad>,

    /// Volume cut of a discharge week relative to the previous charge week
    pub discharge_reduction: Decimal,

    /// Volume cut of a week holding an intermediate race
    pub race_week_volume_reduction: Decimal,

    /// Final taper volume as a share of the minimum volume
    pub taper_final_week_ratio: Decimal,

    /// Floor for non-positive volumes: max(min_volume x ratio, km)
    pub min_volume_floor_ratio: Decimal,
    pub min_volume_floor_km: Decimal,

    /// Weekly volume split between session types
    pub long_run_volume_ratio: Decimal,
    pub threshold_volume_ratio: Decimal,
    pub easy_volume_ratio: Decimal,

    /// Warm-up / main / cool-down proportions of structured sessions
    pub warmup_ratio: Decimal,
    pub active_block_ratio: Decimal,
    pub cooldown_ratio: Decimal,

    /// Preferred weekdays
    pub long_run_day: Weekday,
    pub threshold_day: Weekday,

    /// Rest days are picked from the front of this list
    pub rest_day_priority: Vec<Weekday>,

    /// Long run cap in the main race week
    pub race_week_long_run_cap_km: Decimal,

    /// Threshold interval lengths (minutes), rotated week to week
    pub threshold_minutes_10k: Vec<u32>,
    pub threshold_minutes_default: Vec<u32>,

    /// Easy volume split coefficients
    pub easy_split_seed: u64,
    pub easy_split_min_coefficient: f64,
    pub easy_split_max_coefficient: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        PlanConfig {
            min_weeks_before_race: 12,
            min_sessions_per_week: 3,
            max_sessions_per_week: 7,
            min_taper_weeks: 4,
            taper_phase_ratio: dec!(0.20),
            development_share: 4,
            specific_share: 3,
            charge_discharge_pattern: vec![WeekLoad::Charge, WeekLoad::Charge, WeekLoad::Discharge],
            discharge_reduction: dec!(0.20),
            race_week_volume_reduction: dec!(0.20),
            taper_final_week_ratio: dec!(0.50),
            min_volume_floor_ratio: dec!(0.2),
            min_volume_floor_km: dec!(5.0),
            long_run_volume_ratio: dec!(0.40),
            threshold_volume_ratio: dec!(0.25),
            easy_volume_ratio: dec!(0.35),
            warmup_ratio: dec!(0.25),
            active_block_ratio: dec!(0.50),
            cooldown_ratio: dec!(0.25),
            long_run_day: Weekday::Sun,
            threshold_day: Weekday::Thu,
            rest_day_priority: vec![Weekday::Mon, Weekday::Fri, Weekday::Tue, Weekday::Sat],
            race_week_long_run_cap_km: dec!(5.0),
            threshold_minutes_10k: vec![1],
            threshold_minutes_default: vec![2, 3],
            easy_split_seed: 42,
            easy_split_min_coefficient: 0.15,
            easy_split_max_coefficient: 0.6,
        }
    }
}

impl PlanConfig {
    /// Check internal consistency of the parameters
    pub fn validate(&self) -> std::result::Result<(), PlanError> {
        let invalid = |msg: String| Err(PlanError::Configuration(msg));
        let unit = |r: Decimal| r >= Decimal::ZERO && r <= Decimal::ONE;

        if self.long_run_volume_ratio + self.threshold_volume_ratio + self.easy_volume_ratio
            != Decimal::ONE
        {
            return invalid("long run, threshold and easy volume ratios must sum to 1".to_string());
        }
        if self.warmup_ratio + self.active_block_ratio + self.cooldown_ratio != Decimal::ONE {
            return invalid("warm-up, active and cool-down ratios must sum to 1".to_string());
        }
        for (name, ratio) in [
            ("taper_phase_ratio", self.taper_phase_ratio),
            ("discharge_reduction", self.discharge_reduction),
            ("race_week_volume_reduction", self.race_week_volume_reduction),
            ("taper_final_week_ratio", self.taper_final_week_ratio),
            ("min_volume_floor_ratio", self.min_volume_floor_ratio),
        ] {
            if !unit(ratio) {
                return invalid(format!("{} must be between 0 and 1, got {}", name, ratio));
            }
        }
        if self.min_volume_floor_km <= Decimal::ZERO {
            return invalid("min_volume_floor_km must be positive".to_string());
        }
        if self.development_share + self.specific_share == 0 {
            return invalid("development and specific shares cannot both be zero".to_string());
        }
        if self.charge_discharge_pattern.is_empty() {
            return invalid("charge/discharge pattern is empty".to_string());
        }
        if self.threshold_minutes_10k.is_empty() || self.threshold_minutes_default.is_empty() {
            return invalid("threshold interval lists cannot be empty".to_string());
        }
        if self
            .threshold_minutes_10k
            .iter()
            .chain(&self.threshold_minutes_default)
            .any(|m| *m == 0)
        {
            return invalid("threshold intervals must last at least one minute".to_string());
        }

        let unique: HashSet<Weekday> = self.rest_day_priority.iter().copied().collect();
        if unique.len() != self.rest_day_priority.len() {
            return invalid("rest day priority contains duplicates".to_string());
        }
        if self.min_sessions_per_week == 0
            || self.min_sessions_per_week > self.max_sessions_per_week
            || self.max_sessions_per_week > 7
        {
            return invalid(format!(
                "invalid sessions per week range {}..={}",
                self.min_sessions_per_week, self.max_sessions_per_week
            ));
        }
        if self.rest_day_priority.len() < (7 - self.min_sessions_per_week) as usize {
            return invalid(format!(
                "rest day priority needs at least {} days",
                7 - self.min_sessions_per_week
            ));
        }
        if self.race_week_long_run_cap_km < Decimal::ZERO {
            return invalid("race week long run cap cannot be negative".to_string());
        }
        if !(self.easy_split_min_coefficient > 0.0
            && self.easy_split_min_coefficient < self.easy_split_max_coefficient)
        {
            return invalid(format!(
                "easy split coefficient range {}..{} is invalid",
                self.easy_split_min_coefficient, self.easy_split_max_coefficient
            ));
        }

        Ok(())
    }

    /// Block proportions used for long runs and threshold sessions
    pub fn block_split(&self) -> BlockSplit {
        BlockSplit {
            warmup: self.warmup_ratio,
            active: self.active_block_ratio,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            plan: PlanConfig::default(),
            logging: LogConfig::default(),
            storage: StorageSettings::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .plan
            .validate()
            .with_context(|| format!("Invalid plan settings in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stridekit")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(path = %config_path.display(), error = %err, "Using default configuration");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_plan_config_is_valid() {
        let config = PlanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rest_day_priority.len(), 4);
        assert_eq!(config.block_split().warmup, dec!(0.25));
    }

    #[test]
    fn test_invalid_plan_configs() {
        let mut config = PlanConfig::default();
        config.easy_volume_ratio = dec!(0.40);
        assert!(matches!(config.validate(), Err(PlanError::Configuration(_))));

        let mut config = PlanConfig::default();
        config.charge_discharge_pattern.clear();
        assert!(config.validate().is_err());

        let mut config = PlanConfig::default();
        config.rest_day_priority = vec![Weekday::Mon, Weekday::Mon, Weekday::Tue, Weekday::Sat];
        assert!(config.validate().is_err());

        let mut config = PlanConfig::default();
        config.easy_split_min_coefficient = 0.7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.plan, deserialized.plan);
        assert_eq!(config.storage, deserialized.storage);
    }

    #[test]
    fn test_partial_plan_section() {
        let toml_str = r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [plan]
            min_weeks_before_race = 10
            long_run_day = "Sat"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.plan.min_weeks_before_race, 10);
        assert_eq!(config.plan.long_run_day, Weekday::Sat);
        assert_eq!(config.plan.threshold_day, Weekday::Thu);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original_config = AppConfig::default();
        original_config.plan.easy_split_seed = 7;
        original_config.storage.data_dir = temp_dir.path().join("plans");

        original_config.save_to_file(&config_path).unwrap();
        let loaded_config = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded_config.plan.easy_split_seed, 7);
        assert_eq!(loaded_config.storage.data_dir, temp_dir.path().join("plans"));
    }

    #[test]
    fn test_invalid_plan_section_rejected_on_load() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.plan.threshold_minutes_default.clear();
        config.save_to_file(&config_path).unwrap();

        assert!(AppConfig::load_from_file(&config_path).is_err());
    }
}
