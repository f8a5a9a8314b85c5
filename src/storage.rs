//! Plan persistence
//!
//! Plans are written as self-describing JSON documents, one file per key.
//! The stored profile is kept in its raw input form and re-validated on
//! load, so a document edited by hand cannot smuggle in an invalid profile.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PlanConfig;
use crate::error::{PlanError, Result, StorageError};
use crate::models::Session;
use crate::phases::PhasePartition;
use crate::profile::{ProfileInput, UserProfile};
use crate::training_plan::TrainingPlan;
use crate::volume::WeeklyVolumes;

/// Format version written into every document
pub const DOCUMENT_VERSION: &str = "1.0.0";

const EXTENSION: &str = "json";

/// Keyed storage for generated plans
///
/// Implementations must return exactly the plan that was saved: loading a
/// key after `save` yields a plan equal to the original.
pub trait PlanRepository {
    /// Store a plan under `key`, replacing any previous plan with that key
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the plan cannot be written
    fn save(&self, key: &str, plan: &TrainingPlan) -> Result<()>;

    /// Load the plan stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when nothing is stored under the key
    /// and `StorageError::Corrupted` when the stored data cannot be decoded
    fn load(&self, key: &str) -> Result<TrainingPlan>;

    /// Keys of all stored plans, sorted
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read
    fn list(&self) -> Result<Vec<String>>;

    /// Remove the plan stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when nothing is stored under the key
    fn delete(&self, key: &str) -> Result<()>;
}

/// On-disk representation of a plan
#[derive(Debug, Serialize, Deserialize)]
struct PlanDocument {
    version: String,
    id: Uuid,
    saved_at: DateTime<Utc>,
    profile: ProfileInput,
    phases: PhasePartition,
    weekly_volumes: WeeklyVolumes,
    sessions: Vec<Session>,
}

impl PlanDocument {
    fn from_plan(plan: &TrainingPlan) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            id: Uuid::new_v4(),
            saved_at: Utc::now(),
            profile: plan.profile().to_input(),
            phases: plan.phases().clone(),
            weekly_volumes: plan.weekly_volumes().clone(),
            sessions: plan.sessions().cloned().collect(),
        }
    }

    fn into_plan(self, key: &str, config: &PlanConfig) -> std::result::Result<TrainingPlan, StorageError> {
        let corrupted = |reason: String| StorageError::Corrupted {
            key: key.to_string(),
            reason,
        };

        let major = self.version.split('.').next().unwrap_or_default();
        if major != "1" {
            return Err(corrupted(format!("unsupported document version {}", self.version)));
        }

        let profile = UserProfile::with_config(self.profile, config)
            .map_err(|e| corrupted(format!("invalid profile: {}", e)))?;

        if self.phases.start_date() != profile.start_date() || self.phases.race_date() != profile.race_date() {
            return Err(corrupted("phase partition does not match the profile dates".to_string()));
        }

        let mut sessions: BTreeMap<NaiveDate, Session> = BTreeMap::new();
        for session in self.sessions {
            if session.date < profile.start_date() || session.date > profile.race_date() {
                return Err(corrupted(format!("session on {} is outside the plan", session.date)));
            }
            let date = session.date;
            if sessions.insert(date, session).is_some() {
                return Err(corrupted(format!("two sessions on {}", date)));
            }
        }

        Ok(TrainingPlan::from_parts(profile, sessions, self.phases, self.weekly_volumes))
    }
}

/// Plan repository backed by one JSON file per key in a directory
#[derive(Debug, Clone)]
pub struct JsonPlanStore {
    dir: PathBuf,
    config: PlanConfig,
}

impl JsonPlanStore {
    /// Store validating loaded profiles against the default plan bounds
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self::with_config(dir, PlanConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(dir: P, config: PlanConfig) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the plan stored under `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.{}", key, EXTENSION)))
    }

    /// Whether a plan is stored under `key`
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key)?.is_file())
    }
}

impl PlanRepository for JsonPlanStore {
    fn save(&self, key: &str, plan: &TrainingPlan) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        let document = PlanDocument::from_plan(plan);
        let json = serde_json::to_string_pretty(&document)?;

        // Staged write, then rename over the target
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json)?;
        fs::rename(&staging, &path)?;

        info!(key, id = %document.id, sessions = document.sessions.len(), "Saved plan");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<TrainingPlan> {
        let path = self.path_for(key)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound { key: key.to_string() }.into());
            }
            Err(err) => return Err(err.into()),
        };

        let document: PlanDocument = serde_json::from_str(&content).map_err(|e| StorageError::Corrupted {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        debug!(key, id = %document.id, version = %document.version, "Read plan document");

        document.into_plan(key, &self.config).map_err(|err| {
            warn!(key, error = %err, "Rejected stored plan");
            PlanError::from(err)
        })
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(key, "Deleted plan");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound { key: key.to_string() }.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Keys become file names: ASCII letters, digits, `-` and `_`, at most 64 chars
fn validate_key(key: &str) -> std::result::Result<(), StorageError> {
    let valid = !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey { key: key.to_string() })
    }
}
