// Library interface for stridekit modules
// This allows integration tests and benchmarks to access the core functionality

pub mod config;
pub mod distributor;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod pace;
pub mod phases;
pub mod profile;
pub mod simulation;
pub mod storage;
pub mod training_plan;
pub mod volume;

// Re-export commonly used types for convenience
pub use config::{AppConfig, PlanConfig};
pub use error::{ErrorSeverity, PlanError, Result, StorageError, ValidationError};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use models::{Session, SessionBlock, SessionType, TrainingPhase, WeekLoad};
pub use pace::Pace;
pub use phases::{PhaseCalculator, PhasePartition};
pub use profile::{ProfileInput, Race, RaceInput, RaceKind, UserProfile};
pub use simulation::{compare_plans, scenarios, PlanComparison, ProfileOverrides, Scenario};
pub use storage::{JsonPlanStore, PlanRepository};
pub use training_plan::{PhaseStats, PlanGenerator, TrainingPlan};
pub use volume::{VolumeCalculator, WeeklyVolumes};
