pub mod app_config;
pub mod config;
pub mod posts;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use posts::{AudienceBreakdown, ContentRecord, EngagementRecord};

use thiserror::Error;

/// Largest number of writes or deletes committed in one snapshot batch.
pub const MAX_SNAPSHOT_BATCH_SIZE: usize = 400;

/// Trailing window used when a run does not specify one.
pub const DEFAULT_SNAPSHOT_WINDOW_DAYS: u32 = 90;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
