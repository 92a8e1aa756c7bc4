//! Post-performance scoring and snapshot pipeline.
//!
//! Loads a user's engagement and content records for a trailing window,
//! normalizes raw counts into comparable metrics, scores each post against
//! the user's own population with a weighted z-score, extracts rule-based
//! text features and audience highlights, and replaces the user's stored
//! snapshot set in bounded batches.

pub mod error;
pub mod features;
pub mod guard;
pub mod loader;
pub mod memory;
pub mod metrics;
pub mod persister;
pub mod persona;
pub mod scorer;
pub mod service;
pub mod snapshot;
pub mod store;

pub use error::AnalyticsError;
pub use features::{CtaType, FeatureExtractor, FeatureRule, IntroStyle, PostText, TextFeatures};
pub use guard::{RunPermit, UserRunGuard};
pub use loader::{load_window, LoadedRecord};
pub use memory::MemoryStore;
pub use metrics::{normalize, Metric, MetricBundle, MetricStats, PopulationStatistics};
pub use persister::{persist_snapshots, PersistOutcome};
pub use persona::{build_persona_insight, PersonaInsight, PersonaSegment};
pub use scorer::{classify, score_bundle, MetricDelta, PostScore, ZScores};
pub use service::{
    compute_snapshots, normalize_limit, RunRequest, SnapshotQuery, SnapshotService,
};
pub use snapshot::{
    RunOutcome, RunSummary, Snapshot, SnapshotStatus, SnapshotView, SourceContent,
    StoredSnapshot,
};
pub use store::SnapshotStore;
