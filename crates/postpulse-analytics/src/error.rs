use thiserror::Error;

/// Boxed source error carried across the store seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("invalid window: {0} days (must be at least 1)")]
    InvalidWindow(u32),

    #[error("invalid snapshot status filter: {0}")]
    InvalidStatus(String),

    #[error("a snapshot run is already in progress for user {0}")]
    RunInProgress(String),

    #[error("store error during {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: BoxError,
    },
}

impl AnalyticsError {
    /// Wrap a backend failure raised while performing `operation`.
    pub fn store<E>(operation: &'static str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Store {
            operation,
            source: source.into(),
        }
    }
}
