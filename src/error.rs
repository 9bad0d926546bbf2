use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// Aggregation failures surface as a single error; no partial metrics are
/// ever returned to a caller.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error(transparent)]
    Storage(#[from] StoreError),
}
