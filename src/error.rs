use thiserror::Error;

/// Failures surfaced by the lookup and submission services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid form type: {0:?}")]
    InvalidRole(String),

    #[error("invalid submission payload: {0}")]
    InvalidPayload(String),

    #[error("school lookup unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("could not persist submission: {0}")]
    Persistence(String),
}

/// Backing store failures, before the service layer classifies them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("missing tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),
}
