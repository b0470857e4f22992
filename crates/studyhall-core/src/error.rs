use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("scanned code does not belong to the student's registered library")]
    InvalidLibrary,

    #[error("library timezone is not a valid IANA zone: '{0}'")]
    Timezone(String),

    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
