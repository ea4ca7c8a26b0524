/// Errors surfaced by the ingestion, reporting and storage layers
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// One or more required columns are absent from the input header
    #[error("missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },
    #[error("no valid rows: the data is empty or every row was rejected")]
    EmptyDataset,
    #[error("no original filename was given for the upload")]
    MissingFilename,
    #[error("report {0} not found")]
    NotFound(i64),
    /// The stored record exists but its payload cannot be decoded
    #[error("report {id} is corrupted: {reason}")]
    CorruptRecord { id: i64, reason: String },
    #[error("failed to render chart: {0}")]
    Chart(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T, E = ReportError> = std::result::Result<T, E>;
