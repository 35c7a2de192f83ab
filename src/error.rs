use thiserror::Error;

/// Crate-wide error type. Per-request transport/parse failures inside the
/// crawl orchestrator are logged and dropped, never converted into this
/// type and propagated — only configuration, database and geocoding
/// failures reach the CLI as an `Err`.
#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("geocoding error: {0}")]
    Geocoding(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
