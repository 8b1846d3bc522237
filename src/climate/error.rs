use chrono::NaiveDate;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimateDataError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse climate API response from {url}")]
    JsonParse {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Climate API returned an unparseable date key '{0}'")]
    InvalidDateKey(String),

    #[error("A lag of {lag_days} days before {today} is outside the supported date range")]
    LagOutOfRange { today: NaiveDate, lag_days: u32 },

    #[error("Failed to create store directory '{0}'")]
    StoreDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to open climate store '{0}'")]
    StoreOpen(PathBuf, #[source] std::io::Error),

    #[error("Failed to read climate store '{0}'")]
    StoreRead(PathBuf, #[source] PolarsError),

    // Errors during parquet writing (inside blocking task)
    #[error("I/O error writing climate store '{0}'")]
    StoreWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing climate store '{0}'")]
    StoreWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to move temporary store file over '{0}'")]
    StorePersist(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Required column '{0}' not found in DataFrame")]
    ColumnNotFound(String, #[source] PolarsError),

    #[error("Missing value in required column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },
}
