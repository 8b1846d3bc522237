use crate::climate::error::ClimateDataError;
use crate::geography::error::GeographyError;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimateAtlasError {
    #[error(transparent)]
    Climate(#[from] ClimateDataError),

    #[error(transparent)]
    Geography(#[from] GeographyError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),

    #[error("Failed to parse date")]
    DateParsingError,

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("No municipalities could be resolved for state '{0}'")]
    NoMunicipalities(String),
}
