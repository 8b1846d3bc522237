use crate::climate::error::ClimateDataError;
use crate::types::series::ClimateSeries;
use log::{debug, info};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::{fs, task};

/// The persisted climate series: a single Snappy-compressed Parquet file.
///
/// Reads load the whole file; writes replace it whole. Writes go to a temporary
/// file in the same directory which is then renamed over the store, so a crash
/// never leaves a half-written store behind. Only one writer is supported.
#[derive(Debug, Clone)]
pub struct ClimateStore {
    path: PathBuf,
}

impl ClimateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// The stored series, or `None` if there is no store yet.
    pub async fn load(&self) -> Result<Option<ClimateSeries>, ClimateDataError> {
        if !self.exists().await {
            debug!("No climate store at {:?}", self.path);
            return Ok(None);
        }
        let path = self.path.clone();
        let series = task::spawn_blocking(move || {
            let file = std::fs::File::open(&path)
                .map_err(|e| ClimateDataError::StoreOpen(path.clone(), e))?;
            let df = ParquetReader::new(file)
                .finish()
                .map_err(|e| ClimateDataError::StoreRead(path.clone(), e))?;
            ClimateSeries::from_dataframe(&df)
        })
        .await??;
        info!("Loaded {} rows from {:?}", series.len(), self.path);
        Ok(Some(series))
    }

    /// Replaces the store with `series`.
    pub async fn save(&self, series: &ClimateSeries) -> Result<(), ClimateDataError> {
        let df = series.to_dataframe()?;
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .await
            .map_err(|e| ClimateDataError::StoreDirCreation(parent.clone(), e))?;

        let path = self.path.clone();
        let rows = df.height();
        task::spawn_blocking(move || write_atomically(df, &parent, &path)).await??;
        info!("Wrote {} rows to {:?}", rows, self.path);
        Ok(())
    }
}

fn write_atomically(mut df: DataFrame, dir: &Path, path: &Path) -> Result<(), ClimateDataError> {
    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| ClimateDataError::StoreWriteIo(path.to_path_buf(), e))?;
    ParquetWriter::new(temp.as_file_mut())
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut df)
        .map_err(|e| ClimateDataError::StoreWritePolars(path.to_path_buf(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| ClimateDataError::StoreWriteIo(path.to_path_buf(), e))?;
    temp.persist(path)
        .map_err(|e| ClimateDataError::StorePersist(path.to_path_buf(), e.error))?;
    Ok(())
}
