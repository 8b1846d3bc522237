use crate::error::ClimateAtlasError;
use log::info;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "municipal_climate";

/// `folder` if given, otherwise `municipal_climate` under the system cache directory.
pub(crate) fn cache_folder_or_default(folder: Option<PathBuf>) -> Result<PathBuf, ClimateAtlasError> {
    if let Some(folder) = folder {
        return Ok(folder);
    }
    dirs::cache_dir()
        .map(|dir| dir.join(CACHE_DIR_NAME))
        .ok_or_else(|| {
            ClimateAtlasError::CacheDirResolution(io::Error::new(
                io::ErrorKind::NotFound,
                "the platform has no cache directory",
            ))
        })
}

/// Creates `folder` with its parents. Something other than a directory at that
/// path is an error.
pub(crate) async fn prepare_cache_folder(folder: &Path) -> Result<(), ClimateAtlasError> {
    let failed = |e| ClimateAtlasError::CacheDirCreation(folder.to_path_buf(), e);
    match tokio::fs::metadata(folder).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(failed(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "path exists and is not a directory",
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating cache folder {}", folder.display());
            tokio::fs::create_dir_all(folder).await.map_err(failed)
        }
        Err(e) => Err(failed(e)),
    }
}

pub(crate) fn default_store_path(folder: &Path, state: &str) -> PathBuf {
    folder.join(format!("climate-{}.parquet", state.to_uppercase()))
}
