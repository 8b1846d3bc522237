use crate::geography::boundaries::{fetch_boundaries, MunicipalityBoundary, IBGE_MESHES_URL};
use crate::geography::directory::{fetch_directory, DirectoryEntry, IBGE_LOCALITIES_URL};
use crate::geography::error::GeographyError;
use crate::types::municipality::MunicipalityRecord;
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::{debug, info, warn};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Joins directory entries with boundaries on the IBGE code.
///
/// Boundaries without a matching directory entry (and vice versa) are dropped.
/// Output follows the order of `boundaries`.
pub fn join_municipalities(
    state: &str,
    directory: &[DirectoryEntry],
    boundaries: &[MunicipalityBoundary],
) -> Vec<MunicipalityRecord> {
    let names: HashMap<String, &str> = directory
        .iter()
        .map(|entry| (entry.id.to_string(), entry.name.as_str()))
        .collect();
    let state = state.to_uppercase();

    boundaries
        .iter()
        .filter_map(|boundary| {
            let name = names.get(&boundary.area_code)?;
            let Some(centroid) = boundary.centroid() else {
                debug!("Boundary {} has no centroid, skipping", boundary.area_code);
                return None;
            };
            Some(MunicipalityRecord::new(
                boundary.area_code.clone(),
                *name,
                state.clone(),
                centroid,
            ))
        })
        .collect()
}

/// Resolves the municipality records of a state from IBGE, keeping a bincode
/// copy per state in the cache directory so later sessions skip the network.
#[derive(Debug, Clone)]
pub struct MunicipalityResolver {
    client: Client,
    localities_url: String,
    meshes_url: String,
    cache_dir: PathBuf,
}

impl MunicipalityResolver {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            localities_url: IBGE_LOCALITIES_URL.to_string(),
            meshes_url: IBGE_MESHES_URL.to_string(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Uses other hosts for the localities and mesh APIs.
    pub fn with_base_urls(
        mut self,
        localities_url: impl Into<String>,
        meshes_url: impl Into<String>,
    ) -> Self {
        self.localities_url = localities_url.into();
        self.meshes_url = meshes_url.into();
        self
    }

    pub fn cache_path(&self, state: &str) -> PathBuf {
        self.cache_dir
            .join(format!("municipalities-{}.bin", state.to_uppercase()))
    }

    pub async fn directory(&self, state: &str) -> Result<Vec<DirectoryEntry>, GeographyError> {
        fetch_directory(&self.client, &self.localities_url, state).await
    }

    pub async fn boundaries(
        &self,
        state: &str,
    ) -> Result<Vec<MunicipalityBoundary>, GeographyError> {
        fetch_boundaries(&self.client, &self.meshes_url, state).await
    }

    /// Municipality records of `state`, from the cache file when present.
    ///
    /// An empty join is returned as is and never cached.
    pub async fn resolve(&self, state: &str) -> Result<Vec<MunicipalityRecord>, GeographyError> {
        let cache_file = self.cache_path(state);
        if tokio::fs::try_exists(&cache_file).await.unwrap_or(false) {
            let path_clone = cache_file.clone();
            let records =
                tokio::task::spawn_blocking(move || read_cache(&path_clone)).await??;
            debug!(
                "Read {} municipalities from {}",
                records.len(),
                cache_file.display()
            );
            return Ok(records);
        }

        info!("No municipality cache for {}, fetching from IBGE", state);
        let directory = self.directory(state).await?;
        let boundaries = self.boundaries(state).await?;
        let records = join_municipalities(state, &directory, &boundaries);
        info!(
            "Resolved {} municipalities for {} ({} directory entries, {} boundaries)",
            records.len(),
            state,
            directory.len(),
            boundaries.len()
        );

        if records.is_empty() {
            warn!("No municipalities resolved for {}, not caching", state);
        } else {
            write_cache(&self.cache_dir, &cache_file, records.clone()).await?;
        }
        Ok(records)
    }
}

fn read_cache(cache_path: &Path) -> Result<Vec<MunicipalityRecord>, GeographyError> {
    let bytes = std::fs::read(cache_path)
        .map_err(|e| GeographyError::CacheRead(cache_path.to_path_buf(), e))?;
    let (records, _) =
        bincode::serde::decode_from_slice::<Vec<MunicipalityRecord>, _>(&bytes, BINCODE_CONFIG)
            .map_err(|e| GeographyError::CacheDecode(cache_path.to_path_buf(), Box::from(e)))?;
    Ok(records)
}

pub(crate) async fn write_cache(
    cache_dir: &Path,
    cache_path: &Path,
    records: Vec<MunicipalityRecord>,
) -> Result<(), GeographyError> {
    tokio::fs::create_dir_all(cache_dir)
        .await
        .map_err(|e| GeographyError::CacheDirCreation(cache_dir.to_path_buf(), e))?;
    let bytes = tokio::task::spawn_blocking(move || {
        bincode::serde::encode_to_vec(records, BINCODE_CONFIG)
            .map_err(|e| GeographyError::CacheEncode(Box::new(e)))
    })
    .await??;
    tokio::fs::write(cache_path, &bytes)
        .await
        .map_err(|e| GeographyError::CacheWrite(cache_path.to_path_buf(), e))?;
    debug!(
        "Wrote municipality cache ({} bytes) to {}",
        bytes.len(),
        cache_path.display()
    );
    Ok(())
}
