//! This module provides the main entry point of the crate. [`ClimateAtlas`] ties the
//! IBGE municipality lookup, the NASA POWER client and the incremental store
//! together for a single Brazilian state.

use crate::analysis::aggregate::{aggregate, AggregateRow};
use crate::analysis::summary::{summarize, SeriesSummary};
use crate::climate::error::ClimateDataError;
use crate::climate::fetch_cache::{CachePolicy, CachedPointSource};
use crate::climate::point_fetcher::{PointSource, PowerClient};
use crate::climate::reconcile::{Reconciler, WatermarkPolicy, DEFAULT_LAG_DAYS};
use crate::climate::store::ClimateStore;
use crate::error::ClimateAtlasError;
use crate::geography::boundaries::MunicipalityBoundary;
use crate::geography::municipalities::MunicipalityResolver;
use crate::types::municipality::{MunicipalityRecord, MunicipalitySelection};
use crate::types::period::{first_day_years_back, DateRange};
use crate::types::series::ClimateSeries;
use crate::utils::{cache_folder_or_default, default_store_path, prepare_cache_folder};
use bon::bon;
use chrono::{Local, NaiveDate};
use log::info;
use std::path::PathBuf;
use tokio::sync::OnceCell;

/// State used when none is configured.
pub const DEFAULT_STATE: &str = "SP";
/// How many years before the current one a fresh store starts.
pub const DEFAULT_YEARS_BACK: i32 = 8;

/// The main client for municipal climate data of one state.
///
/// It resolves the municipalities of the state (cached on disk after the first
/// session), keeps a Parquet store of daily observations up to date with
/// [`ClimateAtlas::sync`], and answers the aggregate queries a dashboard needs.
///
/// Create one with [`ClimateAtlas::builder()`]; every option has a default.
///
/// # Examples
///
/// ```rust,no_run
/// # use municipal_climate::{ClimateAtlas, ClimateAtlasError, MunicipalitySelection};
/// # #[tokio::main]
/// # async fn main() -> Result<(), ClimateAtlasError> {
/// let atlas = ClimateAtlas::builder().state("SP").build().await?;
///
/// // Download whatever the store is missing.
/// let series = atlas.sync().await?;
/// println!("{} daily rows stored", series.len());
///
/// let monthly = atlas
///     .monthly()
///     .selection(MunicipalitySelection::municipality("Campinas"))
///     .call()
///     .await?;
/// for row in monthly {
///     println!("{}-{:02}: {:.1} mm", row.year, row.month, row.precipitation);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ClimateAtlas<S = CachedPointSource<PowerClient>> {
    state: String,
    earliest: NaiveDate,
    resolver: MunicipalityResolver,
    municipalities: OnceCell<Vec<MunicipalityRecord>>,
    reconciler: Reconciler<S>,
}

#[bon]
impl ClimateAtlas {
    /// Creates a client for one state.
    ///
    /// # Arguments
    ///
    /// * `.state(impl Into<String>)`: Optional. Two-letter state code (UF). Defaults to `SP`.
    /// * `.cache_folder(PathBuf)`: Optional. Where the municipality cache and, by default,
    ///   the store live. Defaults to the system cache directory joined with `municipal_climate`.
    /// * `.store_path(PathBuf)`: Optional. The Parquet store. Defaults to
    ///   `<cache_folder>/climate-<UF>.parquet`.
    /// * `.earliest(NaiveDate)`: Optional. First day a fresh store covers. Defaults to
    ///   January 1st, eight years before the current year.
    /// * `.lag_days(u32)`: Optional. Days the upstream API lags behind today. Defaults to 5.
    /// * `.watermark_policy(WatermarkPolicy)`: Optional. Defaults to [`WatermarkPolicy::Global`].
    /// * `.cache_policy(CachePolicy)`: Optional. Memoization of point fetches within the
    ///   session. Defaults to [`CachePolicy::Session`].
    ///
    /// # Errors
    ///
    /// Returns [`ClimateAtlasError::CacheDirResolution`] if no cache folder was given and
    /// the system one cannot be found, and [`ClimateAtlasError::CacheDirCreation`] if the
    /// cache folder cannot be created.
    #[builder]
    pub async fn new(
        #[builder(into)] state: Option<String>,
        cache_folder: Option<PathBuf>,
        store_path: Option<PathBuf>,
        earliest: Option<NaiveDate>,
        lag_days: Option<u32>,
        watermark_policy: Option<WatermarkPolicy>,
        cache_policy: Option<CachePolicy>,
    ) -> Result<Self, ClimateAtlasError> {
        let state = state
            .unwrap_or_else(|| DEFAULT_STATE.to_string())
            .to_uppercase();
        let cache_folder = cache_folder_or_default(cache_folder)?;
        prepare_cache_folder(&cache_folder).await?;

        let store_path = store_path.unwrap_or_else(|| default_store_path(&cache_folder, &state));
        let earliest = match earliest {
            Some(date) => date,
            None => first_day_years_back(Local::now().date_naive(), DEFAULT_YEARS_BACK)
                .ok_or(ClimateAtlasError::DateParsingError)?,
        };
        info!(
            "Climate atlas for {} storing to {} from {}",
            state,
            store_path.display(),
            earliest
        );

        let source = CachedPointSource::new(PowerClient::new(), cache_policy.unwrap_or_default());
        let reconciler = Reconciler::new(source, ClimateStore::new(store_path))
            .with_policy(watermark_policy.unwrap_or_default())
            .with_lag_days(lag_days.unwrap_or(DEFAULT_LAG_DAYS));

        Ok(Self::from_parts(
            state,
            earliest,
            MunicipalityResolver::new(cache_folder),
            reconciler,
        ))
    }
}

#[bon]
impl<S: PointSource> ClimateAtlas<S> {
    pub(crate) fn from_parts(
        state: String,
        earliest: NaiveDate,
        resolver: MunicipalityResolver,
        reconciler: Reconciler<S>,
    ) -> Self {
        Self {
            state,
            earliest,
            resolver,
            municipalities: OnceCell::new(),
            reconciler,
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn earliest(&self) -> NaiveDate {
        self.earliest
    }

    pub fn store(&self) -> &ClimateStore {
        self.reconciler.store()
    }

    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    /// The municipalities of the state, resolved once per client.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateAtlasError::NoMunicipalities`] if the directory and the
    /// boundaries have no municipality in common, and [`ClimateAtlasError::Geography`]
    /// if either lookup fails.
    pub async fn municipalities(&self) -> Result<&[MunicipalityRecord], ClimateAtlasError> {
        let records = self
            .municipalities
            .get_or_try_init(|| async {
                let records = self.resolver.resolve(&self.state).await?;
                if records.is_empty() {
                    return Err(ClimateAtlasError::NoMunicipalities(self.state.clone()));
                }
                Ok(records)
            })
            .await?;
        Ok(records.as_slice())
    }

    /// Municipal outlines for drawing a map. Fetched on every call.
    pub async fn boundaries(&self) -> Result<Vec<MunicipalityBoundary>, ClimateAtlasError> {
        Ok(self.resolver.boundaries(&self.state).await?)
    }

    /// Downloads the days the store lacks and returns the full stored series.
    pub async fn sync(&self) -> Result<ClimateSeries, ClimateAtlasError> {
        let municipalities = self.municipalities().await?;
        Ok(self
            .reconciler
            .reconcile(municipalities, self.earliest)
            .await?)
    }

    /// The stored series without contacting any API. Empty if nothing is stored yet.
    pub async fn load(&self) -> Result<ClimateSeries, ClimateAtlasError> {
        Ok(self.store().load().await?.unwrap_or_default())
    }

    /// Monthly precipitation totals and temperature means of the stored data.
    ///
    /// # Arguments
    ///
    /// * `.selection(MunicipalitySelection)`: Optional. Defaults to [`MunicipalitySelection::All`].
    /// * `.start(NaiveDate)`: Optional. Defaults to the first stored day.
    /// * `.end(NaiveDate)`: Optional. Defaults to the last stored day.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateAtlasError::InvalidDateRange`] if `start` is after `end`.
    #[builder]
    pub async fn monthly(
        &self,
        selection: Option<MunicipalitySelection>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<AggregateRow>, ClimateAtlasError> {
        let selection = selection.unwrap_or_default();
        let series = self.selected(&selection, start, end).await?;
        Ok(aggregate(&series, &selection))
    }

    /// Day counts and mean annual precipitation of the stored data.
    ///
    /// Takes the same arguments as [`ClimateAtlas::monthly`].
    #[builder]
    pub async fn summary(
        &self,
        selection: Option<MunicipalitySelection>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<SeriesSummary, ClimateAtlasError> {
        let selection = selection.unwrap_or_default();
        let series = self.selected(&selection, start, end).await?;
        Ok(summarize(&series, &selection))
    }

    /// Choices for a municipality picker: `All` first, then every stored
    /// municipality name in alphabetical order.
    pub async fn selection_options(&self) -> Result<Vec<MunicipalitySelection>, ClimateAtlasError> {
        let series = self.load().await?;
        Ok(std::iter::once(MunicipalitySelection::All)
            .chain(
                series
                    .municipality_names()
                    .into_iter()
                    .map(MunicipalitySelection::Municipality),
            )
            .collect())
    }

    /// First and last stored day, or `None` if nothing is stored.
    pub async fn date_bounds(&self) -> Result<Option<DateRange>, ClimateAtlasError> {
        Ok(self.load().await?.date_bounds())
    }

    async fn selected(
        &self,
        selection: &MunicipalitySelection,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<ClimateSeries, ClimateAtlasError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ClimateAtlasError::InvalidDateRange { start, end });
            }
        }
        let series = self.load().await?;
        let Some(bounds) = series.date_bounds() else {
            return Ok(series);
        };

        let frame = series.lazy().map_err(ClimateDataError::from)?;
        let frame = frame.get_range(
            start.unwrap_or(bounds.start()),
            end.unwrap_or(bounds.end()),
        );
        // A one-sided bound outside the stored range selects nothing.
        let frame = match frame {
            Ok(frame) => frame,
            Err(ClimateAtlasError::InvalidDateRange { .. }) => return Ok(ClimateSeries::default()),
            Err(e) => return Err(e),
        };
        Ok(frame.for_selection(selection).collect_series()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::downloader::tests::{municipality, FakeSource};
    use crate::geography::municipalities::write_cache;
    use tempfile::TempDir;

    // Nothing listens here, so any network access fails fast.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn atlas_with(
        dir: &TempDir,
        municipalities: Vec<MunicipalityRecord>,
    ) -> ClimateAtlas<FakeSource> {
        let resolver =
            MunicipalityResolver::new(dir.path()).with_base_urls(UNREACHABLE, UNREACHABLE);
        write_cache(dir.path(), &resolver.cache_path("SP"), municipalities)
            .await
            .unwrap();
        let store = ClimateStore::new(dir.path().join("climate-SP.parquet"));
        ClimateAtlas::from_parts(
            "SP".to_string(),
            date(2024, 1, 1),
            resolver,
            Reconciler::new(FakeSource::default(), store),
        )
    }

    async fn synced_atlas(dir: &TempDir) -> ClimateAtlas<FakeSource> {
        let atlas = atlas_with(
            dir,
            vec![
                municipality("2", "Santos", -23.9),
                municipality("1", "Campinas", -22.9),
            ],
        )
        .await;
        atlas
            .reconciler()
            .reconcile_at(atlas.municipalities().await.unwrap(), atlas.earliest(), date(2024, 2, 15))
            .await
            .unwrap();
        atlas
    }

    #[tokio::test]
    async fn test_municipalities_are_resolved_once() -> Result<(), ClimateAtlasError> {
        let dir = tempfile::tempdir().unwrap();
        let atlas = atlas_with(&dir, vec![municipality("1", "Campinas", -22.9)]).await;

        assert_eq!(atlas.municipalities().await?.len(), 1);
        // The cache file is no longer needed once resolved.
        std::fs::remove_file(dir.path().join("municipalities-SP.bin")).unwrap();
        assert_eq!(atlas.municipalities().await?[0].name, "Campinas");
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_join_is_no_municipalities() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = atlas_with(&dir, Vec::new()).await;

        let result = atlas.municipalities().await;
        assert!(matches!(result, Err(ClimateAtlasError::NoMunicipalities(state)) if state == "SP"));
    }

    #[tokio::test]
    async fn test_queries_before_any_sync_are_empty() -> Result<(), ClimateAtlasError> {
        let dir = tempfile::tempdir().unwrap();
        let atlas = atlas_with(&dir, vec![municipality("1", "Campinas", -22.9)]).await;

        assert_eq!(atlas.date_bounds().await?, None);
        assert_eq!(atlas.selection_options().await?, vec![MunicipalitySelection::All]);
        assert!(atlas.monthly().call().await?.is_empty());
        assert_eq!(atlas.summary().call().await?, SeriesSummary::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_queries_after_sync() -> Result<(), ClimateAtlasError> {
        let dir = tempfile::tempdir().unwrap();
        let atlas = synced_atlas(&dir).await;

        // 2024-01-01 through 2024-02-10 with the default lag.
        assert_eq!(
            atlas.date_bounds().await?,
            DateRange::new(date(2024, 1, 1), date(2024, 2, 10))
        );
        assert_eq!(
            atlas.selection_options().await?,
            vec![
                MunicipalitySelection::All,
                MunicipalitySelection::municipality("Campinas"),
                MunicipalitySelection::municipality("Santos"),
            ]
        );

        let monthly = atlas
            .monthly()
            .selection(MunicipalitySelection::municipality("Campinas"))
            .call()
            .await?;
        assert_eq!(monthly.len(), 2);
        // Precipitation equals the day of month: 1 + 2 + ... + 31.
        assert_eq!(monthly[0].precipitation, 496.0);
        assert_eq!(monthly[1].precipitation, 55.0);
        assert_eq!(monthly[0].temp_avg, Some(22.0));

        let january = atlas
            .summary()
            .start(date(2024, 1, 1))
            .end(date(2024, 1, 31))
            .call()
            .await?;
        assert_eq!(january.total_days, 31);
        assert_eq!(january.dry_days, 0);
        assert_eq!(january.mean_annual_precipitation, Some(496.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_one_sided_range_defaults_to_stored_bounds() -> Result<(), ClimateAtlasError> {
        let dir = tempfile::tempdir().unwrap();
        let atlas = synced_atlas(&dir).await;

        let february = atlas.monthly().start(date(2024, 2, 1)).call().await?;
        assert_eq!(february.len(), 1);
        assert_eq!(february[0].month, 2);

        let after_store = atlas.monthly().start(date(2025, 1, 1)).call().await?;
        assert!(after_store.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_inverted_range_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let atlas = synced_atlas(&dir).await;

        let result = atlas
            .summary()
            .start(date(2024, 2, 1))
            .end(date(2024, 1, 1))
            .call()
            .await;
        assert!(matches!(
            result,
            Err(ClimateAtlasError::InvalidDateRange { start, end })
                if start == date(2024, 2, 1) && end == date(2024, 1, 1)
        ));
    }

    #[tokio::test]
    async fn test_builder_defaults() -> Result<(), ClimateAtlasError> {
        let dir = tempfile::tempdir().unwrap();
        let atlas = ClimateAtlas::builder()
            .state("rj")
            .cache_folder(dir.path().join("cache"))
            .build()
            .await?;

        assert_eq!(atlas.state(), "RJ");
        assert_eq!(
            atlas.store().path(),
            dir.path().join("cache").join("climate-RJ.parquet")
        );
        assert!(dir.path().join("cache").is_dir());
        assert_eq!(
            atlas.earliest(),
            first_day_years_back(Local::now().date_naive(), DEFAULT_YEARS_BACK).unwrap()
        );
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_live_sync_small_window() -> Result<(), ClimateAtlasError> {
        let dir = tempfile::tempdir().unwrap();
        let today = Local::now().date_naive();
        let atlas = ClimateAtlas::builder()
            .state("AC")
            .cache_folder(dir.path().to_path_buf())
            .earliest(today - chrono::Duration::days(10))
            .build()
            .await?;

        let series = atlas.sync().await?;
        assert!(!series.is_empty());
        assert_eq!(atlas.selection_options().await?.len(), atlas.municipalities().await?.len() + 1);
        Ok(())
    }
}
