use crate::climate::cleaner::clean;
use crate::climate::downloader::{BatchDownloader, FetchFailure};
use crate::climate::error::ClimateDataError;
use crate::climate::point_fetcher::PointSource;
use crate::climate::store::ClimateStore;
use crate::types::municipality::MunicipalityRecord;
use crate::types::series::ClimateSeries;
use chrono::{Days, Local, NaiveDate};
use log::{info, warn};
use std::collections::BTreeMap;

/// Days the climate API typically lags behind the present.
pub const DEFAULT_LAG_DAYS: u32 = 5;

/// How the start of the download window is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatermarkPolicy {
    /// Resume after the latest date stored for any municipality. A municipality
    /// whose fetch failed in an earlier run is not revisited once another
    /// municipality has moved past that date.
    #[default]
    Global,
    /// Resume each municipality after its own latest stored date, so earlier
    /// failures are fetched again on the next run.
    PerMunicipality,
}

/// Keeps the persisted store up to date, downloading only the days it lacks.
pub struct Reconciler<S> {
    downloader: BatchDownloader<S>,
    store: ClimateStore,
    policy: WatermarkPolicy,
    lag_days: u32,
}

impl<S: PointSource> Reconciler<S> {
    pub fn new(source: S, store: ClimateStore) -> Self {
        Self {
            downloader: BatchDownloader::new(source),
            store,
            policy: WatermarkPolicy::default(),
            lag_days: DEFAULT_LAG_DAYS,
        }
    }

    pub fn with_policy(mut self, policy: WatermarkPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_lag_days(mut self, lag_days: u32) -> Self {
        self.lag_days = lag_days;
        self
    }

    pub fn store(&self) -> &ClimateStore {
        &self.store
    }

    pub fn downloader(&self) -> &BatchDownloader<S> {
        &self.downloader
    }

    /// Brings the store up to `today - lag_days` using the local clock.
    pub async fn reconcile(
        &self,
        municipalities: &[MunicipalityRecord],
        earliest: NaiveDate,
    ) -> Result<ClimateSeries, ClimateDataError> {
        self.reconcile_at(municipalities, earliest, Local::now().date_naive())
            .await
    }

    /// Brings the store up to `today - lag_days` and returns the full stored series.
    ///
    /// The store is only rewritten when there is a non-empty window to download.
    /// Per-municipality fetch failures are logged and leave that municipality's
    /// days out of this run; a failed store write is returned as an error, as is
    /// a lag reaching before the earliest representable date.
    pub async fn reconcile_at(
        &self,
        municipalities: &[MunicipalityRecord],
        earliest: NaiveDate,
        today: NaiveDate,
    ) -> Result<ClimateSeries, ClimateDataError> {
        let end = today
            .checked_sub_days(Days::new(u64::from(self.lag_days)))
            .ok_or(ClimateDataError::LagOutOfRange {
                today,
                lag_days: self.lag_days,
            })?;
        let existing = self.store.load().await?;
        if existing.is_none() {
            info!(
                "No store at {:?}, starting a full download from {}",
                self.store.path(),
                earliest
            );
        }
        let existing = existing.unwrap_or_default();

        let windows = self.plan_windows(&existing, municipalities, earliest, end);
        if windows.is_empty() {
            info!("Store is up to date through {}, nothing to download", end);
            return Ok(existing);
        }

        let mut delta = ClimateSeries::default();
        let mut failures: Vec<FetchFailure> = Vec::new();
        for (start, group) in windows {
            let (downloaded, failed) = self
                .downloader
                .download_range_with_failures(&group, start, end)
                .await;
            delta = delta.concat(downloaded);
            failures.extend(failed);
        }
        let delta = clean(delta);
        let fetched = delta.len();

        let merged = existing.concat(delta).dedup();
        self.store.save(&merged).await?;

        if !failures.is_empty() {
            warn!(
                "Store updated without {} municipalities: {}",
                failures.len(),
                failures
                    .iter()
                    .map(|f| f.municipality.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        info!(
            "Store updated through {} with {} new rows ({} total)",
            end,
            fetched,
            merged.len()
        );
        Ok(merged)
    }

    /// Groups municipalities by the first day they still need. Windows that would
    /// start after `end` are dropped.
    fn plan_windows(
        &self,
        existing: &ClimateSeries,
        municipalities: &[MunicipalityRecord],
        earliest: NaiveDate,
        end: NaiveDate,
    ) -> BTreeMap<NaiveDate, Vec<MunicipalityRecord>> {
        let mut windows: BTreeMap<NaiveDate, Vec<MunicipalityRecord>> = BTreeMap::new();
        match self.policy {
            WatermarkPolicy::Global => {
                let start = next_day_or(existing.latest_date(), earliest);
                if start <= end && !municipalities.is_empty() {
                    windows.insert(start, municipalities.to_vec());
                }
            }
            WatermarkPolicy::PerMunicipality => {
                let latest = existing.latest_date_by_municipality();
                for municipality in municipalities {
                    let start = next_day_or(latest.get(&municipality.id).copied(), earliest);
                    if start <= end {
                        windows.entry(start).or_default().push(municipality.clone());
                    }
                }
            }
        }
        windows
    }
}

fn next_day_or(latest: Option<NaiveDate>, earliest: NaiveDate) -> NaiveDate {
    latest
        .and_then(|date| date.succ_opt())
        .unwrap_or(earliest)
}
