use crate::climate::point_fetcher::PointSource;
use crate::types::municipality::MunicipalityRecord;
use crate::types::series::ClimateSeries;
use chrono::NaiveDate;
use log::{debug, info, warn};

/// A municipality whose point fetch failed during a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub municipality_id: String,
    pub municipality: String,
    pub message: String,
}

/// Fetches one date window for many municipalities, one at a time, using each
/// municipality's centroid as the query point.
pub struct BatchDownloader<S> {
    source: S,
}

impl<S: PointSource> BatchDownloader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Concatenation of every municipality that could be fetched. Failures are
    /// logged and left out.
    pub async fn download_range(
        &self,
        municipalities: &[MunicipalityRecord],
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClimateSeries {
        self.download_range_with_failures(municipalities, start, end)
            .await
            .0
    }

    /// Like [`BatchDownloader::download_range`], also returning what failed.
    pub async fn download_range_with_failures(
        &self,
        municipalities: &[MunicipalityRecord],
        start: NaiveDate,
        end: NaiveDate,
    ) -> (ClimateSeries, Vec<FetchFailure>) {
        info!(
            "Downloading {} to {} for {} municipalities",
            start,
            end,
            municipalities.len()
        );
        let mut series = ClimateSeries::default();
        let mut failures = Vec::new();

        for municipality in municipalities {
            match self
                .source
                .fetch_point(municipality.centroid, start, end)
                .await
            {
                Ok(readings) => {
                    debug!(
                        "Fetched {} days for {} ({})",
                        readings.len(),
                        municipality.name,
                        municipality.id
                    );
                    series.extend(readings.into_iter().map(|r| r.tag(municipality)));
                }
                Err(e) => {
                    warn!(
                        "Failed to fetch climate data for municipality {} ({}): {}",
                        municipality.name, municipality.id, e
                    );
                    failures.push(FetchFailure {
                        municipality_id: municipality.id.clone(),
                        municipality: municipality.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            warn!(
                "{} of {} municipalities failed for {} to {}",
                failures.len(),
                municipalities.len(),
                start,
                end
            );
        }
        (series, failures)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::climate::error::ClimateDataError;
    use crate::types::municipality::LatLon;
    use crate::types::observation::PointReading;
    use std::sync::Mutex;

    /// Deterministic source: one reading per day with precipitation equal to the
    /// day of month, failing for the configured latitudes.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub(crate) failing_latitudes: Vec<f64>,
        pub(crate) calls: Mutex<Vec<(LatLon, NaiveDate, NaiveDate)>>,
    }

    impl FakeSource {
        pub(crate) fn failing(latitudes: &[f64]) -> Self {
            Self {
                failing_latitudes: latitudes.to_vec(),
                ..Default::default()
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl PointSource for FakeSource {
        async fn fetch_point(
            &self,
            location: LatLon,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<PointReading>, ClimateDataError> {
            self.calls.lock().unwrap().push((location, start, end));
            if self.failing_latitudes.contains(&location.latitude()) {
                return Err(ClimateDataError::InvalidDateKey("unreachable".to_string()));
            }
            Ok(start
                .iter_days()
                .take_while(|d| *d <= end)
                .map(|date| PointReading {
                    date,
                    precipitation: Some(f64::from(chrono::Datelike::day(&date))),
                    temp_avg: Some(22.0),
                    temp_max: Some(28.0),
                    temp_min: Some(16.0),
                })
                .collect())
        }
    }

    pub(crate) fn municipality(id: &str, name: &str, latitude: f64) -> MunicipalityRecord {
        MunicipalityRecord::new(id, name, "SP", LatLon(latitude, -47.0))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_tags_every_observation() {
        let downloader = BatchDownloader::new(FakeSource::default());
        let towns = [municipality("3509502", "Campinas", -22.9)];

        let series = downloader.download_range(&towns, day(1), day(3)).await;

        assert_eq!(series.len(), 3);
        assert!(series
            .iter()
            .all(|o| o.municipality_id == "3509502" && o.municipality == "Campinas"));
        assert_eq!(
            series.iter().map(|o| o.date).collect::<Vec<_>>(),
            vec![day(1), day(2), day(3)]
        );
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_batch() {
        let downloader = BatchDownloader::new(FakeSource::failing(&[-23.0]));
        let towns = [
            municipality("1", "Alpha", -21.0),
            municipality("2", "Beta", -23.0),
            municipality("3", "Gamma", -24.0),
        ];

        let (series, failures) = downloader
            .download_range_with_failures(&towns, day(1), day(2))
            .await;

        assert_eq!(downloader.source().call_count(), 3);
        assert_eq!(series.len(), 4);
        assert_eq!(series.municipality_names(), vec!["Alpha", "Gamma"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].municipality, "Beta");
        assert_eq!(failures[0].municipality_id, "2");
    }

    #[tokio::test]
    async fn test_all_failures_give_an_empty_series() {
        let downloader = BatchDownloader::new(FakeSource::failing(&[-21.0]));
        let towns = [municipality("1", "Alpha", -21.0)];

        let series = downloader.download_range(&towns, day(1), day(2)).await;
        assert!(series.is_empty());
    }
}
