use crate::types::municipality::MunicipalitySelection;
use crate::types::observation::DailyObservation;
use crate::types::series::ClimateSeries;
use chrono::Datelike;
use std::collections::BTreeMap;

/// Monthly totals and means for one municipality or for the whole state.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub year: i32,
    pub month: u32,
    pub scope: MunicipalitySelection,
    /// Sum of daily precipitation (mm); for `All`, the mean of the municipal sums.
    pub precipitation: f64,
    pub temp_avg: Option<f64>,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn get(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Default)]
struct MonthBucket {
    precipitation: f64,
    temp_avg: Mean,
    temp_max: Mean,
    temp_min: Mean,
}

impl MonthBucket {
    fn push(&mut self, observation: &DailyObservation) {
        self.precipitation += observation.precipitation.unwrap_or(0.0);
        self.temp_avg.push(observation.temp_avg);
        self.temp_max.push(observation.temp_max);
        self.temp_min.push(observation.temp_min);
    }
}

/// Groups `series` by calendar month.
///
/// For a single municipality, precipitation is summed and temperatures are
/// averaged over the days of each month. For [`MunicipalitySelection::All`], each
/// municipality is first aggregated that way, then the per-municipality monthly
/// values are averaged with equal weight per municipality.
///
/// Rows are ordered by year, then month.
pub fn aggregate(series: &ClimateSeries, selection: &MunicipalitySelection) -> Vec<AggregateRow> {
    match selection {
        MunicipalitySelection::Municipality(_) => {
            let mut buckets: BTreeMap<(i32, u32), MonthBucket> = BTreeMap::new();
            for observation in series
                .iter()
                .filter(|o| selection.matches(&o.municipality_id, &o.municipality))
            {
                buckets
                    .entry((observation.date.year(), observation.date.month()))
                    .or_default()
                    .push(observation);
            }
            buckets
                .into_iter()
                .map(|((year, month), bucket)| AggregateRow {
                    year,
                    month,
                    scope: selection.clone(),
                    precipitation: bucket.precipitation,
                    temp_avg: bucket.temp_avg.get(),
                    temp_max: bucket.temp_max.get(),
                    temp_min: bucket.temp_min.get(),
                })
                .collect()
        }
        MunicipalitySelection::All => {
            let mut per_municipality: BTreeMap<(i32, u32, &str), MonthBucket> = BTreeMap::new();
            for observation in series {
                per_municipality
                    .entry((
                        observation.date.year(),
                        observation.date.month(),
                        observation.municipality_id.as_str(),
                    ))
                    .or_default()
                    .push(observation);
            }

            let mut state: BTreeMap<(i32, u32), [Mean; 4]> = BTreeMap::new();
            for ((year, month, _), bucket) in per_municipality {
                let means = state.entry((year, month)).or_default();
                means[0].push(Some(bucket.precipitation));
                means[1].push(bucket.temp_avg.get());
                means[2].push(bucket.temp_max.get());
                means[3].push(bucket.temp_min.get());
            }
            state
                .into_iter()
                .map(|((year, month), [precipitation, temp_avg, temp_max, temp_min])| {
                    AggregateRow {
                        year,
                        month,
                        scope: MunicipalitySelection::All,
                        precipitation: precipitation.get().unwrap_or(0.0),
                        temp_avg: temp_avg.get(),
                        temp_max: temp_max.get(),
                        temp_min: temp_min.get(),
                    }
                })
                .collect()
        }
    }
}
