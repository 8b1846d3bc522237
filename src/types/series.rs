//! [`ClimateSeries`], the in-memory form of the combined per-municipality
//! daily series, and its conversion to and from the Polars `DataFrame` layout
//! used by the persisted store.

use crate::climate::error::ClimateDataError;
use crate::types::frame::ClimateLazyFrame;
use crate::types::municipality::MunicipalitySelection;
use crate::types::observation::{DailyObservation, Measurement};
use crate::types::period::DateRange;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};

pub(crate) const COL_DATE: &str = "date";
pub(crate) const COL_MUNICIPALITY_ID: &str = "municipality_id";
pub(crate) const COL_MUNICIPALITY: &str = "municipality";

// Days from 0001-01-01 (CE) to 1970-01-01, the epoch of the Polars Date type.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Daily observations for any number of municipalities.
///
/// Rows keep the order they were produced in; [`ClimateSeries::sort`] orders
/// them by date and municipality. After [`ClimateSeries::dedup`] no two rows
/// are identical in every field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClimateSeries {
    observations: Vec<DailyObservation>,
}

impl ClimateSeries {
    pub fn new(observations: Vec<DailyObservation>) -> Self {
        Self { observations }
    }

    pub fn observations(&self) -> &[DailyObservation] {
        &self.observations
    }

    pub(crate) fn observations_mut(&mut self) -> &mut [DailyObservation] {
        &mut self.observations
    }

    pub fn into_observations(self) -> Vec<DailyObservation> {
        self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DailyObservation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Latest date across all municipalities.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.observations.iter().map(|o| o.date).max()
    }

    /// Latest date per municipality id.
    pub fn latest_date_by_municipality(&self) -> HashMap<String, NaiveDate> {
        let mut latest: HashMap<String, NaiveDate> = HashMap::new();
        for observation in &self.observations {
            latest
                .entry(observation.municipality_id.clone())
                .and_modify(|date| *date = (*date).max(observation.date))
                .or_insert(observation.date);
        }
        latest
    }

    /// Earliest and latest date present, if any.
    pub fn date_bounds(&self) -> Option<DateRange> {
        let start = self.observations.iter().map(|o| o.date).min()?;
        let end = self.latest_date()?;
        DateRange::new(start, end)
    }

    /// Appends `other` after the rows of `self`.
    pub fn concat(mut self, other: ClimateSeries) -> Self {
        self.observations.extend(other.observations);
        self
    }

    /// Removes rows identical to an earlier row in every field, keeping the first occurrence.
    pub fn dedup(self) -> Self {
        let keep: Vec<bool> = {
            let mut seen = HashSet::with_capacity(self.observations.len());
            self.observations
                .iter()
                .map(|o| seen.insert(RowKey::of(o)))
                .collect()
        };
        let observations = self
            .observations
            .into_iter()
            .zip(keep)
            .filter_map(|(observation, first)| first.then_some(observation))
            .collect();
        Self { observations }
    }

    /// Orders rows by date, then municipality id. The sort is stable.
    pub fn sort(&mut self) {
        self.observations.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.municipality_id.cmp(&b.municipality_id))
        });
    }

    pub fn filter_range(&self, range: &DateRange) -> Self {
        self.observations
            .iter()
            .filter(|o| range.contains(o.date))
            .cloned()
            .collect()
    }

    pub fn select(&self, selection: &MunicipalitySelection) -> Self {
        if selection.is_all() {
            return self.clone();
        }
        self.observations
            .iter()
            .filter(|o| selection.matches(&o.municipality_id, &o.municipality))
            .cloned()
            .collect()
    }

    /// Distinct municipality display names, sorted.
    pub fn municipality_names(&self) -> Vec<String> {
        self.observations
            .iter()
            .map(|o| o.municipality.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Converts the series to the store layout: `date` (Date), `municipality_id`,
    /// `municipality`, then one Float64 column per [`Measurement`].
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let days: Vec<i32> = self
            .observations
            .iter()
            .map(|o| o.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect();
        let ids: Vec<&str> = self
            .observations
            .iter()
            .map(|o| o.municipality_id.as_str())
            .collect();
        let names: Vec<&str> = self
            .observations
            .iter()
            .map(|o| o.municipality.as_str())
            .collect();

        let mut columns = vec![
            Column::new(COL_DATE.into(), days).cast(&DataType::Date)?,
            Column::new(COL_MUNICIPALITY_ID.into(), ids),
            Column::new(COL_MUNICIPALITY.into(), names),
        ];
        for measurement in Measurement::ALL {
            let values: Vec<Option<f64>> = self
                .observations
                .iter()
                .map(|o| measurement.get(o))
                .collect();
            columns.push(Column::new(measurement.column_name().into(), values));
        }
        DataFrame::new(columns)
    }

    /// Reads a series back from a DataFrame in the store layout.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self, ClimateDataError> {
        let dates = get_column(df, COL_DATE)?.cast(&DataType::Int32)?;
        let dates = dates.i32()?;
        let ids = get_column(df, COL_MUNICIPALITY_ID)?.str()?;
        let names = get_column(df, COL_MUNICIPALITY)?.str()?;
        let precipitation = get_column(df, Measurement::Precipitation.column_name())?.f64()?;
        let temp_avg = get_column(df, Measurement::TempAvg.column_name())?.f64()?;
        let temp_max = get_column(df, Measurement::TempMax.column_name())?.f64()?;
        let temp_min = get_column(df, Measurement::TempMin.column_name())?.f64()?;

        let missing = |column: &str, row: usize| ClimateDataError::MissingValue {
            column: column.to_string(),
            row,
        };

        let mut observations = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let date = dates
                .get(row)
                .and_then(date_from_epoch_days)
                .ok_or_else(|| missing(COL_DATE, row))?;
            let municipality_id = ids
                .get(row)
                .ok_or_else(|| missing(COL_MUNICIPALITY_ID, row))?;
            let municipality = names
                .get(row)
                .ok_or_else(|| missing(COL_MUNICIPALITY, row))?;
            observations.push(DailyObservation {
                date,
                municipality_id: municipality_id.to_string(),
                municipality: municipality.to_string(),
                precipitation: precipitation.get(row),
                temp_avg: temp_avg.get(row),
                temp_max: temp_max.get(row),
                temp_min: temp_min.get(row),
            });
        }
        Ok(Self { observations })
    }

    /// A lazy Polars view over the series.
    pub fn lazy(&self) -> PolarsResult<ClimateLazyFrame> {
        Ok(ClimateLazyFrame::new(self.to_dataframe()?.lazy()))
    }
}

impl FromIterator<DailyObservation> for ClimateSeries {
    fn from_iter<I: IntoIterator<Item = DailyObservation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Extend<DailyObservation> for ClimateSeries {
    fn extend<I: IntoIterator<Item = DailyObservation>>(&mut self, iter: I) {
        self.observations.extend(iter);
    }
}

impl IntoIterator for ClimateSeries {
    type Item = DailyObservation;
    type IntoIter = std::vec::IntoIter<DailyObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.into_iter()
    }
}

impl<'a> IntoIterator for &'a ClimateSeries {
    type Item = &'a DailyObservation;
    type IntoIter = std::slice::Iter<'a, DailyObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

/// Full-row identity used for exact-duplicate removal.
#[derive(PartialEq, Eq, Hash)]
struct RowKey<'a> {
    date: NaiveDate,
    municipality_id: &'a str,
    municipality: &'a str,
    values: [Option<u64>; 4],
}

impl<'a> RowKey<'a> {
    fn of(observation: &'a DailyObservation) -> Self {
        Self {
            date: observation.date,
            municipality_id: &observation.municipality_id,
            municipality: &observation.municipality,
            values: Measurement::ALL.map(|m| m.get(observation).map(value_bits)),
        }
    }
}

// -0.0 and 0.0 compare equal, so they must hash equal too.
fn value_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

fn get_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ClimateDataError> {
    df.column(name)
        .map_err(|e| ClimateDataError::ColumnNotFound(name.to_string(), e))
}

pub(crate) fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn observation(
        municipality: &str,
        date: (i32, u32, u32),
        precipitation: Option<f64>,
        temp_avg: Option<f64>,
    ) -> DailyObservation {
        DailyObservation {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            municipality_id: format!("id-{}", municipality),
            municipality: municipality.to_string(),
            precipitation,
            temp_avg,
            temp_max: temp_avg.map(|t| t + 5.0),
            temp_min: temp_avg.map(|t| t - 5.0),
        }
    }

    #[test]
    fn test_dedup_keeps_first_of_exact_duplicates_only() {
        let a = observation("A", (2024, 1, 1), Some(1.0), Some(20.0));
        let b = observation("B", (2024, 1, 1), Some(1.0), Some(20.0));
        let mut a_changed = a.clone();
        a_changed.precipitation = Some(2.0);

        let series = ClimateSeries::new(vec![a.clone(), b.clone(), a.clone(), a_changed.clone()]);
        let deduped = series.dedup();

        assert_eq!(deduped.observations(), &[a, b, a_changed]);
    }

    #[test]
    fn test_dedup_of_fully_overlapping_delta_is_union_by_key() {
        let s1: ClimateSeries = (1..=5)
            .map(|d| observation("A", (2024, 3, d), Some(d as f64), Some(22.0)))
            .collect();
        let s2: ClimateSeries = (1..=7)
            .map(|d| observation("A", (2024, 3, d), Some(d as f64), Some(22.0)))
            .collect();

        let merged = s1.clone().concat(s2.clone()).dedup();

        assert_eq!(merged.len(), 7);
        assert_ne!(merged.len(), s1.len() + s2.len());
    }

    #[test]
    fn test_latest_dates_and_bounds() {
        let series = ClimateSeries::new(vec![
            observation("A", (2024, 1, 3), None, None),
            observation("B", (2024, 1, 9), None, None),
            observation("A", (2024, 1, 1), None, None),
        ]);
        assert_eq!(series.latest_date(), NaiveDate::from_ymd_opt(2024, 1, 9));
        let per = series.latest_date_by_municipality();
        assert_eq!(per["id-A"], NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(per["id-B"], NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());

        let bounds = series.date_bounds().unwrap();
        assert_eq!(bounds.start(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(bounds.end(), NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());

        assert!(ClimateSeries::default().date_bounds().is_none());
    }

    #[test]
    fn test_sort_filter_and_names() {
        let mut series = ClimateSeries::new(vec![
            observation("Santos", (2024, 2, 2), Some(1.0), None),
            observation("Campinas", (2024, 2, 2), Some(2.0), None),
            observation("Santos", (2024, 2, 1), Some(3.0), None),
        ]);
        series.sort();
        let order: Vec<_> = series
            .iter()
            .map(|o| (o.date.day(), o.municipality.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "Santos"), (2, "Campinas"), (2, "Santos")]);

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
        )
        .unwrap();
        assert_eq!(series.filter_range(&range).len(), 2);
        assert_eq!(
            series
                .select(&MunicipalitySelection::municipality("Santos"))
                .len(),
            2
        );
        assert_eq!(series.municipality_names(), vec!["Campinas", "Santos"]);
    }

    #[test]
    fn test_dataframe_round_trip_keeps_rows() -> Result<(), Box<dyn std::error::Error>> {
        let series = ClimateSeries::new(vec![
            observation("Campinas", (2019, 12, 31), Some(0.4), Some(25.1)),
            observation("São Paulo", (2020, 1, 1), None, Some(19.0)),
        ]);

        let df = series.to_dataframe()?;
        assert_eq!(df.height(), 2);
        assert_eq!(df.column(COL_DATE)?.dtype(), &DataType::Date);

        let restored = ClimateSeries::from_dataframe(&df)?;
        assert_eq!(restored, series);
        Ok(())
    }

    #[test]
    fn test_from_dataframe_reports_missing_column() -> Result<(), Box<dyn std::error::Error>> {
        let df = ClimateSeries::default().to_dataframe()?.drop(COL_MUNICIPALITY)?;
        let err = ClimateSeries::from_dataframe(&df).unwrap_err();
        assert!(matches!(err, ClimateDataError::ColumnNotFound(ref c, _) if c == COL_MUNICIPALITY));
        Ok(())
    }
}
