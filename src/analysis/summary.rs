use crate::types::municipality::MunicipalitySelection;
use crate::types::series::ClimateSeries;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

/// Days with less precipitation than this (mm) count as dry.
pub const DRY_DAY_THRESHOLD_MM: f64 = 0.5;
/// Days whose maximum exceeds this (°C) count as hot.
pub const HOT_DAY_THRESHOLD_C: f64 = 35.0;
/// Days whose minimum falls below this (°C) count as cold.
pub const COLD_DAY_THRESHOLD_C: f64 = 5.0;

/// Headline figures for a selection of the series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesSummary {
    /// Distinct calendar days covered.
    pub total_days: usize,
    /// Distinct days on which at least one selected municipality was dry.
    pub dry_days: usize,
    pub hot_days: usize,
    pub cold_days: usize,
    /// Mean over years of the yearly precipitation total, averaged across
    /// municipalities when more than one is selected.
    pub mean_annual_precipitation: Option<f64>,
}

/// Summarizes the rows of `series` matching `selection`.
///
/// Day counts are distinct dates, so a state-wide selection counts a date once
/// however many municipalities qualify on it. Absent values never qualify.
pub fn summarize(series: &ClimateSeries, selection: &MunicipalitySelection) -> SeriesSummary {
    let mut days = BTreeSet::new();
    let mut dry = BTreeSet::new();
    let mut hot = BTreeSet::new();
    let mut cold = BTreeSet::new();
    let mut yearly: BTreeMap<(i32, &str), f64> = BTreeMap::new();

    for observation in series
        .iter()
        .filter(|o| selection.matches(&o.municipality_id, &o.municipality))
    {
        let date = observation.date;
        days.insert(date);
        mark(&mut dry, date, observation.precipitation, |p| {
            p < DRY_DAY_THRESHOLD_MM
        });
        mark(&mut hot, date, observation.temp_max, |t| t > HOT_DAY_THRESHOLD_C);
        mark(&mut cold, date, observation.temp_min, |t| {
            t < COLD_DAY_THRESHOLD_C
        });
        *yearly
            .entry((date.year(), observation.municipality_id.as_str()))
            .or_default() += observation.precipitation.unwrap_or(0.0);
    }

    SeriesSummary {
        total_days: days.len(),
        dry_days: dry.len(),
        hot_days: hot.len(),
        cold_days: cold.len(),
        mean_annual_precipitation: mean_annual_precipitation(&yearly),
    }
}

fn mark(
    set: &mut BTreeSet<NaiveDate>,
    date: NaiveDate,
    value: Option<f64>,
    qualifies: impl Fn(f64) -> bool,
) {
    if value.is_some_and(qualifies) {
        set.insert(date);
    }
}

// Per year: mean of the municipal totals. Then the mean of those over years.
fn mean_annual_precipitation(yearly: &BTreeMap<(i32, &str), f64>) -> Option<f64> {
    let mut per_year: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for ((year, _), total) in yearly {
        let entry = per_year.entry(*year).or_default();
        entry.0 += total;
        entry.1 += 1;
    }
    if per_year.is_empty() {
        return None;
    }
    let years = per_year.len() as f64;
    Some(
        per_year
            .values()
            .map(|(sum, count)| sum / *count as f64)
            .sum::<f64>()
            / years,
    )
}
