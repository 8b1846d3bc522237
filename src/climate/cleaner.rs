use crate::types::observation::{Measurement, MISSING_SENTINEL};
use crate::types::series::ClimateSeries;
use log::debug;
use std::collections::HashMap;

/// Replaces the missing-value sentinel with an absent value, then fills gaps per
/// municipality: forward from the nearest earlier value, and for leading gaps
/// backward from the nearest later value.
///
/// Row order is preserved and values never propagate between municipalities.
/// A field that is absent on every row of a municipality stays absent.
pub fn clean(mut series: ClimateSeries) -> ClimateSeries {
    let rows = series.observations_mut();

    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, observation) in rows.iter().enumerate() {
        groups
            .entry(observation.municipality_id.clone())
            .or_default()
            .push(index);
    }

    let mut sentinels = 0usize;
    for measurement in Measurement::ALL {
        for observation in rows.iter_mut() {
            let value = measurement.get_mut(observation);
            if *value == Some(MISSING_SENTINEL) {
                *value = None;
                sentinels += 1;
            }
        }

        for indices in groups.values() {
            let mut values: Vec<Option<f64>> =
                indices.iter().map(|&i| measurement.get(&rows[i])).collect();
            fill_gaps(&mut values);
            for (&i, value) in indices.iter().zip(values) {
                *measurement.get_mut(&mut rows[i]) = value;
            }
        }
    }

    if sentinels > 0 {
        debug!(
            "Replaced {} missing-value sentinels across {} municipalities",
            sentinels,
            groups.len()
        );
    }
    series
}

/// Forward fill followed by backward fill.
fn fill_gaps(values: &mut [Option<f64>]) {
    let mut last = None;
    for value in values.iter_mut() {
        match value {
            Some(v) => last = Some(*v),
            None => *value = last,
        }
    }
    let mut next = None;
    for value in values.iter_mut().rev() {
        match value {
            Some(v) => next = Some(*v),
            None => *value = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::series::tests::observation;

    fn precipitation_of(series: &ClimateSeries, municipality: &str) -> Vec<Option<f64>> {
        series
            .iter()
            .filter(|o| o.municipality == municipality)
            .map(|o| o.precipitation)
            .collect()
    }

    fn series_with(municipality: &str, values: &[Option<f64>]) -> ClimateSeries {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| observation(municipality, (2024, 5, i as u32 + 1), *v, Some(20.0)))
            .collect()
    }

    #[test]
    fn test_forward_fill_interior_gaps() {
        let series = series_with("A", &[Some(10.0), None, Some(MISSING_SENTINEL), Some(40.0)]);
        let cleaned = clean(series);
        assert_eq!(
            precipitation_of(&cleaned, "A"),
            vec![Some(10.0), Some(10.0), Some(10.0), Some(40.0)]
        );
    }

    #[test]
    fn test_backward_fill_leading_gaps() {
        let series = series_with("A", &[Some(MISSING_SENTINEL), None, Some(30.0)]);
        let cleaned = clean(series);
        assert_eq!(
            precipitation_of(&cleaned, "A"),
            vec![Some(30.0), Some(30.0), Some(30.0)]
        );
    }

    #[test]
    fn test_all_missing_stays_absent() {
        let series = series_with("A", &[Some(MISSING_SENTINEL), None]);
        let cleaned = clean(series);
        assert_eq!(precipitation_of(&cleaned, "A"), vec![None, None]);
    }

    #[test]
    fn test_does_not_fill_across_municipalities() {
        let mut rows = series_with("A", &[Some(5.0), Some(6.0)]).into_observations();
        rows.extend(series_with("B", &[None, Some(MISSING_SENTINEL)]));
        // Interleave so that B's rows directly follow A's values.
        rows.swap(1, 2);

        let cleaned = clean(ClimateSeries::new(rows));

        assert_eq!(precipitation_of(&cleaned, "A"), vec![Some(5.0), Some(6.0)]);
        assert_eq!(precipitation_of(&cleaned, "B"), vec![None, None]);
    }

    #[test]
    fn test_every_measurement_is_cleaned() {
        let mut first = observation("A", (2024, 1, 1), Some(MISSING_SENTINEL), Some(MISSING_SENTINEL));
        first.temp_max = Some(MISSING_SENTINEL);
        first.temp_min = Some(MISSING_SENTINEL);
        let second = observation("A", (2024, 1, 2), Some(1.5), Some(20.0));

        let cleaned = clean(ClimateSeries::new(vec![first, second.clone()]));

        let filled = &cleaned.observations()[0];
        assert_eq!(filled.precipitation, Some(1.5));
        assert_eq!(filled.temp_avg, Some(20.0));
        assert_eq!(filled.temp_max, second.temp_max);
        assert_eq!(filled.temp_min, second.temp_min);
    }
}
