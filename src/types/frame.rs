//! Contains the `ClimateLazyFrame` structure for lazy operations on the combined
//! municipal climate series.

use crate::climate::error::ClimateDataError;
use crate::error::ClimateAtlasError;
use crate::filtering::ClimateFrameFilterExt;
use crate::types::municipality::MunicipalitySelection;
use crate::types::period::{AnyDate, DateRange};
use crate::types::series::{ClimateSeries, COL_DATE};
use polars::prelude::{col, lit, Expr, LazyFrame};

/// A wrapper around a Polars `LazyFrame` holding climate rows in the store layout
/// (`date`, `municipality_id`, `municipality`, `prcp`, `tavg`, `tmax`, `tmin`).
///
/// Obtained from [`ClimateSeries::lazy`]. Every method returns a *new*
/// `ClimateLazyFrame`; nothing is computed until [`ClimateLazyFrame::collect_series`]
/// or `frame.collect()` is called.
///
/// # Example
///
/// ```no_run
/// # use municipal_climate::{ClimateAtlas, MunicipalitySelection, Year};
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let atlas = ClimateAtlas::builder().build().await?;
/// let series = atlas.sync().await?;
///
/// let campinas_2023 = series
///     .lazy()?
///     .for_selection(&MunicipalitySelection::municipality("Campinas"))
///     .get_for_period(Year(2023))?
///     .collect_series()?;
/// println!("{} days for Campinas in 2023", campinas_2023.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ClimateLazyFrame {
    /// The underlying Polars LazyFrame.
    pub frame: LazyFrame,
}

impl ClimateLazyFrame {
    pub fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    /// Applies an arbitrary Polars predicate.
    pub fn filter(&self, predicate: Expr) -> ClimateLazyFrame {
        ClimateLazyFrame::new(self.frame.clone().filter(predicate))
    }

    /// Keeps dates from the start of `start` to the end of `end`, both inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateAtlasError::DateParsingError`] if either bound cannot be
    /// resolved, and [`ClimateAtlasError::InvalidDateRange`] if the resolved start
    /// is after the resolved end.
    pub fn get_range(
        &self,
        start: impl AnyDate,
        end: impl AnyDate,
    ) -> Result<ClimateLazyFrame, ClimateAtlasError> {
        let start = start
            .date_range()
            .ok_or(ClimateAtlasError::DateParsingError)?
            .start();
        let end = end
            .date_range()
            .ok_or(ClimateAtlasError::DateParsingError)?
            .end();
        if start > end {
            return Err(ClimateAtlasError::InvalidDateRange { start, end });
        }
        Ok(ClimateLazyFrame::new(
            self.frame.clone().filter_dates(start, end),
        ))
    }

    /// Keeps the rows of a single day. Periods resolve to their first day.
    pub fn get_at(&self, date: impl AnyDate) -> Result<ClimateLazyFrame, ClimateAtlasError> {
        let day = date
            .date_range()
            .ok_or(ClimateAtlasError::DateParsingError)?
            .start();
        Ok(self.filter(col(COL_DATE).eq(lit(day))))
    }

    /// Keeps every day of `period`, e.g. a [`crate::Year`] or [`crate::Month`].
    pub fn get_for_period(
        &self,
        period: impl AnyDate,
    ) -> Result<ClimateLazyFrame, ClimateAtlasError> {
        let range: DateRange = period
            .date_range()
            .ok_or(ClimateAtlasError::DateParsingError)?;
        self.get_range(range.start(), range.end())
    }

    pub fn for_selection(&self, selection: &MunicipalitySelection) -> ClimateLazyFrame {
        ClimateLazyFrame::new(self.frame.clone().filter_selection(selection))
    }

    /// Collects the frame back into a [`ClimateSeries`].
    pub fn collect_series(&self) -> Result<ClimateSeries, ClimateDataError> {
        let df = self.frame.clone().collect()?;
        ClimateSeries::from_dataframe(&df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::period::{Month, Year};
    use crate::types::series::tests::observation;
    use chrono::{Datelike, NaiveDate};

    fn sample_frame() -> ClimateLazyFrame {
        let series: ClimateSeries = (1..=31)
            .map(|d| observation("Sorocaba", (2022, 12, d), Some(d as f64), Some(21.0)))
            .chain((1..=10).map(|d| observation("Sorocaba", (2023, 1, d), Some(0.0), Some(23.0))))
            .collect();
        series.lazy().unwrap()
    }

    #[test]
    fn test_get_for_period_month() -> Result<(), Box<dyn std::error::Error>> {
        let december = sample_frame()
            .get_for_period(Month::new(12, 2022))?
            .collect_series()?;
        assert_eq!(december.len(), 31);
        assert!(december.iter().all(|o| o.date.month() == 12));
        Ok(())
    }

    #[test]
    fn test_get_for_period_year_and_at() -> Result<(), Box<dyn std::error::Error>> {
        let frame = sample_frame();
        assert_eq!(frame.get_for_period(Year(2023))?.collect_series()?.len(), 10);

        let day = frame.get_at("2022-12-25")?.collect_series()?;
        assert_eq!(day.len(), 1);
        assert_eq!(day.observations()[0].precipitation, Some(25.0));
        Ok(())
    }

    #[test]
    fn test_get_range_rejects_inverted_and_unparseable() {
        let frame = sample_frame();
        let err = frame
            .get_range(
                NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            )
            .err()
            .unwrap();
        assert!(matches!(err, ClimateAtlasError::InvalidDateRange { .. }));

        let err = frame.get_range("yesterday", "today").err().unwrap();
        assert!(matches!(err, ClimateAtlasError::DateParsingError));
    }

    #[test]
    fn test_range_and_selection_chain() -> Result<(), Box<dyn std::error::Error>> {
        let none = sample_frame()
            .for_selection(&MunicipalitySelection::municipality("Campinas"))
            .collect_series()?;
        assert!(none.is_empty());

        let some = sample_frame()
            .for_selection(&MunicipalitySelection::municipality("Sorocaba"))
            .get_range("2022-12-30", "2023-01-02")?
            .collect_series()?;
        assert_eq!(some.len(), 4);
        Ok(())
    }
}
