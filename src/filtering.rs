use crate::types::municipality::MunicipalitySelection;
use crate::types::series::{COL_DATE, COL_MUNICIPALITY, COL_MUNICIPALITY_ID};
use chrono::NaiveDate;
use polars::prelude::{col, lit, DataType, LazyFrame};

pub const COL_YEAR: &str = "year";
pub const COL_MONTH: &str = "month";

pub trait ClimateFrameFilterExt {
    /// Filters a climate LazyFrame by a NaiveDate range (inclusive).
    /// Assumes the 'date' column is of type Date.
    ///
    /// # Returns
    /// A new `LazyFrame` with the filter applied. Potential type errors
    /// occur during execution (e.g., `collect`).
    fn filter_dates(self, start_date: NaiveDate, end_date: NaiveDate) -> LazyFrame;

    /// Keeps only rows of the selected municipality, matched by IBGE code or name.
    /// `MunicipalitySelection::All` leaves the frame untouched.
    fn filter_selection(self, selection: &MunicipalitySelection) -> LazyFrame;

    /// Adds integer `year` and `month` columns derived from 'date'.
    fn with_calendar_columns(self) -> LazyFrame;
}

impl ClimateFrameFilterExt for LazyFrame {
    fn filter_dates(self, start_date: NaiveDate, end_date: NaiveDate) -> LazyFrame {
        self.filter(
            col(COL_DATE)
                .cast(DataType::Date)
                .gt_eq(lit(start_date))
                .and(col(COL_DATE).cast(DataType::Date).lt_eq(lit(end_date))),
        )
    }

    fn filter_selection(self, selection: &MunicipalitySelection) -> LazyFrame {
        match selection {
            MunicipalitySelection::All => self,
            MunicipalitySelection::Municipality(key) => self.filter(
                col(COL_MUNICIPALITY_ID)
                    .eq(lit(key.as_str()))
                    .or(col(COL_MUNICIPALITY).eq(lit(key.as_str()))),
            ),
        }
    }

    fn with_calendar_columns(self) -> LazyFrame {
        self.with_columns([
            col(COL_DATE).dt().year().alias(COL_YEAR),
            col(COL_DATE).dt().month().alias(COL_MONTH),
        ])
    }
}
