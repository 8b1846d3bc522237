mod analysis;
mod atlas;
mod climate;
mod error;
mod filtering;
mod geography;
mod types;
mod utils;

pub use atlas::*;
pub use error::ClimateAtlasError;

pub use types::frame::ClimateLazyFrame;
pub use types::municipality::{LatLon, MunicipalityRecord, MunicipalitySelection};
pub use types::observation::{DailyObservation, Measurement, PointReading, MISSING_SENTINEL};
pub use types::period::{first_day_years_back, AnyDate, DateRange, Month, Year};
pub use types::series::ClimateSeries;

pub use filtering::{ClimateFrameFilterExt, COL_MONTH, COL_YEAR};

pub use geography::boundaries::{fetch_boundaries, total_bounds, MunicipalityBoundary};
pub use geography::directory::{fetch_directory, DirectoryEntry};
pub use geography::municipalities::{join_municipalities, MunicipalityResolver};

pub use climate::cleaner::clean;
pub use climate::downloader::{BatchDownloader, FetchFailure};
pub use climate::fetch_cache::{CachePolicy, CachedPointSource};
pub use climate::point_fetcher::{PointSource, PowerClient};
pub use climate::reconcile::{Reconciler, WatermarkPolicy, DEFAULT_LAG_DAYS};
pub use climate::store::ClimateStore;

pub use analysis::aggregate::{aggregate, AggregateRow};
pub use analysis::summary::{
    summarize, SeriesSummary, COLD_DAY_THRESHOLD_C, DRY_DAY_THRESHOLD_MM, HOT_DAY_THRESHOLD_C,
};

pub use climate::error::ClimateDataError;
pub use geography::error::GeographyError;
