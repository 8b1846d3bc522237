use crate::types::municipality::MunicipalityRecord;
use chrono::NaiveDate;
use std::fmt;

/// Value NASA POWER reports when a measurement is unavailable.
pub const MISSING_SENTINEL: f64 = -999.0;

/// One day of point data as returned by the climate API, before it is tied to
/// a municipality. Sentinel values are kept as-is.
#[derive(Debug, PartialEq, Clone)]
pub struct PointReading {
    pub date: NaiveDate,
    pub precipitation: Option<f64>, // PRECTOTCORR (mm/day)
    pub temp_avg: Option<f64>,      // T2M (°C)
    pub temp_max: Option<f64>,      // T2M_MAX (°C)
    pub temp_min: Option<f64>,      // T2M_MIN (°C)
}

impl PointReading {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            precipitation: None,
            temp_avg: None,
            temp_max: None,
            temp_min: None,
        }
    }

    /// Attaches the reading to a municipality.
    pub fn tag(self, municipality: &MunicipalityRecord) -> DailyObservation {
        DailyObservation {
            date: self.date,
            municipality_id: municipality.id.clone(),
            municipality: municipality.name.clone(),
            precipitation: self.precipitation,
            temp_avg: self.temp_avg,
            temp_max: self.temp_max,
            temp_min: self.temp_min,
        }
    }
}

/// One day of climate data for one municipality.
#[derive(Debug, PartialEq, Clone)]
pub struct DailyObservation {
    pub date: NaiveDate,
    pub municipality_id: String,
    pub municipality: String,
    pub precipitation: Option<f64>, // mm
    pub temp_avg: Option<f64>,      // °C
    pub temp_max: Option<f64>,      // °C
    pub temp_min: Option<f64>,      // °C
}

/// The four measured fields of a [`DailyObservation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measurement {
    Precipitation,
    TempAvg,
    TempMax,
    TempMin,
}

impl Measurement {
    pub const ALL: [Measurement; 4] = [
        Measurement::Precipitation,
        Measurement::TempAvg,
        Measurement::TempMax,
        Measurement::TempMin,
    ];

    /// Column name used in the persisted store.
    pub fn column_name(&self) -> &'static str {
        match self {
            Measurement::Precipitation => "prcp",
            Measurement::TempAvg => "tavg",
            Measurement::TempMax => "tmax",
            Measurement::TempMin => "tmin",
        }
    }

    /// Parameter name in the NASA POWER API.
    pub(crate) fn power_parameter(&self) -> &'static str {
        match self {
            Measurement::Precipitation => "PRECTOTCORR",
            Measurement::TempAvg => "T2M",
            Measurement::TempMax => "T2M_MAX",
            Measurement::TempMin => "T2M_MIN",
        }
    }

    pub(crate) fn from_power_parameter(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|measurement| measurement.power_parameter() == name)
    }

    pub fn get(&self, observation: &DailyObservation) -> Option<f64> {
        match self {
            Measurement::Precipitation => observation.precipitation,
            Measurement::TempAvg => observation.temp_avg,
            Measurement::TempMax => observation.temp_max,
            Measurement::TempMin => observation.temp_min,
        }
    }

    pub fn get_mut<'a>(&self, observation: &'a mut DailyObservation) -> &'a mut Option<f64> {
        match self {
            Measurement::Precipitation => &mut observation.precipitation,
            Measurement::TempAvg => &mut observation.temp_avg,
            Measurement::TempMax => &mut observation.temp_max,
            Measurement::TempMin => &mut observation.temp_min,
        }
    }

    pub(crate) fn reading_mut<'a>(&self, reading: &'a mut PointReading) -> &'a mut Option<f64> {
        match self {
            Measurement::Precipitation => &mut reading.precipitation,
            Measurement::TempAvg => &mut reading.temp_avg,
            Measurement::TempMax => &mut reading.temp_max,
            Measurement::TempMin => &mut reading.temp_min,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}
