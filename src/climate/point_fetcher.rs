use crate::climate::error::ClimateDataError;
use crate::types::municipality::LatLon;
use crate::types::observation::{Measurement, PointReading};
use crate::types::period::{parse_compact, to_compact};
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;

const POWER_DAILY_POINT_URL: &str = "https://power.larc.nasa.gov/api/temporal/daily/point";
const POWER_COMMUNITY: &str = "SB";

/// Something that can produce daily readings for a single coordinate.
///
/// [`PowerClient`] is the production implementation; [`crate::CachedPointSource`]
/// memoizes any other source.
pub trait PointSource {
    /// Daily readings for `location` from `start` to `end` inclusive, in
    /// chronological order. Missing values may be reported with the
    /// [`crate::MISSING_SENTINEL`] value.
    fn fetch_point(
        &self,
        location: LatLon,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<PointReading>, ClimateDataError>> + Send;
}

impl<S: PointSource + Sync> PointSource for &S {
    async fn fetch_point(
        &self,
        location: LatLon,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PointReading>, ClimateDataError> {
        (**self).fetch_point(location, start, end).await
    }
}

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    // parameter name -> compact date -> value
    parameter: HashMap<String, HashMap<String, Option<f64>>>,
}

/// Client for the NASA POWER daily point endpoint.
pub struct PowerClient {
    client: Client,
    base_url: String,
}

impl Default for PowerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerClient {
    pub fn new() -> Self {
        Self::with_base_url(POWER_DAILY_POINT_URL)
    }

    /// Points the client at a different endpoint with the same query interface.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn request_url(&self, location: LatLon, start: NaiveDate, end: NaiveDate) -> String {
        let parameters: Vec<&str> = Measurement::ALL
            .iter()
            .map(Measurement::power_parameter)
            .collect();
        format!(
            "{}?parameters={}&community={}&longitude={}&latitude={}&start={}&end={}&format=JSON",
            self.base_url,
            parameters.join(","),
            POWER_COMMUNITY,
            location.longitude(),
            location.latitude(),
            to_compact(start),
            to_compact(end),
        )
    }
}

impl PointSource for PowerClient {
    async fn fetch_point(
        &self,
        location: LatLon,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PointReading>, ClimateDataError> {
        let url = self.request_url(location, start, end);
        info!("Downloading daily point data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClimateDataError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    ClimateDataError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    ClimateDataError::NetworkRequest(url, e)
                });
            }
        };

        let body: PowerResponse = response
            .json()
            .await
            .map_err(|e| ClimateDataError::JsonParse { url, source: e })?;
        let readings = readings_from_parameters(body.properties.parameter)?;
        debug!(
            "Parsed {} daily readings for ({}, {})",
            readings.len(),
            location.latitude(),
            location.longitude()
        );
        Ok(readings)
    }
}

/// Pivots the parameter-major payload into one reading per date, ordered by date.
/// Dates present for only some parameters leave the others absent.
fn readings_from_parameters(
    parameters: HashMap<String, HashMap<String, Option<f64>>>,
) -> Result<Vec<PointReading>, ClimateDataError> {
    let mut by_date: BTreeMap<NaiveDate, PointReading> = BTreeMap::new();
    for (name, values) in parameters {
        let Some(measurement) = Measurement::from_power_parameter(&name) else {
            debug!("Ignoring unrequested parameter {}", name);
            continue;
        };
        for (key, value) in values {
            let date = parse_compact(&key).ok_or(ClimateDataError::InvalidDateKey(key))?;
            let reading = by_date
                .entry(date)
                .or_insert_with(|| PointReading::empty(date));
            *measurement.reading_mut(reading) = value;
        }
    }
    Ok(by_date.into_values().collect())
}
