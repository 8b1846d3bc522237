pub mod boundaries;
pub mod directory;
pub mod error;
pub mod municipalities;

use crate::geography::error::GeographyError;
use log::warn;
use reqwest::{Client, StatusCode};

/// Body of a GET to `url`, or `None` when the server answers with anything
/// other than 200. Transport failures are errors.
pub(crate) async fn get_text_if_ok(
    client: &Client,
    url: &str,
) -> Result<Option<String>, GeographyError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| GeographyError::NetworkRequest(url.to_string(), e))?;
    let status = response.status();
    if status != StatusCode::OK {
        warn!("Request to {} returned status {}", url, status);
        return Ok(None);
    }
    let body = response
        .text()
        .await
        .map_err(|e| GeographyError::NetworkRequest(url.to_string(), e))?;
    Ok(Some(body))
}
