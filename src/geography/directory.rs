use crate::geography::error::GeographyError;
use crate::geography::get_text_if_ok;
use log::info;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const IBGE_LOCALITIES_URL: &str = "https://servicodados.ibge.gov.br/api/v1/localidades";

/// One municipality as listed by the IBGE localities API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: u64,
    #[serde(rename = "nome")]
    pub name: String,
}

pub(crate) fn directory_url(base_url: &str, state: &str) -> String {
    format!(
        "{}/estados/{}/municipios",
        base_url.trim_end_matches('/'),
        state
    )
}

pub(crate) fn parse_directory(url: &str, body: &str) -> Result<Vec<DirectoryEntry>, GeographyError> {
    serde_json::from_str(body).map_err(|e| GeographyError::JsonParse(url.to_string(), e))
}

/// Lists the municipalities of `state` (a two-letter code such as `SP`).
///
/// A non-200 answer is logged and gives an empty list.
pub async fn fetch_directory(
    client: &Client,
    base_url: &str,
    state: &str,
) -> Result<Vec<DirectoryEntry>, GeographyError> {
    let url = directory_url(base_url, state);
    let Some(body) = get_text_if_ok(client, &url).await? else {
        return Ok(Vec::new());
    };
    let entries = parse_directory(&url, &body)?;
    info!("Directory lists {} municipalities for {}", entries.len(), state);
    Ok(entries)
}
