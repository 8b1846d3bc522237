use crate::geography::error::GeographyError;
use crate::geography::get_text_if_ok;
use crate::types::municipality::LatLon;
use geo::{BoundingRect, Centroid, Coord, LineString, MultiPolygon, Polygon, Rect};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;

pub const IBGE_MESHES_URL: &str = "https://servicodados.ibge.gov.br/api/v4/malhas";

/// The outline of one municipality, keyed by its IBGE area code.
///
/// Coordinates are longitude/latitude (x/y), as delivered by the mesh API.
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityBoundary {
    pub area_code: String,
    pub geometry: MultiPolygon<f64>,
}

impl MunicipalityBoundary {
    /// Area-weighted centroid, or `None` for an empty geometry.
    pub fn centroid(&self) -> Option<LatLon> {
        self.geometry
            .centroid()
            .map(|point| LatLon(point.y(), point.x()))
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }
}

/// Smallest rectangle enclosing every boundary, e.g. to frame a map.
pub fn total_bounds(boundaries: &[MunicipalityBoundary]) -> Option<Rect<f64>> {
    boundaries
        .iter()
        .filter_map(MunicipalityBoundary::bounds)
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: FeatureProperties,
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    codarea: String,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: serde_json::Value,
}

type Ring = Vec<Vec<f64>>;

pub(crate) fn boundaries_url(base_url: &str, state: &str) -> String {
    format!(
        "{}/estados/{}?formato=application/vnd.geo+json&intrarregiao=Municipio&qualidade=intermediaria",
        base_url.trim_end_matches('/'),
        state
    )
}

fn to_line_string(ring: Ring) -> LineString<f64> {
    ring.into_iter()
        .filter(|position| position.len() >= 2)
        .map(|position| Coord {
            x: position[0],
            y: position[1],
        })
        .collect::<Vec<_>>()
        .into()
}

fn to_polygon(rings: Vec<Ring>) -> Option<Polygon<f64>> {
    let mut rings = rings.into_iter().map(to_line_string);
    let exterior = rings.next()?;
    Some(Polygon::new(exterior, rings.collect()))
}

fn to_multi_polygon(
    url: &str,
    area_code: &str,
    geometry: RawGeometry,
) -> Result<MultiPolygon<f64>, GeographyError> {
    let parse_error = |e| GeographyError::JsonParse(url.to_string(), e);
    let polygons: Vec<Polygon<f64>> = match geometry.kind.as_str() {
        "Polygon" => {
            let rings: Vec<Ring> =
                serde_json::from_value(geometry.coordinates).map_err(parse_error)?;
            to_polygon(rings).into_iter().collect()
        }
        "MultiPolygon" => {
            let parts: Vec<Vec<Ring>> =
                serde_json::from_value(geometry.coordinates).map_err(parse_error)?;
            parts.into_iter().filter_map(to_polygon).collect()
        }
        _ => return Err(GeographyError::UnsupportedGeometry(area_code.to_string())),
    };
    Ok(MultiPolygon::new(polygons))
}

pub(crate) fn parse_boundaries(
    url: &str,
    body: &str,
) -> Result<Vec<MunicipalityBoundary>, GeographyError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| GeographyError::JsonParse(url.to_string(), e))?;

    let mut boundaries = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let area_code = feature.properties.codarea;
        let Some(geometry) = feature.geometry else {
            debug!("Feature {} has no geometry, skipping", area_code);
            continue;
        };
        let geometry = to_multi_polygon(url, &area_code, geometry)?;
        boundaries.push(MunicipalityBoundary {
            area_code,
            geometry,
        });
    }
    Ok(boundaries)
}

/// Municipal outlines of `state` from the IBGE mesh API.
///
/// A non-200 answer is logged and gives an empty list.
pub async fn fetch_boundaries(
    client: &Client,
    base_url: &str,
    state: &str,
) -> Result<Vec<MunicipalityBoundary>, GeographyError> {
    let url = boundaries_url(base_url, state);
    let Some(body) = get_text_if_ok(client, &url).await? else {
        return Ok(Vec::new());
    };
    let boundaries = tokio::task::spawn_blocking(move || parse_boundaries(&url, &body)).await??;
    info!("Loaded {} municipal boundaries for {}", boundaries.len(), state);
    Ok(boundaries)
}
