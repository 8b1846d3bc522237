//! Defines the municipality records the rest of the crate is keyed on, the
//! coordinate type used to query point data, and the municipality filter used
//! by the analysis functions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographical coordinate, latitude first.
///
/// # Examples
///
/// ```
/// use municipal_climate::LatLon;
///
/// let sao_paulo = LatLon(-23.55, -46.63);
/// assert_eq!(sao_paulo.latitude(), -23.55);
/// assert_eq!(sao_paulo.longitude(), -46.63);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn latitude(&self) -> f64 {
        self.0
    }

    pub fn longitude(&self) -> f64 {
        self.1
    }
}

/// A municipality of a state, resolved by joining the IBGE directory with the
/// municipal boundaries.
///
/// Records are immutable once resolved. The `id` is the 7-digit IBGE code and is
/// unique within a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityRecord {
    /// IBGE municipality code (e.g. "3550308" for São Paulo).
    pub id: String,
    /// Display name as returned by the directory (e.g. "São Paulo").
    pub name: String,
    /// Upper-case state code (UF), e.g. "SP".
    pub state: String,
    /// Centroid of the municipal boundary polygon.
    pub centroid: LatLon,
}

impl MunicipalityRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        state: impl Into<String>,
        centroid: LatLon,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: state.into(),
            centroid,
        }
    }
}

/// Which municipalities an aggregate or summary covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MunicipalitySelection {
    /// Every municipality of the state; aggregates become state-wide means of
    /// per-municipality values.
    #[default]
    All,
    /// A single municipality, matched against either its IBGE code or its display name.
    Municipality(String),
}

impl MunicipalitySelection {
    pub fn municipality(key: impl Into<String>) -> Self {
        Self::Municipality(key.into())
    }

    /// Whether an observation tagged with `id` and `name` belongs to this selection.
    pub fn matches(&self, id: &str, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Municipality(key) => key == id || key == name,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl fmt::Display for MunicipalitySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Municipality(key) => write!(f, "{}", key),
        }
    }
}
