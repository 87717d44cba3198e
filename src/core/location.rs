//! Location registry loading
//!
//! The registry is an ordered JSON array of location records. Field names may
//! use the Spanish aliases found in the estimator's data files.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::error::{Error, Result};

/// A named location with coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,

    #[serde(alias = "nombre")]
    pub name: String,

    #[serde(alias = "latitud", alias = "lat")]
    pub latitude: f64,

    #[serde(alias = "longitud", alias = "lng")]
    pub longitude: f64,
}

impl Location {
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// Coordinate in the `"lat,lng"` form expected by the matrix service
    pub fn lat_lng(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }

    /// Name shortened for warning lines
    pub fn short_name(&self) -> String {
        self.name.chars().take(20).collect()
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Integer(value) => value.to_string(),
    })
}

/// Parse a registry from JSON text, rejecting duplicate ids
pub fn parse_locations(json: &str) -> Result<Vec<Location>> {
    let locations: Vec<Location> = serde_json::from_str(json)?;
    validate_unique_ids(&locations)?;
    Ok(locations)
}

/// Load the registry from a JSON file
pub fn load_locations(path: impl AsRef<Path>) -> Result<Vec<Location>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_locations(&text)
}

fn validate_unique_ids(locations: &[Location]) -> Result<()> {
    let mut seen = HashSet::with_capacity(locations.len());
    for location in locations {
        if !seen.insert(location.id.as_str()) {
            return Err(Error::InvalidInput(format!(
                "duplicate location id '{}'",
                location.id
            )));
        }
    }
    Ok(())
}
