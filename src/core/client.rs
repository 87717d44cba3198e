//! Distance-matrix service client
//!
//! Issues exactly one request per sub-query and classifies the outcome. No
//! retries and no pacing happen here; the route engine owns both decisions.

use std::time::Duration;

use log::debug;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;

use crate::core::error::{Error, QueryFailure, Result};
use crate::core::location::Location;
use crate::core::partition::SubQuery;

pub const DISTANCE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Environment variable holding the service credential
pub const API_KEY_ENV_VAR: &str = "GOOGLE_API_KEY";

/// Configuration for the distance-matrix service
#[derive(Debug, Clone)]
pub struct MatrixServiceConfig {
    /// Endpoint of the distance-matrix JSON API
    pub base_url: String,

    /// Service credential, sent as the `key` query parameter
    pub api_key: String,

    /// Travel mode, fixed to driving by the route engine
    pub mode: String,

    /// Upper bound for a single call
    pub timeout: Duration,
}

impl MatrixServiceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DISTANCE_MATRIX_URL.to_string(),
            api_key: api_key.into(),
            mode: "driving".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Read the credential from `GOOGLE_API_KEY`.
    ///
    /// A missing or empty value is a configuration error.
    pub fn from_env() -> Result<Self> {
        match std::env::var(API_KEY_ENV_VAR) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(Error::Configuration(format!(
                "{API_KEY_ENV_VAR} environment variable not set"
            ))),
        }
    }
}

/// `{"value": ..}` wrapper used by the service for distance and duration
#[derive(Debug, Clone, Deserialize)]
pub struct MeasuredValue<T> {
    pub value: T,
}

/// One origin/destination cell as reported by the service
#[derive(Debug, Clone, Deserialize)]
pub struct RawElement {
    pub status: String,
    /// Meters
    pub distance: Option<MeasuredValue<f64>>,
    /// Seconds
    pub duration: Option<MeasuredValue<u64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub elements: Vec<RawElement>,
}

/// Successful response: one row per origin, one element per destination
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixResponse {
    #[serde(default)]
    pub rows: Vec<RawRow>,
}

impl MatrixResponse {
    pub fn element(&self, row: usize, column: usize) -> Option<&RawElement> {
        self.rows.get(row).and_then(|r| r.elements.get(column))
    }
}

#[derive(Deserialize)]
struct Envelope {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<RawRow>,
}

/// Pipe-delimited `"lat,lng|lat,lng|..."` list
pub fn format_coordinates(locations: &[Location]) -> String {
    locations
        .iter()
        .map(Location::lat_lng)
        .collect::<Vec<_>>()
        .join("|")
}

/// Client for the bulk distance-matrix service
pub struct DistanceMatrixClient {
    config: MatrixServiceConfig,
    client: Client,
}

impl DistanceMatrixClient {
    pub fn new(config: MatrixServiceConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("tripcost-fetch/{}", env!("TRIPCOST_VERSION")))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &MatrixServiceConfig {
        &self.config
    }

    /// Issue one request covering the sub-query's origin×destination block
    pub async fn query(&self, subquery: &SubQuery<'_>) -> std::result::Result<MatrixResponse, QueryFailure> {
        let origins = format_coordinates(subquery.origins);
        let destinations = format_coordinates(subquery.destinations);

        debug!(
            "Matrix request {}: {} origins, {} destinations, mode={}",
            subquery.index + 1,
            subquery.origins.len(),
            subquery.destinations.len(),
            self.config.mode
        );

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("origins", origins.as_str()),
                ("destinations", destinations.as_str()),
                ("mode", self.config.mode.as_str()),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = status.canonical_reason().unwrap_or_default().to_string();
            return Err(QueryFailure::Transport {
                status: Some(status.as_u16()),
                message,
            });
        }

        let envelope: Envelope = response.json().await?;
        if envelope.status != "OK" {
            return Err(QueryFailure::Service {
                status: envelope.status,
                message: envelope.error_message.filter(|m| !m.is_empty()),
            });
        }

        Ok(MatrixResponse { rows: envelope.rows })
    }
}
