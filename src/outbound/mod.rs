//! Outbound collaborators: the optimizer, the road router, the geocoder,
//! the emissions calculator and the pickup-request store reached over HTTP.
//!
//! Workflows depend on the port traits only. The reqwest adapters own
//! transport details: request encoding, timeouts, HTTP status mapping and
//! JSON decoding.

mod nominatim;
mod optimizer_http;
mod osrm;
mod store_http;

pub use nominatim::NominatimGeocoder;
pub use optimizer_http::HttpOptimizer;
pub use osrm::OsrmRouter;
pub use store_http::HttpPickupStore;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::Config;
use crate::error::AppError;
use crate::models::emission::{EmissionEstimate, EmissionInput};
use crate::models::geocode::GeocodeCandidate;
use crate::models::point::{DeliveryPoint, GeoPoint};
use crate::models::route::{OptimizedSequence, RoadPath};
use crate::store::PickupStore;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed payload: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Optimizer: Send + Sync {
    /// Orders the points into a stop sequence.
    async fn optimize(&self, points: &[DeliveryPoint]) -> Result<OptimizedSequence, UpstreamError>;
}

#[async_trait]
pub trait RoadRouter: Send + Sync {
    /// Road-following geometry through every waypoint, in order.
    async fn route(&self, waypoints: &[GeoPoint]) -> Result<RoadPath, UpstreamError>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, UpstreamError>;
}

#[async_trait]
pub trait EmissionCalculator: Send + Sync {
    async fn calculate(&self, input: &EmissionInput) -> Result<EmissionEstimate, UpstreamError>;
}

/// Every collaborator a dashboard session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn PickupStore>,
    pub optimizer: Arc<dyn Optimizer>,
    pub calculator: Arc<dyn EmissionCalculator>,
    pub router: Arc<dyn RoadRouter>,
    pub geocoder: Arc<dyn Geocoder>,
}

impl Collaborators {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let build_failed = |err: reqwest::Error| {
            AppError::Internal(format!("failed to build http client: {err}"))
        };

        let optimizer = Arc::new(
            HttpOptimizer::new(&config.optimizer_url, config.http_timeout).map_err(build_failed)?,
        );

        Ok(Self {
            store: Arc::new(
                HttpPickupStore::new(&config.store_url, config.http_timeout)
                    .map_err(build_failed)?,
            ),
            optimizer: optimizer.clone(),
            calculator: optimizer,
            router: Arc::new(
                OsrmRouter::new(&config.router_url, config.http_timeout).map_err(build_failed)?,
            ),
            geocoder: Arc::new(
                NominatimGeocoder::new(
                    &config.geocoder_url,
                    config.http_timeout,
                    config.geocode_limit,
                )
                .map_err(build_failed)?,
            ),
        })
    }
}

/// Bounds a port call regardless of what the adapter does about timeouts.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| UpstreamError::Timeout(format!("no response within {limit:?}")))?
}

fn base_url(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}

fn map_transport_error(error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Timeout(error.to_string())
    } else {
        UpstreamError::Transport(error.to_string())
    }
}

/// Reads the body, rejecting non-success statuses before decoding.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    if !status.is_success() {
        return Err(map_status_error(status, body.as_ref()));
    }

    serde_json::from_slice(body.as_ref()).map_err(|err| UpstreamError::Decode(err.to_string()))
}

fn map_status_error(status: StatusCode, body: &[u8]) -> UpstreamError {
    UpstreamError::Status {
        status: status.as_u16(),
        message: error_message(body),
    }
}

/// Prefers the `{"error": "..."}` message our services return, falling back
/// to a whitespace-compacted preview of the raw body.
fn error_message(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body) {
        if let Some(serde_json::Value::String(message)) = map.get("error") {
            return message.clone();
        }
    }

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
