//! Stop-sequence optimization and emissions service.
//!
//! Runs as its own HTTP collaborator, separate from the pickup-request
//! store; the two never share state.

pub mod emissions;
pub mod sequencing;

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::emission::{EmissionEstimate, EmissionInput, TransportMode};
use crate::models::lenient;
use crate::models::point::DeliveryPoint;
use crate::models::route::EmissionStats;
use crate::observability::metrics::Metrics;

#[derive(Clone)]
pub struct OptimizerState {
    pub metrics: Metrics,
    pub default_weight_kg: f64,
}

pub fn router(state: OptimizerState) -> Router {
    Router::new()
        .route("/optimize", post(optimize))
        .route("/calculate-manual", post(calculate_manual))
        .route("/health", get(health))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OptimizeRequest {
    #[serde(default)]
    pub locations: Vec<DeliveryPoint>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub optimized_route: Vec<DeliveryPoint>,
    pub logs: Vec<String>,
    pub stats: EmissionStats,
}

/// Lenient manual-calculation payload: numbers may be strings, absent ones
/// count as zero and unknown modes as road freight.
#[derive(Debug, Serialize, Deserialize)]
pub struct ManualRequest {
    #[serde(default, deserialize_with = "lenient::number")]
    pub distance: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: f64,
    #[serde(default)]
    pub mode: Option<String>,
}

async fn optimize(
    State(state): State<OptimizerState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<Json<OptimizeResponse>, AppError> {
    let Json(payload) = payload.inspect_err(|rejection| {
        warn!(error = %rejection.body_text(), "undecodable optimize request");
    })?;
    let start = Instant::now();
    let result = sequence(&state, payload.locations);
    let outcome = if result.is_ok() { "success" } else { "error" };

    state
        .metrics
        .optimize_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .optimize_requests_total
        .with_label_values(&[outcome])
        .inc();

    match &result {
        Ok(response) => info!(
            stops = response.optimized_route.len(),
            distance_km = response.stats.total_distance_km,
            "route optimized"
        ),
        Err(err) => warn!(error = %err, "optimize request rejected"),
    }

    result.map(Json)
}

fn sequence(
    state: &OptimizerState,
    locations: Vec<DeliveryPoint>,
) -> Result<OptimizeResponse, AppError> {
    if locations.len() < 2 {
        return Err(AppError::InsufficientPoints(locations.len()));
    }

    let positioned = locations
        .into_iter()
        .map(|point| match point.position() {
            Some(position) => Ok((point, position)),
            None => Err(AppError::BadRequest(format!(
                "location {} has no valid coordinates",
                point.id
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let sequence = sequencing::nearest_neighbour(positioned);
    let stats = emissions::route_stats(sequence.total_km, state.default_weight_kg);

    Ok(OptimizeResponse {
        optimized_route: sequence.stops,
        logs: sequence.logs,
        stats,
    })
}

async fn calculate_manual(
    payload: Result<Json<ManualRequest>, JsonRejection>,
) -> Result<Json<EmissionEstimate>, AppError> {
    let Json(payload) = payload.inspect_err(|rejection| {
        warn!(error = %rejection.body_text(), "undecodable manual calculation request");
    })?;

    let input = EmissionInput {
        distance: payload.distance,
        weight: payload.weight,
        mode: payload
            .mode
            .as_deref()
            .map(TransportMode::parse_lenient)
            .unwrap_or_default(),
    };

    Ok(Json(emissions::manual_estimate(&input)))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
