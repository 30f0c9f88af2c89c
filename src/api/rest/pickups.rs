use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::pickup::{NewPickupRequest, PickupEvent, PickupRequest, PickupStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/request-pickup", post(request_pickup))
        .route("/api/requests", get(list_requests))
        .route("/api/accept-request/:id", post(accept_request))
}

async fn request_pickup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewPickupRequest>, JsonRejection>,
) -> Result<Json<PickupRequest>, AppError> {
    let Json(payload) = payload.inspect_err(|rejection| {
        warn!(error = %rejection.body_text(), "undecodable pickup request");
        state
            .metrics
            .pickup_requests_total
            .with_label_values(&["rejected"])
            .inc();
    })?;

    let record = match state.store.create(payload).await {
        Ok(record) => record,
        Err(err) => {
            warn!(error = %err, "pickup request rejected");
            state
                .metrics
                .pickup_requests_total
                .with_label_values(&["rejected"])
                .inc();
            return Err(err);
        }
    };

    state
        .metrics
        .pickup_requests_total
        .with_label_values(&["created"])
        .inc();
    refresh_pending_gauge(&state).await?;

    info!(
        request_id = record.id,
        seller = %record.seller_name,
        weight_kg = record.weight,
        geocoded = record.lat.is_some() && record.lng.is_some(),
        "pickup request created"
    );
    let _ = state
        .pickup_events_tx
        .send(PickupEvent::Created(record.clone()));

    Ok(Json(record))
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PickupRequest>>, AppError> {
    Ok(Json(state.store.list().await?))
}

async fn accept_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PickupRequest>, AppError> {
    let record = state.store.accept(id).await?;

    state
        .metrics
        .pickup_requests_total
        .with_label_values(&["accepted"])
        .inc();
    refresh_pending_gauge(&state).await?;

    info!(request_id = id, "pickup request accepted");
    let _ = state
        .pickup_events_tx
        .send(PickupEvent::Accepted(record.clone()));

    Ok(Json(record))
}

async fn refresh_pending_gauge(state: &AppState) -> Result<(), AppError> {
    let pending = state
        .store
        .list()
        .await?
        .iter()
        .filter(|request| request.status == PickupStatus::Pending)
        .count();
    state.metrics.pending_requests.set(pending as i64);
    Ok(())
}
