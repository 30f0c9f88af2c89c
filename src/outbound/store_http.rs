use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use super::{map_transport_error, read_json, UpstreamError};
use crate::error::AppError;
use crate::models::pickup::{NewPickupRequest, PickupRequest, REQUIRED_FIELDS};
use crate::store::PickupStore;

/// The pickup-request store as seen from a dashboard over HTTP.
pub struct HttpPickupStore {
    client: Client,
    base_url: String,
}

impl HttpPickupStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: super::base_url(base_url),
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Result<Response, reqwest::Error>) -> Result<T, AppError> {
    let response = response.map_err(|err| into_app_error(map_transport_error(err)))?;
    read_json(response).await.map_err(into_app_error)
}

fn into_app_error(error: UpstreamError) -> AppError {
    match error {
        UpstreamError::Status {
            status: 400,
            message,
        } => missing_fields(&message)
            .map(AppError::Validation)
            .unwrap_or(AppError::BadRequest(message)),
        UpstreamError::Status {
            status: 404,
            message,
        } => AppError::NotFound(message),
        other => AppError::Upstream(format!("pickup store: {other}")),
    }
}

/// Recovers the field list from the store's "missing required fields: a, b"
/// message so a remote store fails the same way as a local one.
fn missing_fields(message: &str) -> Option<Vec<&'static str>> {
    let list = message.strip_prefix("missing required fields: ")?;
    list.split(", ")
        .map(|name| REQUIRED_FIELDS.iter().copied().find(|field| *field == name.trim()))
        .collect()
}

#[async_trait]
impl PickupStore for HttpPickupStore {
    async fn create(&self, request: NewPickupRequest) -> Result<PickupRequest, AppError> {
        decode(
            self.client
                .post(format!("{}/api/request-pickup", self.base_url))
                .json(&request)
                .send()
                .await,
        )
        .await
    }

    async fn list(&self) -> Result<Vec<PickupRequest>, AppError> {
        decode(
            self.client
                .get(format!("{}/api/requests", self.base_url))
                .send()
                .await,
        )
        .await
    }

    async fn accept(&self, id: i64) -> Result<PickupRequest, AppError> {
        decode(
            self.client
                .post(format!("{}/api/accept-request/{id}", self.base_url))
                .send()
                .await,
        )
        .await
    }
}
