use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{map_transport_error, read_json, EmissionCalculator, Optimizer, UpstreamError};
use crate::models::emission::{EmissionEstimate, EmissionInput};
use crate::models::point::DeliveryPoint;
use crate::models::route::{EmissionStats, OptimizedSequence};

/// Client for the optimization/emissions service.
pub struct HttpOptimizer {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct OptimizeBody<'a> {
    locations: &'a [DeliveryPoint],
}

#[derive(Deserialize)]
struct OptimizeReply {
    #[serde(default)]
    optimized_route: Vec<DeliveryPoint>,
    #[serde(default)]
    logs: Vec<String>,
    #[serde(default)]
    stats: Option<EmissionStats>,
}

impl HttpOptimizer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: super::base_url(base_url),
        })
    }
}

#[async_trait]
impl Optimizer for HttpOptimizer {
    async fn optimize(&self, points: &[DeliveryPoint]) -> Result<OptimizedSequence, UpstreamError> {
        let response = self
            .client
            .post(format!("{}/optimize", self.base_url))
            .json(&OptimizeBody { locations: points })
            .send()
            .await
            .map_err(map_transport_error)?;

        let reply: OptimizeReply = read_json(response).await?;
        Ok(OptimizedSequence {
            stops: reply.optimized_route,
            logs: reply.logs,
            stats: reply.stats,
        })
    }
}

#[async_trait]
impl EmissionCalculator for HttpOptimizer {
    async fn calculate(&self, input: &EmissionInput) -> Result<EmissionEstimate, UpstreamError> {
        let response = self
            .client
            .post(format!("{}/calculate-manual", self.base_url))
            .json(input)
            .send()
            .await
            .map_err(map_transport_error)?;

        read_json(response).await
    }
}
