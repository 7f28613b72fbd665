//! HTTP adapter for the remote `optimize_route` endpoint.

use tracing::debug;

use crate::error::OptimizerError;
use crate::model::{OptimizeRequest, OptimizeResponse, RawBatch};
use crate::traits::RouteOptimizer;

pub const OPTIMIZE_ROUTE_PATH: &str = "optimize_route";

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizerClient {
    config: OptimizerConfig,
    client: reqwest::blocking::Client,
}

impl OptimizerClient {
    pub fn new(config: OptimizerConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Full endpoint URL; tolerates a base URL with or without a trailing `/`.
    pub fn endpoint(&self) -> String {
        endpoint_url(&self.config.base_url)
    }
}

fn endpoint_url(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), OPTIMIZE_ROUTE_PATH)
}

impl RouteOptimizer for OptimizerClient {
    fn optimize(&self, request: &OptimizeRequest) -> Result<RawBatch, OptimizerError> {
        let url = self.endpoint();
        debug!(
            url = %url,
            houses = request.houses.len(),
            end = request.end_location.is_some(),
            "posting optimize_route"
        );

        let response = self.client.post(url).json(request).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OptimizerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text()?;
        let parsed: OptimizeResponse = serde_json::from_str(&body)
            .map_err(|err| OptimizerError::Malformed(err.to_string()))?;

        parsed
            .into_first()
            .ok_or_else(|| OptimizerError::Malformed("response contained no batches".to_string()))
    }
}
