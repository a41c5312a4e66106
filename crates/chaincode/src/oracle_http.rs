use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::oracle::{parse_predictions, parse_validity, EndpointTable, OraclePayload, ScoringOracle};
use crate::{ChaincodeError, Dataset, ModelFile, RequestContext, Result};

/// Oracle client speaking JSON over HTTP POST.
pub struct HttpOracle {
    client: reqwest::Client,
    endpoints: EndpointTable,
    timeout: Option<Duration>,
}

impl HttpOracle {
    pub fn new(endpoints: EndpointTable) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
            timeout: None,
        }
    }

    /// Per-call HTTP timeout, on top of whatever the request context allows.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn post<B: Serialize + Sync>(&self, ctx: &RequestContext, url: &str, body: &B) -> Result<Vec<u8>> {
        let call = async {
            let mut req = self.client.post(url).json(body);
            if let Some(t) = self.timeout {
                req = req.timeout(t);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| ChaincodeError::UpstreamUnavailable(format!("{url}: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                warn!(request_id = %ctx.request_id, %url, %status, "oracle rejected request");
                return Err(ChaincodeError::UpstreamUnavailable(format!("{url}: HTTP {status}")));
            }

            let body = resp
                .bytes()
                .await
                .map_err(|e| ChaincodeError::UpstreamUnavailable(format!("{url}: {e}")))?;
            debug!(request_id = %ctx.request_id, %url, bytes = body.len(), "oracle responded");
            Ok(body.to_vec())
        };

        ctx.run(call).await
    }
}

#[async_trait]
impl ScoringOracle for HttpOracle {
    async fn validate(&self, ctx: &RequestContext, model: &ModelFile, dataset: &Dataset) -> Result<Vec<f64>> {
        let endpoint = self.endpoints.for_model(model)?;
        let body = self
            .post(ctx, &endpoint.validate_url, &OraclePayload { model, data: dataset })
            .await?;
        parse_predictions(endpoint.format, &body)
    }

    async fn test_model(&self, ctx: &RequestContext, model: &ModelFile) -> Result<bool> {
        let endpoint = self.endpoints.for_model(model)?;
        let empty = Dataset::default();
        let body = self
            .post(ctx, &endpoint.test_url, &OraclePayload { model, data: &empty })
            .await?;
        parse_validity(endpoint.format, &body)
    }
}
