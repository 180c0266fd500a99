use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::backend::{BackendTransport, Envelope, Operation, RequestEnvelope, parse_envelope};
use crate::error::AppError;

/// reqwest transport posting every operation to the single backend endpoint.
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl BackendTransport for HttpTransport {
    async fn call(&self, operation: Operation, data: Value) -> Result<Envelope, AppError> {
        let request = RequestEnvelope {
            function: operation.as_str(),
            data,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(operation = operation.as_str(), http_status = %status, bytes = body.len(), "backend responded");

        match parse_envelope(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => {
                Err(AppError::Transport(format!("{} returned http {status}", operation.as_str())))
            }
            Err(err) => Err(err),
        }
    }
}
