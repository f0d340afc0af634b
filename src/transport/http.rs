use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;

use super::{Transport, TransportResponse};
use crate::cancel::CancelSignal;
use crate::consts::DEFAULT_TIMEOUT;
use crate::error::TransportError;
use crate::request::TransportRequest;

/// A [`Transport`] over real HTTP.
pub struct HttpTransport {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid base url: {base_url}"))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute targets are used as-is, relative ones are joined onto the base.
    fn resolve(&self, target: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(target)
            .map_err(|e| TransportError::Failed(format!("invalid target {target}: {e}")))
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.resolve(&request.target)?;
        let mut builder = self
            .client
            .request(request.method.into(), url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| TransportError::Failed(format!("invalid JSON response: {e}")))?
        };

        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: TransportRequest,
        signal: CancelSignal,
    ) -> Result<TransportResponse, TransportError> {
        tokio::select! {
            biased;
            _ = signal.cancelled() => Err(TransportError::Cancelled),
            result = self.execute(request) => result,
        }
    }
}
