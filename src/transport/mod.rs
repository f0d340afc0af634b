pub mod fixture;
pub mod http;
pub mod mock;

use async_trait::async_trait;

use crate::cancel::CancelSignal;
use crate::error::TransportError;
use crate::request::TransportRequest;

/// A completed exchange. Non-success statuses are still `Ok` at this layer;
/// the engine decides what they mean.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Decoded JSON body, `Null` when the body was empty.
    pub body: serde_json::Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: serde_json::Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `error` field of a failure body, or an empty string.
    pub fn error_message(&self) -> String {
        self.body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }
}

/// Performs one call per attempt. Implementations should stop work once
/// `signal` is cancelled and answer [`TransportError::Cancelled`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: TransportRequest,
        signal: CancelSignal,
    ) -> Result<TransportResponse, TransportError>;
}
