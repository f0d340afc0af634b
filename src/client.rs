//! Awaitable one-shot requests.
//!
//! Where [`ApiEngine`](crate::engine::ApiEngine) keeps state for a consumer
//! to observe, [`ApiClient`] simply hands the outcome back to the awaiting
//! caller: success as `Ok`, any failure as `Err`. Same middleware, same
//! classification, no supersession.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::cancel::CancelHandle;
use crate::engine::attempt::{self, Settled};
use crate::error::ApiError;
use crate::middleware::ApiContext;
use crate::request::RequestDescriptor;
use crate::transport::Transport;

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    context: Arc<ApiContext>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, context: Arc<ApiContext>) -> Self {
        Self { transport, context }
    }

    /// Run one request to completion. Dropping the future abandons the call.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<T, ApiError> {
        let handle = CancelHandle::new();
        let settled: Settled<T> = attempt::run(
            self.transport.as_ref(),
            &self.context,
            descriptor,
            handle.token(),
        )
        .await;

        if let Some(outcome) = settled.observed() {
            self.context.run_after_send(outcome).await;
        }

        match settled {
            Settled::Success { data, .. } => Ok(data),
            Settled::Failure(err) => Err(err),
            // Nobody here signals the handle, so this is the transport giving up on its own.
            Settled::Cancelled => Err(ApiError::transport("request was cancelled")),
        }
    }
}
