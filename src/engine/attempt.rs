//! One pass through the pipeline: build, `before_send`, transport, classify.
//!
//! Shared by [`ApiEngine`](super::ApiEngine) and [`ApiClient`](crate::client::ApiClient);
//! neither `after_send` nor any state commit happens here.

use serde::de::DeserializeOwned;

use crate::cancel::CancelSignal;
use crate::error::{ApiError, TransportError};
use crate::middleware::{AfterSendOutcome, ApiContext};
use crate::request::RequestDescriptor;
use crate::transport::{Transport, TransportResponse};

/// How an attempt ended.
#[derive(Debug)]
pub(crate) enum Settled<T> {
    Success {
        response: TransportResponse,
        data: T,
    },
    Failure(ApiError),
    /// Abandoned. Never reported.
    Cancelled,
}

impl<T> Settled<T> {
    /// The view `after_send` gets. `None` for a cancelled attempt.
    pub(crate) fn observed(&self) -> Option<AfterSendOutcome<'_>> {
        match self {
            Settled::Success { response, .. } => Some(AfterSendOutcome::Response(response)),
            Settled::Failure(err) => Some(AfterSendOutcome::Error(err)),
            Settled::Cancelled => None,
        }
    }
}

pub(crate) async fn run<T: DeserializeOwned>(
    transport: &dyn Transport,
    context: &ApiContext,
    descriptor: &RequestDescriptor,
    signal: CancelSignal,
) -> Settled<T> {
    let request = match descriptor.to_transport_request() {
        Ok(request) => request,
        Err(e) => return Settled::Failure(e.into()),
    };

    let request = tokio::select! {
        biased;
        _ = signal.cancelled() => return Settled::Cancelled,
        result = context.run_before_send(request) => match result {
            Ok(request) => request,
            Err(e) => return Settled::Failure(e.into()),
        },
    };

    let result = tokio::select! {
        biased;
        _ = signal.cancelled() => Err(TransportError::Cancelled),
        result = transport.send(request, signal.clone()) => result,
    };

    classify(result)
}

/// Sort a transport result into success, service failure, transport failure or cancellation.
pub(crate) fn classify<T: DeserializeOwned>(
    result: Result<TransportResponse, TransportError>,
) -> Settled<T> {
    match result {
        Err(TransportError::Cancelled) => Settled::Cancelled,
        Err(TransportError::Failed(message)) => Settled::Failure(ApiError::transport(message)),
        Ok(response) if response.is_success() => {
            match serde_json::from_value::<T>(response.body.clone()) {
                Ok(data) => Settled::Success { response, data },
                Err(e) => Settled::Failure(ApiError::transport(format!(
                    "failed to decode response: {e}"
                ))),
            }
        }
        Ok(response) => {
            Settled::Failure(ApiError::service(response.status, response.error_message()))
        }
    }
}
