use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};

use super::{Transport, TransportResponse};
use crate::cancel::CancelSignal;
use crate::error::TransportError;
use crate::request::TransportRequest;

type Reply = Result<TransportResponse, TransportError>;

/// A transport for tests. Every call parks until the test settles it through
/// the matching [`PendingCall`] taken from [`MockCalls`].
pub struct MockTransport {
    calls: mpsc::UnboundedSender<PendingCall>,
    count: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> (Self, MockCalls) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            calls: tx,
            count: AtomicUsize::new(0),
        };
        (transport, MockCalls { rx })
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// The test side: yields calls in the order they were made.
pub struct MockCalls {
    rx: mpsc::UnboundedReceiver<PendingCall>,
}

impl MockCalls {
    /// Wait for the next call. `None` once the transport is gone.
    pub async fn next(&mut self) -> Option<PendingCall> {
        self.rx.recv().await
    }

    /// A call that has already been made, without waiting.
    pub fn try_next(&mut self) -> Option<PendingCall> {
        self.rx.try_recv().ok()
    }
}

/// One in-flight call. Settling returns `false` if the caller already gave up.
pub struct PendingCall {
    pub request: TransportRequest,
    pub signal: CancelSignal,
    reply: oneshot::Sender<Reply>,
}

impl PendingCall {
    pub fn settle(self, reply: Reply) -> bool {
        self.reply.send(reply).is_ok()
    }

    pub fn respond(self, status: u16, body: serde_json::Value) -> bool {
        self.settle(Ok(TransportResponse::new(status, body)))
    }

    pub fn ok(self, body: serde_json::Value) -> bool {
        self.respond(200, body)
    }

    /// Fail as if the network dropped.
    pub fn fail(self, message: &str) -> bool {
        self.settle(Err(TransportError::Failed(message.to_string())))
    }

    /// Settle with an abort acknowledgment, regardless of the signal.
    pub fn abort(self) -> bool {
        self.settle(Err(TransportError::Cancelled))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest, signal: CancelSignal) -> Reply {
        self.count.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        let call = PendingCall {
            request,
            signal: signal.clone(),
            reply: tx,
        };
        if self.calls.send(call).is_err() {
            return Err(TransportError::Failed("mock transport closed".to_string()));
        }

        tokio::select! {
            _ = signal.cancelled() => Err(TransportError::Cancelled),
            reply = rx => reply.unwrap_or_else(|_| Err(TransportError::Failed("mock call dropped".to_string()))),
        }
    }
}
