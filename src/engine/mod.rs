//! The request-execution engine.
//!
//! An [`ApiEngine`] owns one observable [`ExecutionState`] and runs at most
//! one live attempt at a time. Every [`trigger`](ApiEngine::trigger) starts a
//! new attempt with a higher generation and cancels the previous one. Work
//! that finishes for an older generation is dropped on the floor: it never
//! touches the state and never reaches `after_send`.
//!
//! Known quirk: an attempt that is cancelled without a successor (for
//! example, the transport acknowledges an abort on its own) leaves the state
//! at [`Status::Loading`]. There is no "cancelled, back to idle" transition.

pub(crate) mod attempt;

use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::boundary::ErrorBoundary;
use crate::cancel::{CancelHandle, CancelSignal};
use crate::error::ApiError;
use crate::middleware::ApiContext;
use crate::request::{ErrorMode, RequestDescriptor};
use crate::transport::Transport;
use attempt::Settled;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// What the consumer renders from.
///
/// `data` is only ever present when `Succeeded`, `error` only when `Failed`
/// (and only for [`ErrorMode::Local`] requests).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionState<T> {
    status: Status,
    data: Option<T>,
    error: Option<ApiError>,
}

impl<T> Default for ExecutionState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> ExecutionState<T> {
    pub fn idle() -> Self {
        Self {
            status: Status::Idle,
            data: None,
            error: None,
        }
    }

    fn loading() -> Self {
        Self {
            status: Status::Loading,
            ..Self::idle()
        }
    }

    fn succeeded(data: T) -> Self {
        Self {
            status: Status::Succeeded,
            data: Some(data),
            error: None,
        }
    }

    fn failed(error: Option<ApiError>) -> Self {
        Self {
            status: Status::Failed,
            data: None,
            error,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }
}

/// Bookkeeping for the live attempt. Guarded by a lock that is never held across an await.
#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    current: Option<CancelHandle>,
    torn_down: bool,
    /// A propagate-mode failure nobody caught.
    fault: Option<ApiError>,
}

struct Inner<T> {
    transport: Arc<dyn Transport>,
    context: Arc<ApiContext>,
    boundary: Option<Arc<dyn ErrorBoundary>>,
    slot: Mutex<Slot>,
    state: watch::Sender<ExecutionState<T>>,
}

impl<T> Inner<T> {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, generation: u64) -> bool {
        let slot = self.slot();
        !slot.torn_down && slot.generation == generation
    }
}

impl<T> Inner<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn run_attempt(
        self: Arc<Self>,
        generation: u64,
        descriptor: RequestDescriptor,
        signal: CancelSignal,
    ) {
        let settled: Settled<T> =
            attempt::run(self.transport.as_ref(), &self.context, &descriptor, signal).await;

        if matches!(settled, Settled::Cancelled) {
            tracing::debug!(generation, "attempt cancelled, outcome absorbed");
            return;
        }
        if !self.is_current(generation) {
            tracing::debug!(generation, "discarding outcome of superseded attempt");
            return;
        }

        if let Some(outcome) = settled.observed() {
            self.context.run_after_send(outcome).await;
        }
        self.commit(generation, descriptor.error_mode(), settled);
    }

    fn commit(&self, generation: u64, mode: ErrorMode, settled: Settled<T>) {
        let escalated = {
            let mut slot = self.slot();
            if slot.torn_down || slot.generation != generation {
                tracing::debug!(generation, "superseded during after_send, not committing");
                return;
            }
            slot.current = None;

            match settled {
                Settled::Success { data, .. } => {
                    tracing::debug!(generation, "attempt succeeded");
                    self.state.send_replace(ExecutionState::succeeded(data));
                    None
                }
                Settled::Failure(err) => {
                    tracing::debug!(generation, error = %err, ?mode, "attempt failed");
                    match mode {
                        ErrorMode::Local => {
                            self.state.send_replace(ExecutionState::failed(Some(err)));
                            None
                        }
                        ErrorMode::Propagate => {
                            if self.boundary.is_none() {
                                slot.fault = Some(err.clone());
                            }
                            self.state.send_replace(ExecutionState::failed(None));
                            Some(err)
                        }
                    }
                }
                Settled::Cancelled => None,
            }
        };

        if let Some(err) = escalated {
            match &self.boundary {
                Some(boundary) => boundary.catch(&err),
                None => tracing::error!(error = %err, "uncaught request failure"),
            }
        }
    }
}

/// Drives requests for one consumer and publishes their [`ExecutionState`].
///
/// Attempts are spawned onto the ambient tokio runtime, so [`trigger`](Self::trigger)
/// must be called from within one. Dropping the engine tears it down.
pub struct ApiEngine<T> {
    inner: Arc<Inner<T>>,
}

impl<T> ApiEngine<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(transport: Arc<dyn Transport>, context: Arc<ApiContext>) -> Self {
        Self::build(transport, context, None)
    }

    /// An engine whose propagate-mode failures are caught by `boundary`.
    pub fn with_boundary(
        transport: Arc<dyn Transport>,
        context: Arc<ApiContext>,
        boundary: Arc<dyn ErrorBoundary>,
    ) -> Self {
        Self::build(transport, context, Some(boundary))
    }

    fn build(
        transport: Arc<dyn Transport>,
        context: Arc<ApiContext>,
        boundary: Option<Arc<dyn ErrorBoundary>>,
    ) -> Self {
        let (state, _) = watch::channel(ExecutionState::idle());
        Self {
            inner: Arc::new(Inner {
                transport,
                context,
                boundary,
                slot: Mutex::new(Slot::default()),
                state,
            }),
        }
    }

    /// Start a new attempt, superseding whatever is in flight. Returns at once.
    pub fn trigger(&self, descriptor: RequestDescriptor) {
        let (generation, signal) = {
            let mut slot = self.inner.slot();
            if slot.torn_down {
                tracing::warn!(url = descriptor.target(), "trigger after teardown ignored");
                return;
            }

            slot.generation += 1;
            let handle = CancelHandle::new();
            let signal = handle.token();
            if let Some(previous) = slot.current.replace(handle)
                && previous.signal()
            {
                tracing::debug!(generation = slot.generation - 1, "attempt superseded");
            }
            slot.fault = None;
            self.inner.state.send_replace(ExecutionState::loading());
            (slot.generation, signal)
        };

        tracing::debug!(
            generation,
            method = %descriptor.method(),
            url = descriptor.target(),
            "triggering request"
        );
        let inner = Arc::clone(&self.inner);
        tokio::spawn(inner.run_attempt(generation, descriptor, signal));
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> ExecutionState<T> {
        self.inner.state.borrow().clone()
    }

    /// The state, or the uncaught propagate-mode failure that replaced it.
    pub fn read(&self) -> Result<ExecutionState<T>, ApiError> {
        if let Some(fault) = &self.inner.slot().fault {
            return Err(fault.clone());
        }
        Ok(self.state())
    }

    pub fn subscribe(&self) -> watch::Receiver<ExecutionState<T>> {
        self.inner.state.subscribe()
    }
}

impl<T> ApiEngine<T> {
    /// Generation of the latest attempt; 0 before the first trigger.
    pub fn generation(&self) -> u64 {
        self.inner.slot().generation
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.slot().torn_down
    }

    /// Cancel the live attempt and refuse every later commit. Idempotent.
    pub fn teardown(&self) {
        let mut slot = self.inner.slot();
        if slot.torn_down {
            return;
        }
        slot.torn_down = true;
        if let Some(current) = slot.current.take() {
            current.signal();
            tracing::debug!(generation = slot.generation, "attempt cancelled on teardown");
        }
    }
}

impl<T> Drop for ApiEngine<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}
