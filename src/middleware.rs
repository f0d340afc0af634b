//! Caller-supplied hooks around every transport call.
//!
//! An [`ApiContext`] is built once by whoever owns the engines and handed to
//! each of them at construction. Both hooks are optional; an empty context
//! is a no-op pipeline.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::ApiError;
use crate::request::TransportRequest;
use crate::transport::TransportResponse;

/// What `after_send` gets to see: the raw response or the error, never both.
#[derive(Debug, Clone, Copy)]
pub enum AfterSendOutcome<'a> {
    Response(&'a TransportResponse),
    Error(&'a ApiError),
}

/// Augments the outgoing request. A failure aborts the attempt as a transport failure.
#[async_trait]
pub trait BeforeSend: Send + Sync {
    async fn before_send(&self, request: TransportRequest) -> Result<TransportRequest>;
}

/// Observes the classified outcome of a committed attempt.
#[async_trait]
pub trait AfterSend: Send + Sync {
    async fn after_send(&self, outcome: AfterSendOutcome<'_>);
}

/// The middleware pipeline. Cheap to clone, shared by reference.
#[derive(Clone, Default)]
pub struct ApiContext {
    before_send: Option<Arc<dyn BeforeSend>>,
    after_send: Option<Arc<dyn AfterSend>>,
}

impl std::fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiContext")
            .field("before_send", &self.before_send.is_some())
            .field("after_send", &self.after_send.is_some())
            .finish()
    }
}

impl ApiContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_before_send(mut self, hook: Arc<dyn BeforeSend>) -> Self {
        self.before_send = Some(hook);
        self
    }

    pub fn with_after_send(mut self, hook: Arc<dyn AfterSend>) -> Self {
        self.after_send = Some(hook);
        self
    }

    /// Install an async closure as the `before_send` hook.
    pub fn before_send_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(TransportRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TransportRequest>> + Send + 'static,
    {
        self.with_before_send(Arc::new(BeforeSendFn(f)))
    }

    /// Install a plain closure as the `after_send` observer.
    pub fn after_send_fn<F>(self, f: F) -> Self
    where
        F: Fn(AfterSendOutcome<'_>) + Send + Sync + 'static,
    {
        self.with_after_send(Arc::new(AfterSendFn(f)))
    }

    pub fn has_before_send(&self) -> bool {
        self.before_send.is_some()
    }

    pub fn has_after_send(&self) -> bool {
        self.after_send.is_some()
    }

    /// Run `before_send`, or hand the request back untouched.
    pub async fn run_before_send(&self, request: TransportRequest) -> Result<TransportRequest> {
        match &self.before_send {
            Some(hook) => hook.before_send(request).await,
            None => Ok(request),
        }
    }

    pub async fn run_after_send(&self, outcome: AfterSendOutcome<'_>) {
        if let Some(hook) = &self.after_send {
            hook.after_send(outcome).await;
        }
    }
}

struct BeforeSendFn<F>(F);

#[async_trait]
impl<F, Fut> BeforeSend for BeforeSendFn<F>
where
    F: Fn(TransportRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TransportRequest>> + Send + 'static,
{
    async fn before_send(&self, request: TransportRequest) -> Result<TransportRequest> {
        (self.0)(request).await
    }
}

struct AfterSendFn<F>(F);

#[async_trait]
impl<F> AfterSend for AfterSendFn<F>
where
    F: Fn(AfterSendOutcome<'_>) + Send + Sync + 'static,
{
    async fn after_send(&self, outcome: AfterSendOutcome<'_>) {
        (self.0)(outcome)
    }
}

/// Adds a fixed set of headers to every request.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    headers: Vec<(String, String)>,
}

impl StaticHeaders {
    pub fn new(headers: Vec<(String, String)>) -> Self {
        Self { headers }
    }

    /// Parse `NAME:VALUE` pairs as given on the command line.
    pub fn parse(specs: &[String]) -> Result<Self> {
        let headers = specs
            .iter()
            .map(|spec| {
                let (name, value) = spec
                    .split_once(':')
                    .ok_or_else(|| anyhow::anyhow!("header must look like NAME:VALUE, got {spec}"))?;
                Ok((name.trim().to_string(), value.trim().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { headers })
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[async_trait]
impl BeforeSend for StaticHeaders {
    async fn before_send(&self, mut request: TransportRequest) -> Result<TransportRequest> {
        for (name, value) in &self.headers {
            request.append_header(name, value)?;
        }
        Ok(request)
    }
}
