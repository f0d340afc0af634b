//! Runtime configuration and the wiring it implies.
//!
//! [`ClientConfig`] is what the command line resolves to. It knows how to
//! build the transport (real HTTP or the in-process search backend) and the
//! middleware context.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::consts::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::middleware::{ApiContext, StaticHeaders};
use crate::request::ErrorMode;
use crate::transport::Transport;
use crate::transport::fixture::SearchBackend;
use crate::transport::http::HttpTransport;

/// Fault injection for the in-process backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MockSettings {
    pub delay: Duration,
    pub fail: bool,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// `Some` to answer from the in-process backend instead of HTTP.
    pub mock: Option<MockSettings>,
    pub error_mode: ErrorMode,
    /// `NAME:VALUE` pairs added to every request.
    pub headers: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            mock: None,
            error_mode: ErrorMode::Propagate,
            headers: Vec::new(),
        }
    }
}

/// The transport a config resolved to. The mock variant stays reachable so
/// its fault settings can change while the session runs.
#[derive(Clone)]
pub enum Backend {
    Http(Arc<HttpTransport>),
    Mock(Arc<SearchBackend>),
}

impl Backend {
    pub fn transport(&self) -> Arc<dyn Transport> {
        match self {
            Backend::Http(http) => Arc::clone(http) as Arc<dyn Transport>,
            Backend::Mock(mock) => Arc::clone(mock) as Arc<dyn Transport>,
        }
    }

    pub fn mock(&self) -> Option<&SearchBackend> {
        match self {
            Backend::Mock(mock) => Some(mock.as_ref()),
            Backend::Http(_) => None,
        }
    }

    /// Short label for the banner.
    pub fn label(&self) -> String {
        match self {
            Backend::Http(http) => http.base_url().to_string(),
            Backend::Mock(_) => "in-process mock".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn backend(&self) -> Result<Backend> {
        match self.mock {
            Some(settings) => Ok(Backend::Mock(Arc::new(SearchBackend::with_faults(
                settings.delay,
                settings.fail,
            )))),
            None => {
                let http = HttpTransport::with_timeout(&self.base_url, self.timeout)
                    .context("failed to set up HTTP transport")?;
                Ok(Backend::Http(Arc::new(http)))
            }
        }
    }

    /// Middleware built from the config: static headers as `before_send`.
    pub fn context(&self) -> Result<ApiContext> {
        let headers = StaticHeaders::parse(&self.headers)?;
        let context = ApiContext::new();
        if headers.is_empty() {
            return Ok(context);
        }
        Ok(context.with_before_send(Arc::new(headers)))
    }
}
