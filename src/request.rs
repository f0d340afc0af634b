//! Request descriptors and the transport-level request built from them.

use std::fmt;

use anyhow::{Context, Result};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::consts::JSON_CONTENT_TYPE;

/// HTTP verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Where a failed request's error goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Hand the error to the enclosing [`ErrorBoundary`](crate::boundary::ErrorBoundary).
    #[default]
    Propagate,
    /// Keep the error in the execution state for the caller to inspect.
    Local,
}

/// An immutable description of one logical request.
///
/// Built with [`RequestDescriptor::get`] and friends, then refined with the
/// consuming `with_*` methods. Once handed to an engine it is never mutated;
/// every trigger takes a fresh descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    target: String,
    method: Method,
    payload: Option<serde_json::Value>,
    error_mode: ErrorMode,
}

impl RequestDescriptor {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method,
            payload: None,
            error_mode: ErrorMode::default(),
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::Post, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::Put, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::Delete, target)
    }

    /// Attach a JSON payload. Fails only if `payload` cannot be represented as JSON.
    pub fn with_payload<P: Serialize>(mut self, payload: &P) -> Result<Self> {
        let value = serde_json::to_value(payload).context("failed to serialize request payload")?;
        self.payload = Some(value);
        Ok(self)
    }

    pub fn with_json(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = error_mode;
        self
    }

    /// Shorthand for `with_error_mode(ErrorMode::Local)`.
    pub fn local_errors(self) -> Self {
        self.with_error_mode(ErrorMode::Local)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.error_mode
    }

    /// Build the outgoing transport request: JSON content type, serialized payload.
    pub fn to_transport_request(&self) -> Result<TransportRequest> {
        let body = self
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("failed to serialize request payload")?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        Ok(TransportRequest {
            target: self.target.clone(),
            method: self.method,
            headers,
            body,
        })
    }
}

/// What actually goes over the wire for one attempt.
///
/// Unlike [`RequestDescriptor`] this is mutable: `before_send` middleware
/// receives it by value and returns an augmented copy.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub target: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl TransportRequest {
    /// Append a header, keeping any existing values under the same name.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid header name: {name}"))?;
        let value =
            HeaderValue::from_str(value).with_context(|| format!("invalid header value: {value}"))?;
        self.headers.append(name, value);
        Ok(())
    }

    /// First value of a header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
