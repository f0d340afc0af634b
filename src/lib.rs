//! A cancellable request-execution engine with pluggable middleware, plus
//! the small name-search client built on top of it.

pub mod banner;
pub mod boundary;
pub mod cancel;
pub mod client;
pub mod commands;
pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod request;
pub mod search;
pub mod spinner;
pub mod telemetry;
pub mod transport;

pub use boundary::ErrorBoundary;
pub use client::ApiClient;
pub use engine::{ApiEngine, ExecutionState, Status};
pub use error::{ApiError, TransportError};
pub use middleware::{AfterSend, AfterSendOutcome, ApiContext, BeforeSend};
pub use request::{ErrorMode, Method, RequestDescriptor, TransportRequest};
pub use transport::{Transport, TransportResponse};
