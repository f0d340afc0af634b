//! The enclosing recovery layer for propagate-mode failures.

use std::sync::Mutex;

use crate::error::ApiError;

/// Catches errors that requests in [`ErrorMode::Propagate`](crate::request::ErrorMode)
/// hand upward instead of keeping.
pub trait ErrorBoundary: Send + Sync {
    fn catch(&self, error: &ApiError);
}

/// Text shown for a caught error.
pub fn describe(error: &ApiError) -> String {
    format!("Caught by error boundary: {error}")
}

/// Prints caught errors to stderr.
#[derive(Debug, Default)]
pub struct ConsoleBoundary;

impl ErrorBoundary for ConsoleBoundary {
    fn catch(&self, error: &ApiError) {
        eprintln!("\n{}", describe(error));
    }
}

/// Keeps every caught error, oldest first.
#[derive(Debug, Default)]
pub struct RecordingBoundary {
    caught: Mutex<Vec<ApiError>>,
}

impl RecordingBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn caught(&self) -> Vec<ApiError> {
        self.caught.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<ApiError> {
        self.caught
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl ErrorBoundary for RecordingBoundary {
    fn catch(&self, error: &ApiError) {
        self.caught
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(error.clone());
    }
}
