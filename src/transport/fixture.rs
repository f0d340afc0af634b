//! An in-process stand-in for the search backend.
//!
//! Answers `GET /api/search/{name}` with the names containing `name`
//! (case-insensitive), at most [`MAX_SEARCH_RESULTS`] of them. Two fault
//! injection knobs mirror the mock settings of the web front end: an
//! artificial delay and a forced failure.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{Transport, TransportResponse};
use crate::cancel::CancelSignal;
use crate::consts::{FAULT_MESSAGE, FAULT_STATUS, MAX_SEARCH_RESULTS, SEARCH_PATH};
use crate::error::TransportError;
use crate::request::{Method, TransportRequest};

pub const NAMES: &[&str] = &[
    "Alice", "Alex", "Alexander", "Alexandra", "Alfred", "Alina", "Allison", "Alma", "Alonzo",
    "Alvin", "Amelia", "Anna", "Annabel", "Benjamin", "Bella", "Caroline", "Charlotte", "Daniel",
    "Dalia", "Eleanor", "Elias", "Emma", "Felix", "Gabriel", "Hannah", "Isabella", "Jonathan",
    "Julia", "Kalani", "Leonardo", "Lucas", "Malia", "Mary Ann", "Natalia", "Oliver", "Penelope",
    "Rosalind", "Sally", "Sebastian", "Talia", "Valentina", "Walter",
];

/// Fault-injecting search backend. Settings may change between calls.
#[derive(Debug, Default)]
pub struct SearchBackend {
    delay_ms: AtomicU64,
    fail: AtomicBool,
}

impl SearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(delay: Duration, fail: bool) -> Self {
        let backend = Self::new();
        backend.set_delay(delay);
        backend.set_fail(fail);
        backend
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.load(Ordering::SeqCst))
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn fails(&self) -> bool {
        self.fail.load(Ordering::SeqCst)
    }
}

/// Names containing `term`, ignoring case, capped at [`MAX_SEARCH_RESULTS`].
pub fn matching_names(term: &str) -> Vec<&'static str> {
    let term = term.to_lowercase();
    NAMES
        .iter()
        .copied()
        .filter(|name| name.to_lowercase().contains(&term))
        .take(MAX_SEARCH_RESULTS)
        .collect()
}

/// Pull the search term out of a target: `/api/search/al`, `http://host/api/search/al`.
fn search_term(target: &str) -> Option<String> {
    let path = match target.find("://") {
        Some(scheme_end) => {
            let rest = &target[scheme_end + 3..];
            rest.find('/').map_or("/", |i| &rest[i..])
        }
        None => target,
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();

    if path == SEARCH_PATH.trim_end_matches('/') {
        return Some(String::new());
    }
    let term = path.strip_prefix(SEARCH_PATH)?;
    Some(term.replace("%20", " "))
}

#[async_trait]
impl Transport for SearchBackend {
    async fn send(
        &self,
        request: TransportRequest,
        signal: CancelSignal,
    ) -> Result<TransportResponse, TransportError> {
        let term = match (request.method, search_term(&request.target)) {
            (Method::Get, Some(term)) => term,
            _ => return Ok(TransportResponse::new(404, json!({ "error": "Not found" }))),
        };

        if self.fails() {
            return Ok(TransportResponse::new(
                FAULT_STATUS,
                json!({ "error": FAULT_MESSAGE }),
            ));
        }

        let delay = self.delay();
        if !delay.is_zero() {
            tokio::select! {
                _ = signal.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if signal.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        Ok(TransportResponse::ok(json!(matching_names(&term))))
    }
}
