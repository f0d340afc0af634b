//! The name search endpoint.

use futures::future::join_all;

use crate::client::ApiClient;
use crate::consts::SEARCH_PATH;
use crate::engine::ApiEngine;
use crate::error::ApiError;
use crate::request::RequestDescriptor;

/// An engine whose state holds search results.
pub type SearchEngine = ApiEngine<Vec<String>>;

/// `GET /api/search/{name}`.
pub fn search_by_name(name: &str) -> RequestDescriptor {
    RequestDescriptor::get(format!("{SEARCH_PATH}{name}"))
}

/// Awaitable search calls.
#[derive(Clone)]
pub struct SearchClient {
    client: ApiClient,
}

impl SearchClient {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn search_by_name(&self, name: &str) -> Result<Vec<String>, ApiError> {
        self.client.fetch(&search_by_name(name)).await
    }

    /// Run several searches concurrently. Results come back in input order.
    pub async fn search_many<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Vec<(String, Result<Vec<String>, ApiError>)> {
        let calls = names.iter().map(|name| async move {
            let name = name.as_ref();
            (name.to_string(), self.search_by_name(name).await)
        });
        join_all(calls).await
    }
}
