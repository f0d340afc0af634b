//! Project-wide constants.

use std::time::Duration;

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Content type sent with every request.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Default backend when `--base-url` is not given.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Route prefix of the search endpoint.
pub const SEARCH_PATH: &str = "/api/search/";

/// Maximum number of names the search backend returns.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// Status the mock backend answers with when fault injection is on.
pub const FAULT_STATUS: u16 = 501;

/// Body message the mock backend answers with when fault injection is on.
pub const FAULT_MESSAGE: &str = "Error has occured";

/// Default HTTP client timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
