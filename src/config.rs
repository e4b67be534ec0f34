use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime settings of the console, merged from the YAML file and the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL every API path is appended to (e.g. `http://localhost:8000/api`).
    pub api_url: String,
    /// Show the built-in demo dataset when a list cannot be fetched.
    pub use_fixture_data: bool,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_url: DEFAULT_API_URL.to_string(),
            use_fixture_data: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn trace_loaded(&self) {
        info!(
            api_url = %self.api_url,
            use_fixture_data = self.use_fixture_data,
            timeout_secs = self.timeout_secs,
            "Loaded Settings"
        );
        debug!(?self, "Settings loaded (full debug)");
    }
}
