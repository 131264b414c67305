//! Process configuration for the rehaportal backend
//!
//! One [`Config`] is constructed at process start (usually via
//! [`Config::from_env`]) and passed explicitly to every component that talks
//! to the hosted backend. No module-level globals.

use std::env;
use std::time::Duration;

use crate::error::Error;

/// Environment variable holding the hosted backend base URL. Required.
pub const ENV_URL: &str = "SUPABASE_URL";

/// Environment variable holding the low-privilege (anon) API key. Required.
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";

/// Environment variable holding the high-privilege service-role key. Optional.
pub const ENV_SERVICE_KEY: &str = "SUPABASE_SERVICE_KEY";

/// Environment variable gating the demo-data seeder. Off unless set to `1`.
pub const ENV_SEED_DEMO_DATA: &str = "SEED_DEMO_DATA";

/// Configuration for backend access and workflow gating
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted backend project (no trailing slash)
    pub base_url: String,

    /// Low-privilege API key used for regular data access
    pub anon_key: String,

    /// High-privilege service-role key; privileged operations degrade to the
    /// anon key when absent
    pub service_key: Option<String>,

    /// Whether the demo-data seeder may insert placeholder contacts
    pub seed_demo_data: bool,

    /// Request timeout applied to the shared HTTP client
    pub request_timeout: Duration,
}

impl Config {
    /// Create a configuration with the two mandatory values and defaults for
    /// the rest.
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            service_key: None,
            seed_demo_data: false,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Read the configuration from the environment.
    ///
    /// A missing base URL or anon key is fatal. A missing service key only
    /// degrades privileged operations to the anon key; that degradation is
    /// logged once here.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = env::var(ENV_URL)
            .map_err(|_| Error::config(format!("{} is not set", ENV_URL)))?;
        let anon_key = env::var(ENV_ANON_KEY)
            .map_err(|_| Error::config(format!("{} is not set", ENV_ANON_KEY)))?;

        let service_key = env::var(ENV_SERVICE_KEY).ok().filter(|k| !k.is_empty());
        if service_key.is_none() {
            log::warn!(
                "{} is not set; privileged operations fall back to the anon key and may be rejected",
                ENV_SERVICE_KEY
            );
        }

        let seed_demo_data = env::var(ENV_SEED_DEMO_DATA)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let mut config = Self::new(&base_url, &anon_key);
        config.service_key = service_key;
        config.seed_demo_data = seed_demo_data;
        Ok(config)
    }

    /// Set the service-role key
    pub fn with_service_key(mut self, key: &str) -> Self {
        self.service_key = Some(key.to_string());
        self
    }

    /// Enable or disable demo-data seeding
    pub fn with_seed_demo_data(mut self, value: bool) -> Self {
        self.seed_demo_data = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// The key used for privileged operations: the service-role key when
    /// configured, the anon key otherwise.
    pub fn privileged_key(&self) -> &str {
        self.service_key.as_deref().unwrap_or(&self.anon_key)
    }
}
