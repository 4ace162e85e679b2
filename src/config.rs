//! Client configuration: credentials, environment selection and timeouts.
//!
//! Everything the HTTP client needs lives in one [`ClientConfig`], built via
//! [`ClientConfigBuilder`]. A config is created once per invocation and
//! handed to [`crate::client::CloudConvertClient::new`]; nothing is read
//! from ambient state after that.

use crate::error::CloudConvertError;
use std::fmt;

/// Live API base URL.
pub const API_BASE_URL: &str = "https://api.cloudconvert.com/v2";
/// Sandbox API base URL (no credits consumed).
pub const SANDBOX_API_BASE_URL: &str = "https://api.sandbox.cloudconvert.com/v2";
/// Live "sync" base URL: requests block until the job or task has finished.
pub const SYNC_BASE_URL: &str = "https://sync.api.cloudconvert.com/v2";
/// Sandbox "sync" base URL.
pub const SANDBOX_SYNC_BASE_URL: &str = "https://sync.api.sandbox.cloudconvert.com/v2";

/// Configuration for a [`crate::client::CloudConvertClient`].
///
/// # Example
/// ```rust
/// use cloudconvert_jobs::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .api_key("eyJ0eXAiOiJKV1Qi...")
///     .sandbox(true)
///     .timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_base_url(), "https://api.sandbox.cloudconvert.com/v2");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// CloudConvert API key, sent as `Authorization: Bearer <key>`.
    pub api_key: String,

    /// Use the sandbox environment. Default: false.
    pub sandbox: bool,

    /// Per-request timeout in seconds. Default: 120.
    ///
    /// Sync (wait-style) calls block server-side until the job finishes, so
    /// this also bounds how long `wait_job` can take.
    pub timeout_secs: u64,

    /// Override for the regular base URL. Used to point the client at a
    /// mock server.
    pub api_base_url: Option<String>,

    /// Override for the sync base URL.
    pub sync_base_url: Option<String>,

    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            sandbox: false,
            timeout_secs: 120,
            api_base_url: None,
            sync_base_url: None,
            user_agent: concat!("cloudconvert-jobs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("sandbox", &self.sandbox)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_base_url", &self.api_base_url)
            .field("sync_base_url", &self.sync_base_url)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Base URL for regular requests, honouring the sandbox flag.
    pub fn api_base_url(&self) -> &str {
        match (&self.api_base_url, self.sandbox) {
            (Some(url), _) => url,
            (None, true) => SANDBOX_API_BASE_URL,
            (None, false) => API_BASE_URL,
        }
    }

    /// Base URL for wait-style requests, honouring the sandbox flag.
    pub fn sync_base_url(&self) -> &str {
        match (&self.sync_base_url, self.sandbox) {
            (Some(url), _) => url,
            (None, true) => SANDBOX_SYNC_BASE_URL,
            (None, false) => SYNC_BASE_URL,
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn sync_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.sync_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Point both the regular and the sync base URL at the same host.
    pub fn base_url(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_base_url(url.clone()).sync_base_url(url)
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, CloudConvertError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(CloudConvertError::MissingApiKey);
        }
        if c.timeout_secs == 0 {
            return Err(CloudConvertError::InvalidConfig(
                "Timeout must be >= 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
