//! Client configuration.
//!
//! The client reads configuration from environment variables when built with
//! [`ClientConfig::from_env`]:
//!
//! - `CLICKUP_API_TOKEN` (required): personal or OAuth access token
//! - `CLICKUP_API_URL` (optional): base URL, defaults to [`DEFAULT_BASE_URL`]

use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.clickup.com/api/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const TOKEN_VAR: &str = "CLICKUP_API_TOKEN";
const URL_VAR: &str = "CLICKUP_API_URL";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    api_token: String,
    timeout: Duration,
    user_agent: String,
}

impl ClientConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: api_token.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("clickup-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        let token = std::env::var(TOKEN_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::Config(format!("{TOKEN_VAR} is not set")))?;
        let mut config = Self::new(token);
        if let Ok(url) = std::env::var(URL_VAR) {
            config = config.with_base_url(&url);
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
