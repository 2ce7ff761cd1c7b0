use crate::{env_or_default, ConfigError, FromEnv};

/// Configuration for the pricing backend HTTP API
#[derive(Clone, Debug)]
pub struct PricingApiConfig {
    /// Base URL of the pricing service, without a trailing slash
    pub base_url: String,
}

impl PricingApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl FromEnv for PricingApiConfig {
    /// Reads from environment variables with sensible defaults:
    /// - PRICING_API_URL: defaults to http://localhost:8080
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_or_default("PRICING_API_URL", "http://localhost:8080");
        Ok(Self::new(base_url))
    }
}

impl Default for PricingApiConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
