use std::env;

use tracing::debug;

use crate::error::{Error, Result};
use crate::secret::Secret;

/// Default endpoint root for OpenAI-compatible chat completions
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for an OpenAI-compatible endpoint
///
/// The client never reads the process environment on its own; build a
/// `ClientConfig` (by hand or with [`ClientConfig::from_env`]) and hand it to
/// the transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key for authentication
    pub api_key: Secret<String>,
    /// Base URL for the API, without the `/chat/completions` suffix
    pub base_url: String,
    /// Organization ID (optional)
    pub organization: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            organization: None,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the default endpoint with the given key
    pub fn new(api_key: impl Into<Secret<String>>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Sets the base URL and returns self for method chaining
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url.into());
        self
    }

    /// Sets the organization and returns self for method chaining
    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Reads `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_ORGANIZATION`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] when `OPENAI_API_KEY` is unset or blank.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] but with an injectable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = non_blank("OPENAI_API_KEY")
            .ok_or_else(|| Error::MissingConfig("OPENAI_API_KEY".to_string()))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = non_blank("OPENAI_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        config.organization = non_blank("OPENAI_ORGANIZATION");

        debug!("Base URL: {}", config.base_url);
        debug!("Organization set: {}", config.organization.is_some());
        Ok(config)
    }

    /// Full URL of the chat-completions endpoint
    pub fn completions_url(&self) -> Result<url::Url> {
        Ok(url::Url::parse(&format!("{}/chat/completions", self.base_url))?)
    }
}

fn normalize_base_url(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Optional sampling knobs forwarded verbatim with every request
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_requires_api_key() {
        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, Error::MissingConfig(key) if key == "OPENAI_API_KEY"));

        let err = ClientConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, Error::MissingConfig(_)));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-1")])).unwrap();
        assert_eq!(config.api_key.expose(), "sk-1");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.organization.is_none());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("OPENAI_BASE_URL", "http://localhost:11434/v1/"),
            ("OPENAI_ORGANIZATION", "org-7"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.organization.as_deref(), Some("org-7"));
        assert_eq!(
            config.completions_url().unwrap().as_str(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_bad_base_url() {
        let config = ClientConfig::new("sk-1").with_base_url("not a url");
        assert!(matches!(config.completions_url(), Err(Error::BaseUrl(_))));
    }

    #[test]
    fn test_generation_options_builder() {
        let options = GenerationOptions::default()
            .with_temperature(0.2)
            .with_max_tokens(256);
        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.max_tokens, Some(256));
    }
}
