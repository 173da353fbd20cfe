use async_trait::async_trait;
use reqwest::{Client, Request, header};
use tracing::{debug, error, info, instrument, trace};

use super::{ChatTransport, ChunkStream, CompletionRequest, sse};
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Streams chat completions from an OpenAI-compatible HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client for making requests
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a transport with a default `reqwest` client
    ///
    /// # Examples
    ///
    /// ```
    /// use chatstream_core::{ClientConfig, HttpTransport};
    ///
    /// let transport = HttpTransport::new(ClientConfig::new("sk-test"));
    /// ```
    pub fn new(config: ClientConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a transport around a caller-configured client (timeouts, proxies)
    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        debug!("API key set: {}", !config.api_key.expose().is_empty());
        debug!("Base URL: {}", config.base_url);
        Self { client, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds the POST request for `payload` without sending it
    pub fn build_request(&self, payload: &CompletionRequest) -> Result<Request> {
        let url = self.config.completions_url().map_err(|e| {
            error!("Failed to parse URL from base '{}': {}", self.config.base_url, e);
            e
        })?;

        let mut auth = header::HeaderValue::from_str(&format!(
            "Bearer {}",
            self.config.api_key.expose()
        ))
        .map_err(|_| Error::Authentication("Invalid API key format".into()))?;
        auth.set_sensitive(true);

        let mut builder = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, auth)
            .header(header::ACCEPT, "text/event-stream")
            .json(payload);

        if let Some(org) = &self.config.organization {
            builder = builder.header("OpenAI-Organization", org.as_str());
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn stream_completion(&self, request: &CompletionRequest) -> Result<ChunkStream> {
        let http_request = self.build_request(request)?;
        debug!("Sending HTTP request: {} {}", http_request.method(), http_request.url());
        trace!("Request headers: {:#?}", http_request.headers());

        let response = self.client.execute(http_request).await.map_err(|e| {
            error!("HTTP request failed: {}", e);
            Error::Request(e)
        })?;

        let status = response.status();
        info!("Received response with status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Provider rejected request ({}): {}", status, error_text);

            return match status.as_u16() {
                401 | 403 => Err(Error::Authentication(format!(
                    "API authentication failed: {}",
                    error_text
                ))),
                429 => Err(Error::RateLimit(format!(
                    "API rate limit exceeded: {}",
                    error_text
                ))),
                code => Err(Error::Api {
                    status: code,
                    body: error_text,
                }),
            };
        }

        Ok(sse::chunk_stream(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![Message::user("Hi")],
            stream: true,
            tools: None,
            temperature: None,
            max_tokens: None,
        }
    }

    #[test]
    fn test_build_request() {
        let transport = HttpTransport::new(
            ClientConfig::new("sk-test")
                .with_base_url("http://localhost:8080/v1/")
                .with_organization("org-1"),
        );

        let http_request = transport.build_request(&request()).unwrap();
        assert_eq!(http_request.method(), "POST");
        assert_eq!(
            http_request.url().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(
            http_request.headers().get("Authorization").unwrap(),
            "Bearer sk-test"
        );
        assert!(http_request.headers().get("Authorization").unwrap().is_sensitive());
        assert_eq!(
            http_request.headers().get("Content-Type").unwrap(),
            "application/json"
        );
        assert_eq!(http_request.headers().get("OpenAI-Organization").unwrap(), "org-1");

        let body: serde_json::Value =
            serde_json::from_slice(http_request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_build_request_rejects_bad_key() {
        let transport = HttpTransport::new(ClientConfig::new("sk-\nbroken"));
        assert!(matches!(
            transport.build_request(&request()),
            Err(Error::Authentication(_))
        ));
    }
}
