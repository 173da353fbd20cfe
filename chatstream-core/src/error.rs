use thiserror::Error;

/// Represents errors that can occur in the chatstream library
#[derive(Error, Debug)]
pub enum Error {
    /// Error during serialization or deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error during HTTP request
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Couldn't parse base url")]
    BaseUrl(#[from] url::ParseError),

    /// Authentication error (HTTP 401/403)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Any other non-success response from the provider
    #[error("Provider returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response stream was malformed or broke off
    #[error("Stream error: {0}")]
    Stream(String),

    /// A turn was requested with no prompt and nothing awaiting a response
    #[error("Nothing to send: no prompt and no pending message in the conversation")]
    EmptyTurn,

    /// Tool-call arguments did not parse into the requested type
    #[error("Invalid tool arguments: {0}")]
    InvalidToolArguments(String),

    /// A required configuration value is absent
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// A Result type that uses our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::Api {
            status: 500,
            body: "upstream exploded".to_string(),
        };
        assert_eq!(err.to_string(), "Provider returned 500: upstream exploded");
    }

    #[test]
    fn test_serde_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
