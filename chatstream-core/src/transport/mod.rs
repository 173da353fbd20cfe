use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use crate::chunk::ChatCompletionChunk;
use crate::error::Result;
use crate::message::Message;
use crate::tool::FunctionTool;

/// HTTP Transport implementation
pub mod http;

/// Mock Transport implementation for testing
pub mod mock;

/// Server-sent events decoding
pub mod sse;

pub use http::HttpTransport;
pub use mock::MockTransport;

/// Ordered stream of decoded chunks for one turn
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// Body of one streaming chat-completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// The model to use
    pub model: String,
    /// The full conversation log, in order
    pub messages: Vec<Message>,
    /// Always true; the client only speaks the streaming protocol
    pub stream: bool,
    /// Tools available to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<FunctionTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Anything that can open a chunk stream for a completion request
///
/// The conversation client owns no networking; it hands a fully built
/// request to a transport and consumes whatever stream comes back.
/// Errors returned here, and errors yielded by the stream, propagate to the
/// caller of the turn unchanged.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends `request` and returns the response as a stream of chunks
    async fn stream_completion(&self, request: &CompletionRequest) -> Result<ChunkStream>;
}
