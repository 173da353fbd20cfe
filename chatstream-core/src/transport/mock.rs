use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::debug;

use super::{ChatTransport, ChunkStream, CompletionRequest};
use crate::chunk::ChatCompletionChunk;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Ending {
    /// The stream ends normally after the last chunk
    Complete,
    /// A transport error is yielded after the last chunk
    Fail(String),
    /// The stream never yields again after the last chunk
    Stall,
}

/// One scripted reply of a [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    chunks: Vec<ChatCompletionChunk>,
    ending: Ending,
    rejection: Option<(u16, String)>,
}

impl MockResponse {
    /// A reply that streams `chunks` and then ends
    pub fn new(chunks: Vec<ChatCompletionChunk>) -> Self {
        Self {
            chunks,
            ending: Ending::Complete,
            rejection: None,
        }
    }

    /// A text-only reply, one chunk per fragment
    pub fn text<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(fragments.into_iter().map(ChatCompletionChunk::text).collect())
    }

    /// A reply the provider refuses before any chunk is sent
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self {
            chunks: Vec::new(),
            ending: Ending::Complete,
            rejection: Some((status, body.into())),
        }
    }

    /// Yields a transport error after the scripted chunks
    #[must_use]
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.ending = Ending::Fail(message.into());
        self
    }

    /// Never completes after the scripted chunks
    #[must_use]
    pub fn then_stall(mut self) -> Self {
        self.ending = Ending::Stall;
        self
    }

    fn into_stream(self) -> ChunkStream {
        let chunks = stream::iter(self.chunks.into_iter().map(Ok::<_, Error>));
        match self.ending {
            Ending::Complete => Box::pin(chunks),
            Ending::Fail(message) => {
                Box::pin(chunks.chain(stream::iter(std::iter::once(Err(Error::Stream(message))))))
            }
            Ending::Stall => Box::pin(chunks.chain(stream::pending())),
        }
    }
}

/// Scripted transport for tests and offline runs
///
/// Each call to `stream_completion` pops the next queued [`MockResponse`]
/// and records the request it was given. Clones share the same queue and
/// request log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockTransport {
    /// Creates a new mock transport
    ///
    /// # Examples
    ///
    /// ```
    /// use chatstream_core::transport::mock::{MockResponse, MockTransport};
    ///
    /// let transport = MockTransport::new();
    /// transport.push_response(MockResponse::text(["Hel", "lo"]));
    /// assert!(transport.last_request().is_none());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for a later request
    pub fn push_response(&self, response: MockResponse) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
        self
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Gets the last request that was processed
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of replies still queued
    pub fn pending_responses(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn stream_completion(&self, request: &CompletionRequest) -> Result<ChunkStream> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let mut response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| Error::Other("MockTransport has no scripted response left".into()))?;

        debug!(
            "Mock replying with {} chunks ({:?})",
            response.chunks.len(),
            response.ending
        );

        if let Some((status, body)) = response.rejection.take() {
            return Err(match status {
                401 | 403 => Error::Authentication(body),
                429 => Error::RateLimit(body),
                status => Error::Api { status, body },
            });
        }

        Ok(response.into_stream())
    }
}
