//! Server-sent events decoding for streamed completions.
//!
//! The HTTP body arrives as arbitrary byte slices. [`SseDecoder`] buffers
//! them into lines, groups `data:` lines into events, and stops at the
//! `[DONE]` sentinel. [`chunk_stream`] drives a decoder over a byte stream
//! and yields decoded [`ChatCompletionChunk`]s.

use std::collections::VecDeque;

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, error, trace};

use super::ChunkStream;
use crate::chunk::ChatCompletionChunk;
use crate::error::{Error, Result};

const DONE_SENTINEL: &str = "[DONE]";

/// Incremental `text/event-stream` decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the current, not yet terminated line
    line: Vec<u8>,
    /// `data:` lines of the event being assembled
    data: Option<String>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds raw body bytes and returns the data payloads completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        for &byte in bytes {
            if self.done {
                break;
            }
            if byte == b'\n' {
                let line = std::mem::take(&mut self.line);
                self.process_line(&line, &mut events);
            } else {
                self.line.push(byte);
            }
        }
        events
    }

    /// Flushes whatever is buffered once the body has ended
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.done && !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.process_line(&line, &mut events);
        }
        if !self.done {
            self.dispatch(&mut events);
        }
        events
    }

    fn process_line(&mut self, raw: &[u8], events: &mut Vec<String>) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);

        if line.is_empty() {
            self.dispatch(events);
            return;
        }

        if let Some(data) = line.strip_prefix("data:") {
            let data = data.strip_prefix(' ').unwrap_or(data);
            match &mut self.data {
                Some(buffer) => {
                    buffer.push('\n');
                    buffer.push_str(data);
                }
                None => self.data = Some(data.to_string()),
            }
        } else {
            // event:, id:, retry: and `:` comments carry nothing we use
            trace!("Ignoring SSE line: {}", line);
        }
    }

    fn dispatch(&mut self, events: &mut Vec<String>) {
        let Some(data) = self.data.take() else {
            return;
        };
        if data.trim() == DONE_SENTINEL {
            debug!("Received end-of-stream sentinel");
            self.done = true;
            return;
        }
        if !data.trim().is_empty() {
            events.push(data);
        }
    }
}

/// Decodes one SSE data payload into a chunk
///
/// Providers report some failures in-band as `{"error": {...}}` after the
/// response headers have already been sent; those become [`Error::Api`].
pub fn decode_chunk(payload: &str) -> Result<ChatCompletionChunk> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| Error::Stream(format!("failed to parse SSE chunk: {e} (data: {payload})")))?;

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        let status = error
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or(500);
        return Err(Error::Api {
            status,
            body: message,
        });
    }

    Ok(serde_json::from_value(value)?)
}

struct StreamState<S> {
    bytes: std::pin::Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    exhausted: bool,
}

/// Turns a response byte stream into a stream of decoded chunks
///
/// The stream ends after `[DONE]`, at end of body, or right after the first
/// error it yields. Read errors from the body are passed through as they are,
/// so a `reqwest` failure arrives as [`Error::Request`].
pub fn chunk_stream<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    let state = StreamState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                trace!("SSE data: {}", payload);
                let item = decode_chunk(&payload);
                if item.is_err() {
                    state.pending.clear();
                    state.exhausted = true;
                }
                return Some((item, state));
            }

            if state.exhausted || state.decoder.is_done() {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.push(bytes.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.exhausted = true;
                    let e = e.into();
                    error!("Response body read failed: {}", e);
                    return Some((Err(e), state));
                }
                None => {
                    state.exhausted = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    }))
}
