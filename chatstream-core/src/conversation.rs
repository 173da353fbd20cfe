use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, instrument, warn};

use crate::accumulator::{TurnAccumulator, TurnOutput};
use crate::config::GenerationOptions;
use crate::error::{Error, Result};
use crate::message::{Message, MessageRole};
use crate::sink::TextSink;
use crate::tool::{FunctionTool, ToolDefinition};
use crate::transport::{ChatTransport, CompletionRequest};

/// Where a conversation is in its turn cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No turn in flight; tool results may be appended
    Idle,
    /// A turn is consuming its response stream
    Streaming,
}

/// Builder for [`Conversation`]
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use chatstream_core::{Conversation, MockTransport};
///
/// let conversation = Conversation::builder("gpt-4o-mini")
///     .system_prompt("You are terse.")
///     .context("The user is on a phone.")
///     .build(Arc::new(MockTransport::new()));
///
/// assert_eq!(conversation.messages().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ConversationBuilder {
    model: String,
    system_prompt: Option<String>,
    tools: Vec<ToolDefinition>,
    context: Option<String>,
    options: GenerationOptions,
}

impl ConversationBuilder {
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    /// Initial context, sent as a user message right after the system prompt
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Creates the conversation; no request is made until the first turn
    pub fn build(self, transport: Arc<dyn ChatTransport>) -> Conversation {
        let mut messages = Vec::new();
        if let Some(prompt) = self.system_prompt.filter(|p| !p.is_empty()) {
            messages.push(Message::system(prompt));
        }
        if let Some(context) = self.context.filter(|c| !c.is_empty()) {
            messages.push(Message::user(context));
        }

        debug!(
            model = %self.model,
            tools = self.tools.len(),
            seeded = messages.len(),
            "Conversation created"
        );

        Conversation {
            model: self.model,
            tools: self.tools,
            options: self.options,
            messages,
            transport,
            state: TurnState::Idle,
        }
    }
}

/// A streaming chat conversation with tool-call support
///
/// Holds the ordered message log and issues one streaming request per turn.
/// Turns take `&mut self`, so the log always has exactly one writer.
pub struct Conversation {
    model: String,
    tools: Vec<ToolDefinition>,
    options: GenerationOptions,
    messages: Vec<Message>,
    transport: Arc<dyn ChatTransport>,
    state: TurnState,
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .field("messages", &self.messages.len())
            .field("state", &self.state)
            .finish()
    }
}

impl Conversation {
    pub fn builder(model: impl Into<String>) -> ConversationBuilder {
        ConversationBuilder {
            model: model.into(),
            system_prompt: None,
            tools: Vec::new(),
            context: None,
            options: GenerationOptions::default(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// The conversation log, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Runs one turn: optional user prompt in, streamed assistant reply out
    ///
    /// Text fragments are written to `sink` as they arrive. When the stream
    /// ends, one assistant message with the full text and the reassembled tool
    /// calls is appended to the log and returned.
    ///
    /// # Errors
    ///
    /// Transport failures, before or during the stream, are returned as is.
    /// In that case no assistant message is appended; the user message for
    /// this turn stays in the log. [`Error::EmptyTurn`] is returned without
    /// any request when there is no prompt and nothing awaiting a reply.
    #[instrument(skip(self, prompt, sink), fields(model = %self.model))]
    pub async fn send_turn(
        &mut self,
        prompt: Option<&str>,
        sink: &mut dyn TextSink,
    ) -> Result<TurnOutput> {
        if self.state == TurnState::Streaming {
            warn!("Previous turn was abandoned mid-stream; its reply was not recorded");
            self.state = TurnState::Idle;
        }

        match prompt.filter(|p| !p.is_empty()) {
            Some(prompt) => self.messages.push(Message::user(prompt)),
            None if self.awaiting_reply() => {
                debug!("No prompt; continuing from the pending message")
            }
            None => return Err(Error::EmptyTurn),
        }

        let request = self.completion_request();
        info!(
            "Starting turn with {} messages and {} tools",
            request.messages.len(),
            self.tools.len()
        );

        self.state = TurnState::Streaming;
        let result = self.stream_reply(&request, sink).await;
        self.state = TurnState::Idle;

        let output = result.map_err(|e| {
            error!("Turn failed: {}", e);
            e
        })?;

        self.messages.push(Message::assistant_with_tool_calls(
            output.content.clone(),
            output.tool_calls.clone(),
        ));
        info!(
            "Turn finished: {} chars, {} tool calls, finish reason {:?}",
            output.content.len(),
            output.tool_calls.len(),
            output.finish_reason
        );

        Ok(output)
    }

    /// Records the output of a tool the assistant asked for
    ///
    /// The id is not checked against earlier tool calls; a mismatch is
    /// reported by the provider on the next turn.
    pub fn append_tool_result(&mut self, tool_call_id: impl Into<String>, output: impl Into<String>) {
        let message = Message::tool(tool_call_id, output);
        debug!(
            "Appending tool result for {:?}",
            message.tool_call_id.as_deref().unwrap_or_default()
        );
        self.messages.push(message);
    }

    /// Builds the request for the current log
    pub fn completion_request(&self) -> CompletionRequest {
        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.iter().map(FunctionTool::from).collect())
        };

        CompletionRequest {
            model: self.model.clone(),
            messages: self.messages.clone(),
            stream: true,
            tools,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        }
    }

    fn awaiting_reply(&self) -> bool {
        self.messages
            .last()
            .is_some_and(|last| last.role != MessageRole::Assistant)
    }

    async fn stream_reply(
        &self,
        request: &CompletionRequest,
        sink: &mut dyn TextSink,
    ) -> Result<TurnOutput> {
        let mut stream = self.transport.stream_completion(request).await?;
        let mut accumulator = TurnAccumulator::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(text) = accumulator.apply(&chunk) {
                sink.write_fragment(&text);
            }
        }

        debug!("Stream ended after {} chunks", accumulator.chunks_seen());
        Ok(accumulator.finish())
    }
}
