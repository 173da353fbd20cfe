use std::collections::BTreeMap;

use tracing::{trace, warn};

use crate::chunk::{ChatCompletionChunk, ToolCallDelta, Usage};
use crate::message::ToolCall;

/// One tool call being reassembled from stream fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallFragment {
    fn merge(&mut self, delta: &ToolCallDelta) {
        if let Some(id) = &delta.id {
            self.id.push_str(id);
        }
        if let Some(function) = &delta.function {
            if let Some(name) = &function.name {
                self.name.push_str(name);
            }
            if let Some(arguments) = &function.arguments {
                self.arguments.push_str(arguments);
            }
        }
    }

    fn into_tool_call(self) -> ToolCall {
        ToolCall::function(self.id, self.name, self.arguments)
    }
}

/// Result of one finished turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutput {
    /// All text deltas, concatenated in arrival order
    pub content: String,
    /// One entry per tool-call index, ordered by index
    pub tool_calls: Vec<ToolCall>,
    /// Last finish reason the server reported, if any
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl TurnOutput {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Reassembles one streamed turn
///
/// Text deltas are appended to a single buffer. Tool-call deltas are merged
/// per stream-declared index; fragments for different indices may arrive
/// interleaved and in any order, and each index only ever grows by
/// concatenation. Finalization walks indices in ascending order.
///
/// # Examples
///
/// ```
/// use chatstream_core::accumulator::TurnAccumulator;
/// use chatstream_core::chunk::{ChatCompletionChunk, ToolCallDelta};
///
/// let mut acc = TurnAccumulator::new();
/// acc.apply(&ChatCompletionChunk::tool_calls(vec![
///     ToolCallDelta::new(0).with_id("call_1").with_name("add").with_arguments("{\"a\":"),
/// ]));
/// acc.apply(&ChatCompletionChunk::tool_calls(vec![
///     ToolCallDelta::new(0).with_arguments("1}"),
/// ]));
///
/// let output = acc.finish();
/// assert_eq!(output.tool_calls[0].function.arguments, "{\"a\":1}");
/// ```
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    content: String,
    tool_calls: BTreeMap<u32, ToolCallFragment>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
    chunks_seen: usize,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one chunk into the turn and returns its text delta, if any
    pub fn apply(&mut self, chunk: &ChatCompletionChunk) -> Option<String> {
        self.chunks_seen += 1;

        if let Some(usage) = chunk.usage {
            self.usage = Some(usage);
        }

        let choice = chunk.first_choice()?;

        if let Some(reason) = &choice.finish_reason {
            self.finish_reason = Some(reason.clone());
        }

        if let Some(deltas) = &choice.delta.tool_calls {
            for delta in deltas {
                trace!(
                    index = delta.index,
                    has_id = delta.id.is_some(),
                    "Merging tool-call fragment"
                );
                self.tool_calls.entry(delta.index).or_default().merge(delta);
            }
        }

        match &choice.delta.content {
            Some(text) if !text.is_empty() => {
                self.content.push_str(text);
                Some(text.clone())
            }
            _ => None,
        }
    }

    /// Text accumulated so far
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Fragment currently held for `index`
    pub fn fragment(&self, index: u32) -> Option<&ToolCallFragment> {
        self.tool_calls.get(&index)
    }

    pub fn chunks_seen(&self) -> usize {
        self.chunks_seen
    }

    /// Converts the fragments into finalized tool calls
    pub fn finish(self) -> TurnOutput {
        let expected = self.tool_calls.len();
        if let Some((&last, _)) = self.tool_calls.last_key_value() {
            if last as usize + 1 != expected {
                warn!(
                    "Tool-call indices are not dense: {} calls, highest index {}",
                    expected, last
                );
            }
        }

        let tool_calls = self
            .tool_calls
            .into_values()
            .map(ToolCallFragment::into_tool_call)
            .collect();

        TurnOutput {
            content: self.content,
            tool_calls,
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }
}
