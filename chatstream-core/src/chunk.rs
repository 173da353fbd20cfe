//! Wire types for streamed chat-completion chunks.
//!
//! Every field the client does not consume is optional or ignored, so
//! OpenAI-compatible servers that omit `id`/`created`/`model` still decode.

use serde::{Deserialize, Serialize};

/// One `data:` payload of a streamed completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Present on the final chunk when the server reports usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The incremental part of a chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// A fragment of one tool call, keyed by its position in the turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl ChatCompletionChunk {
    /// A chunk carrying only a text delta
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_delta(Delta {
            content: Some(content.into()),
            tool_calls: None,
        })
    }

    /// A chunk carrying tool-call fragments only
    pub fn tool_calls(deltas: Vec<ToolCallDelta>) -> Self {
        Self::from_delta(Delta {
            content: None,
            tool_calls: Some(deltas),
        })
    }

    /// An empty-delta chunk that closes the choice with `reason`
    pub fn finish(reason: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                finish_reason: Some(reason.into()),
                ..ChunkChoice::default()
            }],
            usage: None,
        }
    }

    fn from_delta(delta: Delta) -> Self {
        Self {
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason: None,
            }],
            usage: None,
        }
    }

    /// The first choice, which is the only one the client consumes
    pub fn first_choice(&self) -> Option<&ChunkChoice> {
        self.choices.first()
    }
}

impl ToolCallDelta {
    /// A fragment for `index` with any subset of the three pieces
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self.tool_type = Some("function".to_string());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.function.get_or_insert_with(FunctionDelta::default).name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.function
            .get_or_insert_with(FunctionDelta::default)
            .arguments = Some(arguments.into());
        self
    }
}
