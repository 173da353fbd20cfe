// This is the main library file that re-exports the public API
// and defines the module structure.

pub mod accumulator;
pub mod chunk;
pub mod config;
pub mod conversation;
pub mod error;
pub mod message;
pub mod secret;
pub mod sink;
pub mod tool;
pub mod transport;

// Re-export the main types for convenient usage
pub use accumulator::{TurnAccumulator, TurnOutput};
pub use chunk::{ChatCompletionChunk, ToolCallDelta, Usage};
pub use config::{ClientConfig, GenerationOptions};
pub use conversation::{Conversation, ConversationBuilder, TurnState};
pub use error::{Error, Result};
pub use message::{FunctionCall, Message, MessageRole, ToolCall};
pub use secret::Secret;
pub use sink::{NullSink, StdoutSink, TextSink};
pub use tool::{FunctionTool, ToolDefinition};
pub use transport::{ChatTransport, CompletionRequest, HttpTransport, MockTransport};
