//! Chatstream Runtime
//!
//! Terminal front end for `chatstream-core`: environment-driven settings,
//! tool definitions loaded from a JSON file, and a loop that lets the person
//! at the keyboard answer the tool calls the assistant makes.

pub mod operator;
pub mod session;
pub mod settings;

pub use operator::{Operator, ToolResolver};
pub use session::{Command, Exchange, MAX_TOOL_ROUNDS, run_exchange};
pub use settings::{DEFAULT_MODEL, RuntimeSettings, load_tools};

// Re-export core types for convenience
pub use chatstream_core;
