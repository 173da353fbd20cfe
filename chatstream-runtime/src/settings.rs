use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chatstream_core::error::{Error, Result};
use chatstream_core::{ClientConfig, ToolDefinition};
use tracing::{debug, info};

/// Model used when `CHATSTREAM_MODEL` is not set
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Everything the chat loop needs before the first prompt
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub client: ClientConfig,
    pub model: String,
    pub system_prompt: Option<String>,
    pub tools_path: Option<PathBuf>,
}

impl RuntimeSettings {
    /// Reads the client settings plus `CHATSTREAM_MODEL`, `CHATSTREAM_SYSTEM`
    /// and `CHATSTREAM_TOOLS` from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let client = ClientConfig::from_lookup(&lookup)?;
        let model = non_blank("CHATSTREAM_MODEL")
            .map(|m| m.trim().to_string())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let system_prompt = non_blank("CHATSTREAM_SYSTEM");
        let tools_path = non_blank("CHATSTREAM_TOOLS").map(|p| PathBuf::from(p.trim()));

        debug!("Model: {}", model);
        debug!("System prompt set: {}", system_prompt.is_some());

        Ok(Self {
            client,
            model,
            system_prompt,
            tools_path,
        })
    }

    /// Loads the configured tool definitions, or none when no file is set
    pub fn tools(&self) -> Result<Vec<ToolDefinition>> {
        match &self.tools_path {
            Some(path) => load_tools(path),
            None => Ok(Vec::new()),
        }
    }
}

/// Reads a JSON array of `{name, description, inputSchema}` objects
pub fn load_tools(path: &Path) -> Result<Vec<ToolDefinition>> {
    let text = fs::read_to_string(path).map_err(|e| {
        Error::MissingConfig(format!("cannot read tool file {}: {e}", path.display()))
    })?;
    let tools: Vec<ToolDefinition> = serde_json::from_str(&text)?;

    if let Some(blank) = tools.iter().position(|t| t.name.trim().is_empty()) {
        return Err(Error::Other(format!(
            "tool #{blank} in {} has an empty name",
            path.display()
        )));
    }

    info!("Loaded {} tool definitions from {}", tools.len(), path.display());
    Ok(tools)
}
