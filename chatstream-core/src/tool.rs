#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "schema")]
use crate::error::{Error, Result};

/// Describes a tool the model may call
///
/// Tool definitions are supplied once when a conversation is built and are
/// only ever read to build the request payload. Executing the tool is the
/// caller's job.
///
/// The serialized form uses `inputSchema`, so definitions exported by tool
/// registries can be loaded directly:
///
/// ```
/// use chatstream_core::ToolDefinition;
///
/// let tool: ToolDefinition = serde_json::from_str(r#"{
///     "name": "get_weather",
///     "description": "Get current weather for a location",
///     "inputSchema": {"type": "object", "properties": {"city": {"type": "string"}}}
/// }"#).unwrap();
/// assert_eq!(tool.name, "get_weather");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Builds a definition whose input schema is derived from `T`
    ///
    /// # Examples
    ///
    /// ```
    /// use chatstream_core::ToolDefinition;
    /// use schemars::JsonSchema;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize, JsonSchema)]
    /// struct WeatherRequest {
    ///     location: String,
    ///     units: Option<String>,
    /// }
    ///
    /// let tool = ToolDefinition::from_input::<WeatherRequest>(
    ///     "get_weather",
    ///     "Get current weather for a location",
    /// ).unwrap();
    /// assert_eq!(tool.input_schema["type"], "object");
    /// ```
    #[cfg(feature = "schema")]
    pub fn from_input<T: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let schema = schemars::schema_for!(T);
        let input_schema = serde_json::to_value(schema.schema)
            .map_err(|e| Error::Other(format!("Schema generation failed for '{}': {}", name, e)))?;
        Ok(Self::new(name, description, input_schema))
    }
}

/// Function description in the chat-completions `tools` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool in the chat-completions wire format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTool {
    /// The type of the tool (currently always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

impl From<&ToolDefinition> for FunctionTool {
    fn from(value: &ToolDefinition) -> Self {
        FunctionTool {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: value.name.clone(),
                description: value.description.clone(),
                parameters: value.input_schema.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_tool_wire_shape() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
            "required": ["a", "b"]
        });
        let tool = ToolDefinition::new("add", "Add two numbers", schema.clone());

        let value = serde_json::to_value(FunctionTool::from(&tool)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "function",
                "function": {
                    "name": "add",
                    "description": "Add two numbers",
                    "parameters": schema
                }
            })
        );
    }

    #[test]
    fn test_definition_round_trips_input_schema_key() {
        let tool = ToolDefinition::new("noop", "", json!({"type": "object"}));
        let value = serde_json::to_value(&tool).unwrap();
        assert!(value.get("inputSchema").is_some());
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_from_input_schema() {
        #[derive(serde::Deserialize, JsonSchema)]
        #[allow(dead_code)]
        struct CalculatorRequest {
            expression: String,
        }

        let tool =
            ToolDefinition::from_input::<CalculatorRequest>("calculate", "Evaluate an expression")
                .unwrap();
        assert_eq!(tool.name, "calculate");
        assert_eq!(tool.input_schema["type"], "object");
        assert_eq!(tool.input_schema["properties"]["expression"]["type"], "string");
    }
}
