use std::io::{BufRead, Write};

use chatstream_core::ToolCall;
use chatstream_core::error::{Error, Result};
use tracing::debug;

/// Produces the output for a tool call the assistant requested
pub trait ToolResolver {
    fn resolve(&mut self, call: &ToolCall) -> Result<String>;
}

/// Asks a person at the terminal to play the tool
///
/// The call's name and raw arguments are printed and the next input line is
/// taken as the tool's output.
pub struct Operator<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Operator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prints `prompt` and reads one line with the trailing newline removed
    ///
    /// Returns `None` at end of input.
    pub fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}").map_err(io_error)?;
        self.output.flush().map_err(io_error)?;

        let mut line = String::new();
        if self.input.read_line(&mut line).map_err(io_error)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}").map_err(io_error)
    }
}

impl<R: BufRead, W: Write> ToolResolver for Operator<R, W> {
    fn resolve(&mut self, call: &ToolCall) -> Result<String> {
        debug!("Asking operator for tool call {}", call.id);
        self.say(&format!(
            "\n[tool call {}] {}({})",
            call.id, call.function.name, call.function.arguments
        ))?;
        self.read_line("tool output> ")?
            .ok_or_else(|| Error::Other(format!("input closed before {} was answered", call.id)))
    }
}

fn io_error(e: std::io::Error) -> Error {
    Error::Other(format!("terminal I/O failed: {e}"))
}
