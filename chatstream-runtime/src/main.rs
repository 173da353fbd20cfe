use std::io;
use std::sync::Arc;

use chatstream_core::{Conversation, HttpTransport, StdoutSink};
use chatstream_runtime::{Command, MAX_TOOL_ROUNDS, Operator, RuntimeSettings, run_exchange};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// An interactive chat loop that streams replies to stdout and lets the
/// operator answer tool calls by hand.
async fn run_chat() -> chatstream_core::error::Result<()> {
    let _ = dotenvy::dotenv();
    let settings = RuntimeSettings::from_env()?;
    let tools = settings.tools()?;

    let mut builder = Conversation::builder(settings.model.clone()).tools(tools);
    if let Some(prompt) = &settings.system_prompt {
        builder = builder.system_prompt(prompt.clone());
    }
    let mut conversation = builder.build(Arc::new(HttpTransport::new(settings.client.clone())));

    let stdin = io::stdin();
    let mut operator = Operator::new(stdin.lock(), io::stdout());

    operator.say("=== Chatstream ===")?;
    operator.say(&format!("Model: {}", conversation.model()))?;
    if !conversation.tools().is_empty() {
        let names: Vec<_> = conversation.tools().iter().map(|t| t.name.as_str()).collect();
        operator.say(&format!("Tools: {}", names.join(", ")))?;
    }
    operator.say("Type your messages and press enter to send. Type 'exit' to quit.\n")?;

    while let Some(line) = operator.read_line("> ")? {
        let prompt = match Command::parse(&line) {
            Command::Quit => break,
            Command::Skip => continue,
            Command::Prompt(prompt) => prompt,
        };

        match run_exchange(
            &mut conversation,
            &prompt,
            &mut StdoutSink,
            &mut operator,
            MAX_TOOL_ROUNDS,
        )
        .await
        {
            Ok(exchange) => {
                operator.say("\n")?;
                if exchange.truncated {
                    operator.say(&format!(
                        "[stopped after {} tool rounds]",
                        exchange.tool_rounds
                    ))?;
                }
            }
            Err(e) => {
                error!("Exchange failed: {}", e);
                operator.say(&format!("\nError: {e}\n"))?;
            }
        }
    }

    operator.say("Goodbye!")?;
    Ok(())
}

#[tokio::main]
pub async fn main() {
    // Logs go to stderr so they never interleave with streamed text
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    info!("Starting Chatstream chat");

    if let Err(e) = run_chat().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
