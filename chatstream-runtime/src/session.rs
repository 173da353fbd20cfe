use chatstream_core::error::Result;
use chatstream_core::{Conversation, TextSink, TurnOutput};
use tracing::{info, instrument, warn};

use crate::operator::ToolResolver;

/// Upper bound on tool rounds answered for a single user line
pub const MAX_TOOL_ROUNDS: usize = 8;

/// What one line typed at the prompt asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Skip,
    Prompt(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            Command::Skip
        } else if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            Command::Quit
        } else {
            Command::Prompt(line.to_string())
        }
    }
}

/// Result of one user line, after any tool rounds
#[derive(Debug, Clone)]
pub struct Exchange {
    /// The last turn's output
    pub output: TurnOutput,
    /// How many times tool results were sent back
    pub tool_rounds: usize,
    /// The last turn still asked for tools when the round limit was hit
    pub truncated: bool,
}

/// Output recorded for a tool call that was never answered
pub const UNANSWERED_TOOL_OUTPUT: &str = "not executed: tool round limit reached";

/// Output recorded for the calls left over when the resolver fails
pub const ABANDONED_TOOL_OUTPUT: &str = "not executed: tool resolution failed";

/// Sends `prompt` and keeps answering tool calls until the assistant replies
/// without any, or `max_rounds` follow-up turns have been made
///
/// Every tool call the assistant makes gets a tool result in the log, even
/// when the loop stops early, so the next prompt still forms a valid request.
#[instrument(skip_all, fields(max_rounds = max_rounds))]
pub async fn run_exchange(
    conversation: &mut Conversation,
    prompt: &str,
    sink: &mut dyn TextSink,
    resolver: &mut dyn ToolResolver,
    max_rounds: usize,
) -> Result<Exchange> {
    let mut output = conversation.send_turn(Some(prompt), sink).await?;
    let mut tool_rounds = 0;

    while output.has_tool_calls() {
        if tool_rounds == max_rounds {
            warn!(
                "Stopping after {} tool rounds with {} calls unanswered",
                tool_rounds,
                output.tool_calls.len()
            );
            for call in &output.tool_calls {
                conversation.append_tool_result(&call.id, UNANSWERED_TOOL_OUTPUT);
            }
            return Ok(Exchange {
                output,
                tool_rounds,
                truncated: true,
            });
        }

        for (answered, call) in output.tool_calls.iter().enumerate() {
            match resolver.resolve(call) {
                Ok(result) => conversation.append_tool_result(&call.id, result),
                Err(e) => {
                    warn!(
                        "Resolving {} failed; closing {} remaining calls",
                        call.id,
                        output.tool_calls.len() - answered
                    );
                    for rest in &output.tool_calls[answered..] {
                        conversation.append_tool_result(&rest.id, ABANDONED_TOOL_OUTPUT);
                    }
                    return Err(e);
                }
            }
        }
        tool_rounds += 1;
        info!("Tool round {} answered", tool_rounds);

        output = conversation.send_turn(None, sink).await?;
    }

    Ok(Exchange {
        output,
        tool_rounds,
        truncated: false,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chatstream_core::transport::mock::MockResponse;
    use chatstream_core::{
        ChatCompletionChunk, CompletionRequest, Error, MessageRole, MockTransport, ToolCall,
        ToolCallDelta,
    };

    use super::*;

    /// Answers every call with its name reversed, counting calls
    #[derive(Default)]
    struct Echo {
        seen: Vec<String>,
    }

    impl ToolResolver for Echo {
        fn resolve(&mut self, call: &ToolCall) -> Result<String> {
            self.seen.push(call.function.name.clone());
            Ok(call.function.name.chars().rev().collect())
        }
    }

    fn tool_turn(id: &str, name: &str) -> MockResponse {
        MockResponse::new(vec![
            ChatCompletionChunk::tool_calls(vec![
                ToolCallDelta::new(0).with_id(id).with_name(name).with_arguments("{}"),
            ]),
            ChatCompletionChunk::finish("tool_calls"),
        ])
    }

    /// Fails on the named tool, answers the rest
    struct FailOn(&'static str);

    impl ToolResolver for FailOn {
        fn resolve(&mut self, call: &ToolCall) -> Result<String> {
            if call.function.name == self.0 {
                Err(Error::Other(format!("{} is unavailable", self.0)))
            } else {
                Ok("done".to_string())
            }
        }
    }

    /// Every assistant tool call is answered by the tool messages right after it
    fn assert_tool_calls_answered(request: &CompletionRequest) {
        let messages = &request.messages;
        for (i, message) in messages.iter().enumerate() {
            let answers: Vec<_> = messages[i + 1..]
                .iter()
                .take_while(|m| m.role == MessageRole::Tool)
                .filter_map(|m| m.tool_call_id.as_deref())
                .collect();
            for call in &message.tool_calls {
                assert!(
                    answers.contains(&call.id.as_str()),
                    "tool call {} has no result before the next message",
                    call.id
                );
            }
        }
    }

    fn new_conversation(transport: &MockTransport) -> Conversation {
        Conversation::builder("gpt-4o-mini").build(Arc::new(transport.clone()))
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("  "), Command::Skip);
        assert_eq!(Command::parse("EXIT\n"), Command::Quit);
        assert_eq!(Command::parse("quit"), Command::Quit);
        assert_eq!(Command::parse(" hi there "), Command::Prompt("hi there".into()));
    }

    #[tokio::test]
    async fn test_exchange_answers_tools_then_finishes() {
        let transport = MockTransport::new();
        transport
            .push_response(tool_turn("call_1", "clock"))
            .push_response(MockResponse::text(["It is ", "noon."]));
        let mut conversation = new_conversation(&transport);
        let mut resolver = Echo::default();
        let mut shown = String::new();

        let exchange = run_exchange(&mut conversation, "time?", &mut shown, &mut resolver, 8)
            .await
            .unwrap();

        assert_eq!(exchange.tool_rounds, 1);
        assert!(!exchange.truncated);
        assert_eq!(exchange.output.content, "It is noon.");
        assert_eq!(shown, "It is noon.");
        assert_eq!(resolver.seen, ["clock"]);

        let roles: Vec<_> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::Tool,
                MessageRole::Assistant
            ]
        );
        assert_eq!(conversation.messages()[2].content, "kcolc");
    }

    #[tokio::test]
    async fn test_exchange_stops_at_round_limit() {
        let transport = MockTransport::new();
        for i in 0..3 {
            transport.push_response(tool_turn(&format!("call_{i}"), "loop"));
        }
        let mut conversation = new_conversation(&transport);
        let mut resolver = Echo::default();

        let exchange = run_exchange(&mut conversation, "go", &mut String::new(), &mut resolver, 2)
            .await
            .unwrap();

        assert!(exchange.truncated);
        assert_eq!(exchange.tool_rounds, 2);
        assert_eq!(resolver.seen.len(), 2);
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(transport.pending_responses(), 0);
    }

    #[tokio::test]
    async fn test_exchange_propagates_turn_error() {
        let transport = MockTransport::new();
        transport.push_response(MockResponse::rejected(401, "bad key"));
        let mut conversation = new_conversation(&transport);

        let err = run_exchange(&mut conversation, "hi", &mut String::new(), &mut Echo::default(), 8)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[tokio::test]
    async fn test_next_line_after_round_limit_is_well_formed() {
        let transport = MockTransport::new();
        transport
            .push_response(tool_turn("call_0", "loop"))
            .push_response(tool_turn("call_1", "loop"))
            .push_response(MockResponse::text(["fresh start"]));
        let mut conversation = new_conversation(&transport);
        let mut resolver = Echo::default();

        let exchange = run_exchange(&mut conversation, "go", &mut String::new(), &mut resolver, 1)
            .await
            .unwrap();
        assert!(exchange.truncated);
        assert_eq!(
            conversation.messages().last().and_then(|m| m.tool_call_id.as_deref()),
            Some("call_1")
        );
        assert_eq!(
            conversation.messages().last().map(|m| m.content.as_str()),
            Some(UNANSWERED_TOOL_OUTPUT)
        );

        let exchange = run_exchange(&mut conversation, "next", &mut String::new(), &mut resolver, 1)
            .await
            .unwrap();
        assert_eq!(exchange.output.content, "fresh start");

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        let roles: Vec<_> = requests[2].messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::Tool,
                MessageRole::Assistant,
                MessageRole::Tool,
                MessageRole::User
            ]
        );
        for request in &requests {
            assert_tool_calls_answered(request);
        }
    }

    #[tokio::test]
    async fn test_resolver_failure_closes_remaining_calls() {
        let transport = MockTransport::new();
        transport
            .push_response(MockResponse::new(vec![ChatCompletionChunk::tool_calls(vec![
                ToolCallDelta::new(0).with_id("call_a").with_name("clock").with_arguments("{}"),
                ToolCallDelta::new(1).with_id("call_b").with_name("broken").with_arguments("{}"),
                ToolCallDelta::new(2).with_id("call_c").with_name("clock").with_arguments("{}"),
            ])]))
            .push_response(MockResponse::text(["ok"]));
        let mut conversation = new_conversation(&transport);

        let err = run_exchange(&mut conversation, "go", &mut String::new(), &mut FailOn("broken"), 8)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Other(msg) if msg.contains("broken")));

        let results: Vec<_> = conversation
            .messages()
            .iter()
            .filter(|m| m.role == MessageRole::Tool)
            .map(|m| (m.tool_call_id.as_deref().unwrap_or_default(), m.content.as_str()))
            .collect();
        assert_eq!(
            results,
            [
                ("call_a", "done"),
                ("call_b", ABANDONED_TOOL_OUTPUT),
                ("call_c", ABANDONED_TOOL_OUTPUT)
            ]
        );

        run_exchange(&mut conversation, "again", &mut String::new(), &mut Echo::default(), 8)
            .await
            .unwrap();
        assert_tool_calls_answered(&transport.last_request().unwrap());
    }
}
