//! Natural-language command parsing with rule-based fallback.

use serde::Serialize;
use std::sync::Arc;

use skyward_core::models::{Command, ParsedCommand, WireCommand};
use skyward_core::rule_parser::parse_rules;

use crate::client::{ChatBackend, ChatOptions};
use crate::error::LlmError;

pub const COMMAND_SYSTEM_PROMPT: &str = r#"You are an LLM that converts drone commands into structured JSON.

The drone has a current state, and your output should only change the parameters mentioned in the command.

Input: the current drone state as JSON followed by a natural language drone command (Korean or English).
Output: JSON with the following structure:
{
  "action": "[action type: move, hover, altitude, rotate, return, reconnaissance, tracking]",
  "altitude": [altitude value (meters)],
  "direction": [x, y, z vector - each element between -1.0 and 1.0],
  "speed": [speed value (m/s)],
  "trackingDistance": [standoff distance to keep from the target (meters)]
}

Action Types:
- move: Move in a specific direction
- hover: Maintain position at current location
- altitude: Change altitude
- rotate: Rotate; direction holds Euler angles in degrees, e.g. [0, 90, 0] to face right
- return: Return to starting point
- reconnaissance: Explore the area while avoiding obstacles
- tracking: Follow the detected target while keeping trackingDistance

Direction Vector Examples:
- [1.0, 0.0, 0.0]: East/Right
- [-1.0, 0.0, 0.0]: West/Left
- [0.0, 1.0, 0.0]: Upward
- [0.0, -1.0, 0.0]: Downward
- [0.0, 0.0, 1.0]: North/Forward
- [0.0, 0.0, -1.0]: South/Backward

Analyze the input command and return only the JSON object. Do not include any explanations or other text."#;

pub const COMMAND_OPTIONS: ChatOptions = ChatOptions {
    temperature: 0.1,
    num_predict: 500,
};

/// Where a parse result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    /// New canonical state after merging
    pub command: Command,
    /// Delta produced by the parser
    pub parsed: ParsedCommand,
    pub source: ParseSource,
}

/// Span from the first `{` to the last `}` of a model reply.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Decode a raw model reply into a parse delta.
pub fn parse_model_reply(reply: &str) -> Result<ParsedCommand, LlmError> {
    let json = extract_json_object(reply).ok_or(LlmError::NoJsonObject)?;
    let wire: WireCommand = serde_json::from_str(json)?;
    Ok(wire.into_parsed())
}

#[derive(Clone)]
pub struct CommandParser {
    backend: Arc<dyn ChatBackend>,
}

impl CommandParser {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Parse `text` against `previous` and return the merged canonical
    /// command. Never fails.
    pub async fn parse(&self, previous: &Command, text: &str) -> Command {
        self.parse_with_source(previous, text).await.command
    }

    pub async fn parse_with_source(&self, previous: &Command, text: &str) -> ParseOutcome {
        let (parsed, source) = match self.ask_model(previous, text).await {
            Ok(parsed) => (parsed, ParseSource::Model),
            Err(err) => {
                tracing::warn!("Model parse failed ({}); using rule-based parser", err);
                (parse_rules(text, previous), ParseSource::Fallback)
            }
        };

        let command = previous.merge(&parsed);
        tracing::info!(
            source = ?source,
            action = %command.action,
            "Parsed command {:?}",
            text
        );
        ParseOutcome {
            command,
            parsed,
            source,
        }
    }

    async fn ask_model(&self, previous: &Command, text: &str) -> Result<ParsedCommand, LlmError> {
        let state = serde_json::to_string(previous)?;
        let user = format!("Current drone state: {}\n\nOperator command: {}", state, text);
        let reply = self
            .backend
            .chat(COMMAND_SYSTEM_PROMPT, &user, COMMAND_OPTIONS)
            .await?;
        tracing::debug!("Model reply: {}", reply);
        parse_model_reply(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skyward_core::models::Action;
    use std::sync::Mutex;

    /// Replies with a fixed string and records the user prompt.
    struct CannedBackend {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedBackend {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for CannedBackend {
        async fn chat(&self, _: &str, user: &str, _: ChatOptions) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(user.to_string());
            self.reply.clone().map_err(|_| LlmError::MissingContent)
        }
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(
            extract_json_object("Sure! {\"action\": \"hover\"} done"),
            Some("{\"action\": \"hover\"}")
        );
        assert_eq!(extract_json_object("no braces here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[tokio::test]
    async fn test_model_reply_with_prose_is_used() {
        let backend = CannedBackend::replying(
            "Here is the command:\n{\"action\": \"move\", \"direction\": [1, 0, 0], \"speed\": 4}",
        );
        let parser = CommandParser::new(backend.clone());
        let outcome = parser.parse_with_source(&Command::default(), "go right").await;

        assert_eq!(outcome.source, ParseSource::Model);
        assert_eq!(outcome.command.action, Action::Move);
        assert_eq!(outcome.command.direction, [1.0, 0.0, 0.0]);
        assert_eq!(outcome.command.speed, 4.0);

        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("\"action\":\"hover\""));
        assert!(prompts[0].ends_with("go right"));
    }

    #[tokio::test]
    async fn test_reply_without_braces_falls_back() {
        let backend = CannedBackend::replying("I cannot help with that.");
        let parser = CommandParser::new(backend);
        let outcome = parser
            .parse_with_source(&Command::altitude(10.0), "위로 5미터 상승")
            .await;

        assert_eq!(outcome.source, ParseSource::Fallback);
        assert_eq!(outcome.command.action, Action::Altitude);
        assert_eq!(outcome.command.altitude, 15.0);
    }

    #[tokio::test]
    async fn test_malformed_json_falls_back() {
        let backend = CannedBackend::replying("{\"action\": \"hover\", \"speed\": }");
        let parser = CommandParser::new(backend);
        let outcome = parser.parse_with_source(&Command::default(), "정찰해").await;
        assert_eq!(outcome.source, ParseSource::Fallback);
        assert_eq!(outcome.command.action, Action::Reconnaissance);
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back() {
        let parser = CommandParser::new(CannedBackend::failing());
        let command = parser.parse(&Command::default(), "hover").await;
        assert_eq!(command.action, Action::Hover);
    }

    #[tokio::test]
    async fn test_model_partial_update_keeps_state() {
        let backend = CannedBackend::replying("{\"action\": \"move\", \"speed\": 8}");
        let parser = CommandParser::new(backend);
        let previous = Command::move_towards([0.0, 0.0, -1.0], 2.0);
        let command = parser.parse(&previous, "faster").await;
        assert_eq!(command.direction, [0.0, 0.0, -1.0]);
        assert_eq!(command.speed, 8.0);
    }
}
