use serde::{Deserialize, Serialize};

use crate::types::MessageParam;

/// The model identifier sent with every request.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Maximum output size requested on every turn.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// The body POSTed to the gateway's chat endpoint.
///
/// The gateway authenticates against the upstream service with the `api_key`
/// carried in the body, so the credential travels with every request.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// The model that will complete the conversation.
    pub model: String,

    /// The maximum number of tokens to generate.
    pub max_tokens: u32,

    /// Instruction text; empty when no persona is active.
    pub system: String,

    /// Full ordered history ending in the newest user turn.
    pub messages: Vec<MessageParam>,

    /// Bearer credential forwarded by the gateway.
    pub api_key: String,
}

impl ChatRequest {
    /// Create a request with the default model and token limit.
    pub fn new(
        system: impl Into<String>,
        messages: Vec<MessageParam>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system: system.into(),
            messages,
            api_key: api_key.into(),
        }
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// A copy of this request with the credential blanked, safe to log.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: String::from("<redacted>"),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRequest")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("system", &self.system)
            .field("messages", &self.messages)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn request_serialization() {
        let request = ChatRequest::new(
            "You are Sam.",
            vec![MessageParam::user("Hello"), MessageParam::assistant("Hi")],
            "sk-ant-test",
        );
        let json = to_value(&request).unwrap();

        assert_eq!(
            json,
            json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 1000,
                "system": "You are Sam.",
                "messages": [
                    {"role": "user", "content": "Hello"},
                    {"role": "assistant", "content": "Hi"}
                ],
                "api_key": "sk-ant-test"
            })
        );
    }

    #[test]
    fn builder_overrides() {
        let request = ChatRequest::new("", vec![], "sk-ant-x")
            .with_model("claude-haiku-4-5")
            .with_max_tokens(64);
        assert_eq!(request.model, "claude-haiku-4-5");
        assert_eq!(request.max_tokens, 64);
    }

    #[test]
    fn debug_and_redacted_hide_credential() {
        let request = ChatRequest::new("", vec![MessageParam::user("Hi")], "sk-ant-secret");
        let debug = format!("{request:?}");
        assert!(!debug.contains("sk-ant-secret"));

        let redacted = request.redacted();
        assert_eq!(redacted.api_key, "<redacted>");
        assert_eq!(redacted.messages, request.messages);
    }
}
