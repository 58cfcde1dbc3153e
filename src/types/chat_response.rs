use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A successful reply from the gateway's chat endpoint.
///
/// Only `content` is required for a turn to succeed; the remaining fields are
/// passed through from the upstream service when the gateway provides them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    /// Upstream message identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The model that produced the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Ordered content blocks; the first block's text is the reply.
    #[serde(default)]
    pub content: Vec<ContentBlock>,

    /// Why generation stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,

    /// Token accounting for the turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One block of reply content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentBlock {
    /// Block type as reported by the gateway (`text`, `tool_use`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,

    /// Text of the block; absent for non-text blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Token usage reported for a single turn.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    #[serde(default)]
    pub input_tokens: u64,

    /// Tokens generated in the reply.
    #[serde(default)]
    pub output_tokens: u64,
}

impl ChatResponse {
    /// Build a response holding a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            ..Self::default()
        }
    }

    /// The text of the first content block, if the first block carries text.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(|block| block.text.as_deref())
    }

    /// The reply text, or an unexpected-response error when the content list
    /// is empty or its first block carries no text.
    pub fn reply(&self) -> Result<&str> {
        match self.content.first() {
            None => Err(Error::unexpected_response("response had no content blocks")),
            Some(block) => block.text.as_deref().ok_or_else(|| {
                Error::unexpected_response("first content block had no text")
            }),
        }
    }
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            block_type: Some("text".to_string()),
            text: Some(text.into()),
        }
    }
}

impl std::ops::Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens.saturating_add(rhs.input_tokens),
            output_tokens: self.output_tokens.saturating_add(rhs.output_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_body_parses() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"content":[{"text":"Hi there"}]}"#).unwrap();
        assert_eq!(response.first_text(), Some("Hi there"));
        assert!(response.usage.is_none());
    }

    #[test]
    fn full_gateway_body_parses() {
        let body = r#"{
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "First"},
                {"type": "text", "text": "Second"}
            ],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "stop_sequence": null,
            "usage": {"input_tokens": 12, "output_tokens": 3}
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_text(), Some("First"));
        assert_eq!(response.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(
            response.usage,
            Some(Usage {
                input_tokens: 12,
                output_tokens: 3
            })
        );
    }

    #[test]
    fn reply_requires_text() {
        assert_eq!(ChatResponse::text("Hi there").reply().unwrap(), "Hi there");
        let err = ChatResponse::default().reply().unwrap_err();
        assert!(err.is_unexpected_response());
    }

    #[test]
    fn empty_or_missing_content_has_no_text() {
        let response: ChatResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert_eq!(response.first_text(), None);

        let response: ChatResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(response.first_text(), None);
    }

    #[test]
    fn non_text_first_block_has_no_text() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"content":[{"type":"tool_use","id":"t1"}]}"#).unwrap();
        assert_eq!(response.first_text(), None);
    }

    #[test]
    fn usage_adds() {
        let total = Usage {
            input_tokens: 1,
            output_tokens: 2,
        } + Usage {
            input_tokens: 10,
            output_tokens: 20,
        };
        assert_eq!(total.input_tokens, 11);
        assert_eq!(total.output_tokens, 22);
    }
}
