use serde::{Deserialize, Serialize};

/// A single turn as it travels over the wire: an author and plain text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageParam {
    /// The role of the message.
    pub role: MessageRole,

    /// The text of the message.
    pub content: String,
}

/// Role type for a message parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl MessageRole {
    /// The lowercase wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MessageParam {
    /// Create a new `MessageParam` with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user `MessageParam`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant `MessageParam`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

impl From<&str> for MessageParam {
    fn from(content: &str) -> Self {
        Self::user(content)
    }
}

impl From<String> for MessageParam {
    fn from(content: String) -> Self {
        Self::user(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn message_param_serializes_role_and_content() {
        let message = MessageParam::user("Hello there");
        let json = to_value(&message).unwrap();

        assert_eq!(
            json,
            json!({
                "role": "user",
                "content": "Hello there"
            })
        );
    }

    #[test]
    fn message_param_from_str_is_user() {
        let message: MessageParam = "Hello".into();
        assert_eq!(message.role, MessageRole::User);

        let message = MessageParam::from(String::from("Hello again"));
        assert_eq!(message.role, MessageRole::User);
    }

    #[test]
    fn assistant_role_round_trips() {
        let message: MessageParam =
            serde_json::from_str(r#"{"role":"assistant","content":"Hi"}"#).unwrap();
        assert_eq!(message, MessageParam::assistant("Hi"));
        assert_eq!(message.role.to_string(), "assistant");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = serde_json::from_str::<MessageParam>(r#"{"role":"system","content":"x"}"#);
        assert!(result.is_err());
    }
}
