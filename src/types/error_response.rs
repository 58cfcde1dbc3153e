use serde::{Deserialize, Serialize};

/// The optional error body the gateway attaches to a non-success status.
///
/// Every field is optional: a body that decodes but lacks a message is still
/// useful for its status, and a body that fails to decode is treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// The error object, when present.
    #[serde(default)]
    pub error: Option<ErrorObject>,
}

/// Details about a failed request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Human-readable error message.
    #[serde(default)]
    pub message: Option<String>,

    /// Machine-readable error type (`authentication_error`, ...).
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

impl ErrorResponse {
    /// Decode an error body, yielding an empty response when it is not the
    /// expected JSON shape.
    pub fn parse_lenient(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// The error message, if any.
    pub fn message(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.message.as_deref())
    }

    /// The error type, if any.
    pub fn error_type(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.error_type.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_body() {
        let body = r#"{"error":{"message":"Invalid API key","type":"authentication_error"}}"#;
        let response = ErrorResponse::parse_lenient(body);
        assert_eq!(response.message(), Some("Invalid API key"));
        assert_eq!(response.error_type(), Some("authentication_error"));
    }

    #[test]
    fn message_only() {
        let response = ErrorResponse::parse_lenient(r#"{"error":{"message":"No data provided"}}"#);
        assert_eq!(response.message(), Some("No data provided"));
        assert_eq!(response.error_type(), None);
    }

    #[test]
    fn non_json_body_is_empty() {
        let response = ErrorResponse::parse_lenient("<html>Bad Gateway</html>");
        assert_eq!(response, ErrorResponse::default());
        assert_eq!(response.message(), None);
    }

    #[test]
    fn unexpected_json_shape_is_empty() {
        let response = ErrorResponse::parse_lenient(r#"{"error":"plain string"}"#);
        assert_eq!(response.message(), None);
    }
}
