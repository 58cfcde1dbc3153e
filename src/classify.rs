//! Reduce a failed turn to something the user can act on.
//!
//! The gateway's error surface is only partly structured, so classification
//! matches on whatever signals are present (status code, transport kind,
//! message text) in a fixed priority order.  The first rule that matches
//! wins, and [`FailureCategory::Unknown`] catches everything else so the user
//! always sees a usable sentence rather than a raw failure.

use std::time::Duration;

use crate::error::Error;

/// How long to wait before asking for a new credential after the gateway
/// rejects the current one.
pub const REPROMPT_DELAY: Duration = Duration::from_secs(1);

pub const AUTH_MESSAGE: &str = "Invalid API key. Please check your key.";
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";
pub const BAD_REQUEST_MESSAGE: &str = "Invalid request. Please try rephrasing your message.";
pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const SERVER_MESSAGE: &str = "Server error occurred. Please try again in a moment.";
pub const GENERIC_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// User-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    Auth,
    RateLimited,
    BadRequest,
    Network,
    Server,
    /// A success status with a body that was not a list of text blocks.
    UnknownFormat,
    Unknown,
}

/// What the session should do beyond posting the notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Nothing; the gate reopens and the next turn may succeed.
    None,
    /// Forget the credential everywhere and ask for a new one after a delay.
    ResetCredential { reprompt_after: Duration },
}

/// The outcome of classifying a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: FailureCategory,
    pub user_message: &'static str,
    pub recovery: Recovery,
}

impl FailureCategory {
    /// The fixed notice shown for this category.
    pub fn user_message(self) -> &'static str {
        match self {
            FailureCategory::Auth => AUTH_MESSAGE,
            FailureCategory::RateLimited => RATE_LIMIT_MESSAGE,
            FailureCategory::BadRequest => BAD_REQUEST_MESSAGE,
            FailureCategory::Network => NETWORK_MESSAGE,
            FailureCategory::Server => SERVER_MESSAGE,
            FailureCategory::UnknownFormat | FailureCategory::Unknown => GENERIC_MESSAGE,
        }
    }

    /// The recovery action for this category.
    pub fn recovery(self) -> Recovery {
        match self {
            FailureCategory::Auth => Recovery::ResetCredential {
                reprompt_after: REPROMPT_DELAY,
            },
            _ => Recovery::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureCategory::Auth => "auth",
            FailureCategory::RateLimited => "rate_limited",
            FailureCategory::BadRequest => "bad_request",
            FailureCategory::Network => "network",
            FailureCategory::Server => "server",
            FailureCategory::UnknownFormat => "unknown_format",
            FailureCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FailureCategory> for Classification {
    fn from(category: FailureCategory) -> Self {
        Classification {
            category,
            user_message: category.user_message(),
            recovery: category.recovery(),
        }
    }
}

/// Classify a failed turn.
pub fn classify(err: &Error) -> Classification {
    category_of(err).into()
}

fn category_of(err: &Error) -> FailureCategory {
    let status = err.status_code();
    let message = err.message().to_ascii_lowercase();

    if status == Some(401)
        || err.error_type() == Some("authentication_error")
        || mentions_invalid_credential(&message)
    {
        FailureCategory::Auth
    } else if status == Some(429) {
        FailureCategory::RateLimited
    } else if status == Some(400) {
        FailureCategory::BadRequest
    } else if err.is_transport() {
        FailureCategory::Network
    } else if mentions_server_failure(&message) {
        FailureCategory::Server
    } else if err.is_unexpected_response() {
        FailureCategory::UnknownFormat
    } else {
        FailureCategory::Unknown
    }
}

fn mentions_invalid_credential(message: &str) -> bool {
    ["invalid api key", "invalid x-api-key", "invalid credential"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn mentions_server_failure(message: &str) -> bool {
    ["server error", "internal error", "overloaded"]
        .iter()
        .any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(err: Error) -> FailureCategory {
        classify(&err).category
    }

    #[test]
    fn auth_by_status_or_message() {
        assert_eq!(
            category(Error::authentication("Invalid API key")),
            FailureCategory::Auth
        );
        assert_eq!(
            category(Error::internal_server(500, "upstream said: Invalid API key")),
            FailureCategory::Auth
        );
        assert_eq!(
            category(Error::api(
                403,
                Some("authentication_error".to_string()),
                "nope"
            )),
            FailureCategory::Auth
        );
    }

    #[test]
    fn auth_recovery_resets_credential() {
        let classification = classify(&Error::authentication("Invalid API key"));
        assert_eq!(classification.user_message, AUTH_MESSAGE);
        assert_eq!(
            classification.recovery,
            Recovery::ResetCredential {
                reprompt_after: Duration::from_secs(1)
            }
        );
    }

    #[test]
    fn rate_limit_and_bad_request() {
        let classification = classify(&Error::rate_limit("Rate limit exceeded", None));
        assert_eq!(classification.category, FailureCategory::RateLimited);
        assert_eq!(classification.user_message, RATE_LIMIT_MESSAGE);
        assert_eq!(classification.recovery, Recovery::None);

        assert_eq!(
            category(Error::bad_request("Bad request: messages: field required")),
            FailureCategory::BadRequest
        );
    }

    #[test]
    fn transport_failures_are_network() {
        assert_eq!(
            category(Error::connection("connection refused", None)),
            FailureCategory::Network
        );
        assert_eq!(category(Error::timeout("timed out")), FailureCategory::Network);
    }

    #[test]
    fn server_by_message() {
        assert_eq!(
            category(Error::internal_server(500, "Server error: boom")),
            FailureCategory::Server
        );
        assert_eq!(
            category(Error::api(418, None, "Server error: teapot")),
            FailureCategory::Server
        );
    }

    #[test]
    fn bare_5xx_is_unknown() {
        let classification = classify(&Error::internal_server(500, "API error: upstream refused"));
        assert_eq!(classification.category, FailureCategory::Unknown);
        assert_eq!(classification.user_message, GENERIC_MESSAGE);
        assert_eq!(
            category(Error::internal_server(503, "HTTP error! status: 503")),
            FailureCategory::Unknown
        );
    }

    #[test]
    fn malformed_success_body() {
        let classification = classify(&Error::unexpected_response("empty content list"));
        assert_eq!(classification.category, FailureCategory::UnknownFormat);
        assert_eq!(classification.user_message, GENERIC_MESSAGE);
        assert_eq!(classification.recovery, Recovery::None);
    }

    #[test]
    fn fallback_is_unknown() {
        let classification = classify(&Error::api(404, None, "Resource not found"));
        assert_eq!(classification.category, FailureCategory::Unknown);
        assert_eq!(classification.user_message, GENERIC_MESSAGE);
    }

    #[test]
    fn priority_prefers_rate_limit_over_server_text() {
        assert_eq!(
            category(Error::rate_limit("server error while limiting", None)),
            FailureCategory::RateLimited
        );
    }
}
