//! Error types for Confidant.
//!
//! Every failure a session can encounter is folded into [`Error`]: transport
//! failures, non-success statuses from the gateway, malformed reply bodies,
//! credential and persona problems.  The session controller never sees a raw
//! transport error; see [`crate::classify`] for how these map to user-facing
//! categories.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for Confidant.
#[derive(Clone, Debug)]
pub enum Error {
    /// A non-success status without a more specific mapping.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error type string from the gateway.
        error_type: Option<String>,
        /// Human-readable error message.
        message: String,
    },

    /// The gateway rejected the credential.
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Rate limit exceeded.
    RateLimit {
        /// Human-readable error message.
        message: String,
        /// Time to wait before retrying, in seconds.
        retry_after: Option<u64>,
    },

    /// Bad request due to invalid parameters.
    BadRequest {
        /// Human-readable error message.
        message: String,
    },

    /// The gateway or the upstream service failed (5xx).
    InternalServer {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable error message.
        message: String,
    },

    /// The request never reached the gateway.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The request timed out in the HTTP client.
    Timeout {
        /// Human-readable error message.
        message: String,
    },

    /// HTTP client error other than connect or timeout.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A success status whose body was not a non-empty list of text blocks.
    UnexpectedResponse {
        /// Human-readable error message.
        message: String,
    },

    /// Error during JSON or YAML serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// A URL parsing or joining error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// Input failed validation (for example a malformed credential).
    Validation {
        /// Human-readable error message.
        message: String,
    },

    /// The credential store could not be read or written.
    CredentialStore {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// No persona with the requested id exists.
    PersonaNotFound {
        /// The id that was requested.
        id: String,
    },

    /// A request is in flight; the operation was rejected.
    Busy,
}

impl Error {
    /// Creates a new API error.
    pub fn api(status_code: u16, error_type: Option<String>, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            error_type,
            message: message.into(),
        }
    }

    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a new internal server error.
    pub fn internal_server(status_code: u16, message: impl Into<String>) -> Self {
        Error::InternalServer {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Error::Timeout {
            message: message.into(),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new unexpected response error.
    pub fn unexpected_response(message: impl Into<String>) -> Self {
        Error::UnexpectedResponse {
            message: message.into(),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Creates a new credential store error.
    pub fn credential_store(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::CredentialStore {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new persona-not-found error.
    pub fn persona_not_found(id: impl Into<String>) -> Self {
        Error::PersonaNotFound { id: id.into() }
    }

    /// Returns true if this error is related to authentication.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Returns true if this error is related to rate limiting.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    /// Returns true if this error is a bad request.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::BadRequest { .. })
    }

    /// Returns true if this error is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::InternalServer { .. })
    }

    /// Returns true if no response reached the client.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. } | Error::Timeout { .. } | Error::HttpClient { .. }
        )
    }

    /// Returns true if a success status carried a malformed body.
    pub fn is_unexpected_response(&self) -> bool {
        matches!(self, Error::UnexpectedResponse { .. })
    }

    /// Returns true if the operation was rejected because a request is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy)
    }

    /// Returns the HTTP status associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            Error::Authentication { .. } => Some(401),
            Error::RateLimit { .. } => Some(429),
            Error::BadRequest { .. } => Some(400),
            Error::InternalServer { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Returns the error type string reported by the gateway, if any.
    pub fn error_type(&self) -> Option<&str> {
        match self {
            Error::Api { error_type, .. } => error_type.as_deref(),
            _ => None,
        }
    }

    /// Returns the human-readable message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Error::Api { message, .. }
            | Error::Authentication { message }
            | Error::RateLimit { message, .. }
            | Error::BadRequest { message }
            | Error::InternalServer { message, .. }
            | Error::Connection { message, .. }
            | Error::Timeout { message }
            | Error::HttpClient { message, .. }
            | Error::UnexpectedResponse { message }
            | Error::Serialization { message, .. }
            | Error::Io { message, .. }
            | Error::Url { message, .. }
            | Error::Validation { message }
            | Error::CredentialStore { message, .. } => message.as_str(),
            Error::PersonaNotFound { id } => id.as_str(),
            Error::Busy => "a request is already in flight",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                message,
                error_type,
            } => {
                if let Some(error_type) = error_type {
                    write!(f, "API error ({status_code}) {error_type}: {message}")
                } else {
                    write!(f, "API error ({status_code}): {message}")
                }
            }
            Error::Authentication { message } => {
                write!(f, "Authentication error: {message}")
            }
            Error::RateLimit {
                message,
                retry_after,
            } => {
                if let Some(retry_after) = retry_after {
                    write!(
                        f,
                        "Rate limit exceeded: {message} (retry after {retry_after} seconds)"
                    )
                } else {
                    write!(f, "Rate limit exceeded: {message}")
                }
            }
            Error::BadRequest { message } => {
                write!(f, "Bad request: {message}")
            }
            Error::InternalServer {
                status_code,
                message,
            } => {
                write!(f, "Server error ({status_code}): {message}")
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::Timeout { message } => {
                write!(f, "Timeout error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::UnexpectedResponse { message } => {
                write!(f, "Unexpected response format: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Validation { message } => {
                write!(f, "Validation error: {message}")
            }
            Error::CredentialStore { message, .. } => {
                write!(f, "Credential store error: {message}")
            }
            Error::PersonaNotFound { id } => {
                write!(f, "Persona not found: {id}")
            }
            Error::Busy => {
                write!(f, "Busy: a request is already in flight")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Serialization { source, .. }
            | Error::CredentialStore { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::serialization(format!("YAML error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<keyring::Error> for Error {
    fn from(err: keyring::Error) -> Self {
        Error::credential_store(format!("keyring: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for Confidant operations.
pub type Result<T> = std::result::Result<T, Error>;
