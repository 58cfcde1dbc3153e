//! Logging trait for gateway interactions.
//!
//! This module provides the [`ClientLogger`] trait that allows embedders to
//! capture every exchange passing through a
//! [`RemoteChatClient`](crate::client::RemoteChatClient).

use crate::error::Error;
use crate::types::{ChatRequest, ChatResponse};

/// A trait for observing gateway traffic.
///
/// Requests are handed over with the credential already redacted.
///
/// # Example
///
/// ```rust,ignore
/// use confidant::{ChatRequest, ChatResponse, ClientLogger, Error};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, request: &ChatRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Request: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_response(&self, response: &ChatResponse) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Response: {}", serde_json::to_string(response).unwrap()).unwrap();
///     }
///
///     fn log_error(&self, error: &Error) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Error: {error}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Called once per `send`, before the request goes out.
    fn log_request(&self, request: &ChatRequest);

    /// Called once per successful `send` with the decoded body.
    fn log_response(&self, response: &ChatResponse);

    /// Called once per failed `send`.
    fn log_error(&self, error: &Error);
}
