//! Terminal front end for a counseling-practice chat.
//!
//! This module provides the pieces the `confidant-chat` binary wires around a
//! [`SessionController`](crate::session::SessionController):
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing
//! - [`render`]: Plain-text transcript rendering

mod commands;
mod config;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_GATEWAY, PersonaSource};
pub use render::{PlainTextRenderer, Renderer};
