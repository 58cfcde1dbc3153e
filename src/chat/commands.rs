//! Slash command parsing for the chat front end.
//!
//! Commands start with `/` and drive the session controller directly; they
//! are never sent to the gateway.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Start a new conversation with the current persona.
    Clear,

    /// List the personas on offer.
    Personas,

    /// Switch to the persona with this id.
    Persona(String),

    /// Replace the stored credential.
    Key(String),

    /// Forget the stored credential.
    Logout,

    /// Display session statistics.
    Stats,

    /// Display the status indicator.
    Status,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be treated as a message.
///
/// # Examples
///
/// ```
/// # use confidant::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/persona anxious-student").is_some());
/// assert!(parse_command("I haven't been sleeping well.").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "new" => ChatCommand::Clear,
        "personas" | "list" => ChatCommand::Personas,
        "persona" => match argument {
            Some(id) => ChatCommand::Persona(id.to_string()),
            None => ChatCommand::Personas,
        },
        "key" => match argument {
            Some(key) => ChatCommand::Key(key.to_string()),
            None => ChatCommand::Invalid("/key requires an API key".to_string()),
        },
        "logout" => ChatCommand::Logout,
        "stats" => ChatCommand::Stats,
        "status" => ChatCommand::Status,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /personas              List available clients
  /persona <id>          Start a session with a client
  /clear                 Start a new session with the current client
  /key <api-key>         Replace the stored API key
  /logout                Forget the stored API key
  /stats                 Show session statistics
  /status                Show connection status
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_clear() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/NEW"), Some(ChatCommand::Clear));
    }

    #[test]
    fn parse_persona() {
        assert_eq!(
            parse_command("/persona   grieving-parent "),
            Some(ChatCommand::Persona("grieving-parent".to_string()))
        );
        assert_eq!(parse_command("/persona"), Some(ChatCommand::Personas));
        assert_eq!(parse_command("/personas"), Some(ChatCommand::Personas));
    }

    #[test]
    fn parse_key() {
        assert_eq!(
            parse_command("/key sk-ant-abc"),
            Some(ChatCommand::Key("sk-ant-abc".to_string()))
        );
        assert!(matches!(
            parse_command("/key"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
        assert_eq!(parse_command("/logout"), Some(ChatCommand::Logout));
    }

    #[test]
    fn parse_stats_and_status() {
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/status"), Some(ChatCommand::Status));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/model x"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there."), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_mentions_every_command() {
        let help = help_text();
        for command in ["/personas", "/persona", "/clear", "/key", "/logout", "/quit"] {
            assert!(help.contains(command), "{command}");
        }
    }
}
