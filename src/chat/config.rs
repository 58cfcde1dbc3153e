//! Configuration types for the chat front end.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration the binary runs with.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::session::SessionConfig;
use crate::types::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};

/// Gateway used when `--gateway` is not given.
pub const DEFAULT_GATEWAY: &str = "http://localhost:8000";

/// Command-line arguments for the confidant-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Root URL of the gateway.
    #[arrrg(optional, "Gateway URL (default: http://localhost:8000)", "URL")]
    pub gateway: Option<String>,

    /// Model to request.
    #[arrrg(optional, "Model to use (default: claude-sonnet-4-20250514)", "MODEL")]
    pub model: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 1000)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Persona to select at startup.
    #[arrrg(optional, "Client persona to start with", "ID")]
    pub persona: Option<String>,

    /// Read personas from a YAML file instead of the gateway.
    #[arrrg(optional, "YAML file listing client personas", "PATH")]
    pub persona_file: Option<String>,

    /// Use one fixed instruction text instead of selectable personas.
    #[arrrg(optional, "File holding a fixed instruction text", "PATH")]
    pub instructions: Option<String>,

    /// Fetch the fixed instruction text once from a URL.
    #[arrrg(optional, "URL serving a fixed instruction text", "URL")]
    pub instructions_url: Option<String>,

    /// Instruction text used when no persona is active.
    #[arrrg(optional, "System prompt when chatting without a persona", "PROMPT")]
    pub system: Option<String>,

    /// Allow chatting before a persona is chosen.
    #[arrrg(flag, "Do not require a persona before chatting")]
    pub no_persona: bool,

    /// Keep the API key in memory only.
    #[arrrg(flag, "Do not read or write the system keyring")]
    pub no_keyring: bool,

    /// Skip the persona's opening line.
    #[arrrg(flag, "Do not open sessions with a greeting")]
    pub no_greeting: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Where personas come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonaSource {
    /// The gateway's listing and detail endpoints.
    Gateway,
    /// A local YAML file.
    File(PathBuf),
    /// A fixed instruction text read from disk.
    Instructions(PathBuf),
    /// A fixed instruction text fetched once over HTTP.
    InstructionsUrl(String),
}

/// Configuration for a chat run.
///
/// This struct holds the resolved values after processing command-line
/// arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Root URL of the gateway.
    pub gateway: String,

    /// The model to use for generating responses.
    pub model: String,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Instruction text used when no persona is active.
    pub system_prompt: Option<String>,

    /// Persona to select at startup.
    pub persona: Option<String>,

    /// Where personas come from.
    pub persona_source: PersonaSource,

    /// Whether a persona must be selected before chatting.
    pub require_persona: bool,

    /// Whether new sessions open with a greeting.
    pub greeting: bool,

    /// Whether the API key is kept in the system keyring.
    pub use_keyring: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Gateway: http://localhost:8000
    /// - Model: claude-sonnet-4-20250514
    /// - Max tokens: 1000
    /// - Personas: from the gateway, one required
    /// - Greeting, keyring, and color: enabled
    pub fn new() -> Self {
        Self {
            gateway: DEFAULT_GATEWAY.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: None,
            persona: None,
            persona_source: PersonaSource::Gateway,
            require_persona: true,
            greeting: true,
            use_keyring: true,
            use_color: true,
        }
    }

    /// Sets the gateway URL.
    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = gateway.into();
        self
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the fallback system prompt.
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    /// Sets the persona selected at startup.
    pub fn with_persona(mut self, id: impl Into<String>) -> Self {
        self.persona = Some(id.into());
        self
    }

    /// Sets where personas come from.
    pub fn with_persona_source(mut self, source: PersonaSource) -> Self {
        self.persona_source = source;
        self
    }

    /// Allows chatting without a persona.
    pub fn without_required_persona(mut self) -> Self {
        self.require_persona = false;
        self
    }

    /// Disables session greetings.
    pub fn without_greeting(mut self) -> Self {
        self.greeting = false;
        self
    }

    /// Keeps the API key in memory only.
    pub fn without_keyring(mut self) -> Self {
        self.use_keyring = false;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The session settings this configuration implies.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_model(self.model.clone())
            .with_max_tokens(self.max_tokens)
            .with_default_system_prompt(self.system_prompt.clone().unwrap_or_default())
            .with_require_persona(self.require_persona)
            .with_greeting(self.greeting)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let persona_source = if let Some(path) = args.instructions {
            PersonaSource::Instructions(PathBuf::from(path))
        } else if let Some(url) = args.instructions_url {
            PersonaSource::InstructionsUrl(url)
        } else if let Some(path) = args.persona_file {
            PersonaSource::File(PathBuf::from(path))
        } else {
            PersonaSource::Gateway
        };

        ChatConfig {
            gateway: args.gateway.unwrap_or_else(|| DEFAULT_GATEWAY.to_string()),
            model: args.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: args.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system_prompt: args.system,
            persona: args.persona,
            persona_source,
            require_persona: !args.no_persona,
            greeting: !args.no_greeting,
            use_keyring: !args.no_keyring,
            use_color: !args.no_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.gateway, "http://localhost:8000");
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.persona_source, PersonaSource::Gateway);
        assert!(config.require_persona);
        assert!(config.greeting);
        assert!(config.use_keyring);
        assert!(config.use_color);
        assert!(config.system_prompt.is_none());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            gateway: Some("https://chat.example.com".to_string()),
            model: Some("claude-haiku-4-5".to_string()),
            max_tokens: Some(512),
            persona: Some("sam".to_string()),
            persona_file: Some("personas.yaml".to_string()),
            system: Some("Be brief.".to_string()),
            no_persona: true,
            no_keyring: true,
            no_greeting: true,
            no_color: true,
            ..ChatArgs::default()
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.gateway, "https://chat.example.com");
        assert_eq!(config.model, "claude-haiku-4-5");
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.persona.as_deref(), Some("sam"));
        assert_eq!(
            config.persona_source,
            PersonaSource::File(PathBuf::from("personas.yaml"))
        );
        assert!(!config.require_persona);
        assert!(!config.greeting);
        assert!(!config.use_keyring);
        assert!(!config.use_color);
    }

    #[test]
    fn instructions_take_precedence() {
        let args = ChatArgs {
            instructions: Some("prompt.txt".to_string()),
            persona_file: Some("personas.yaml".to_string()),
            ..ChatArgs::default()
        };
        assert_eq!(
            ChatConfig::from(args).persona_source,
            PersonaSource::Instructions(PathBuf::from("prompt.txt"))
        );
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_gateway("http://127.0.0.1:9000")
            .with_model("claude-opus-4-1")
            .with_max_tokens(2048)
            .with_system_prompt("Test prompt".to_string())
            .with_persona("ria")
            .with_persona_source(PersonaSource::InstructionsUrl(
                "http://127.0.0.1:9000/prompt.txt".to_string(),
            ))
            .without_required_persona()
            .without_greeting()
            .without_keyring()
            .without_color();

        assert_eq!(config.gateway, "http://127.0.0.1:9000");
        assert_eq!(config.model, "claude-opus-4-1");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.persona.as_deref(), Some("ria"));
        assert!(!config.require_persona);
        assert!(!config.greeting);
        assert!(!config.use_keyring);
        assert!(!config.use_color);
    }

    #[test]
    fn session_config_follows_chat_config() {
        let session = ChatConfig::new()
            .with_max_tokens(300)
            .with_system_prompt("Fallback".to_string())
            .session_config();
        assert_eq!(session.max_tokens, 300);
        assert_eq!(session.default_system_prompt, "Fallback");
        assert!(session.require_persona);
        assert!(session.greeting);
    }
}
