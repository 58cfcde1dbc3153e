// Public modules
pub mod chat;
pub mod classify;
pub mod client;
pub mod client_logger;
pub mod credential;
pub mod error;
pub mod observability;
pub mod persona;
pub mod session;
pub mod transcript;
pub mod types;
pub mod utils;

// Re-exports
pub use classify::{Classification, FailureCategory, Recovery, classify};
pub use client::{CHAT_ENDPOINT, ChatBackend, RemoteChatClient};
pub use client_logger::ClientLogger;
pub use credential::{
    CREDENTIAL_KEY, CREDENTIAL_PREFIX, CredentialStore, KeyringCredentialStore,
    MemoryCredentialStore, SessionCredential,
};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use persona::{
    FixedInstructions, HttpPersonaDirectory, PersonaDirectory, YamlPersonaDirectory,
};
pub use session::{
    SessionConfig, SessionController, SessionState, SessionStats, SessionStatus, SubmitOutcome,
};
pub use transcript::{EntryKind, LengthHint, TranscriptEntry, TranscriptStore};
pub use types::*;
