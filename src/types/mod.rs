// Public modules
pub mod chat_request;
pub mod chat_response;
pub mod error_response;
pub mod message_param;
pub mod persona;

// Re-exports
pub use chat_request::{ChatRequest, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
pub use chat_response::{ChatResponse, ContentBlock, Usage};
pub use error_response::{ErrorObject, ErrorResponse};
pub use message_param::{MessageParam, MessageRole};
pub use persona::{PersonaListResponse, PersonaProfile, PersonaSummary};
