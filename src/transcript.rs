//! The ordered, append-only log of conversation turns.
//!
//! A [`TranscriptStore`] is the single source of truth for both what the user
//! sees and what is sent on the wire: [`TranscriptStore::to_messages`] reduces
//! every entry to `{role, content}` in append order.  Entries cannot be edited
//! or removed individually; the only removal path is [`TranscriptStore::reset`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{MessageParam, MessageRole};

/// Why an entry was appended.  Display-only; never sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Text typed by the user or produced by the remote model.
    Turn,
    /// A persona's opening line at the start of a conversation.
    Greeting,
    /// A user-facing failure notice in place of a model reply.
    Notice,
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    role: MessageRole,
    content: String,
    kind: EntryKind,
    #[serde(with = "crate::utils::time")]
    created_at: OffsetDateTime,
}

impl TranscriptEntry {
    /// Create an entry stamped with the current time.
    pub fn new(role: MessageRole, kind: EntryKind, content: impl Into<String>) -> Self {
        Self::at(role, kind, content, crate::utils::time::now())
    }

    /// Create an entry with an explicit timestamp.
    pub fn at(
        role: MessageRole,
        kind: EntryKind,
        content: impl Into<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            kind,
            created_at,
        }
    }

    /// A user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, EntryKind::Turn, content)
    }

    /// An assistant reply.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, EntryKind::Turn, content)
    }

    /// An assistant-role failure notice.
    pub fn notice(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, EntryKind::Notice, content)
    }

    /// An assistant-role opening line.
    pub fn greeting(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, EntryKind::Greeting, content)
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn is_notice(&self) -> bool {
        self.kind == EntryKind::Notice
    }

    /// Reduce to the wire shape.
    pub fn to_message(&self) -> MessageParam {
        MessageParam::new(self.role, self.content.clone())
    }
}

/// Characters above which a draft message earns a warning.
pub const SOFT_LENGTH_LIMIT: usize = 800;

/// Characters above which a draft message is flagged as too long.
pub const HARD_LENGTH_LIMIT: usize = 900;

/// Advisory length feedback for a message being composed.  Never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthHint {
    Normal,
    Warning,
    Limit,
}

impl LengthHint {
    pub fn for_text(text: &str) -> Self {
        let length = text.chars().count();
        if length > HARD_LENGTH_LIMIT {
            LengthHint::Limit
        } else if length > SOFT_LENGTH_LIMIT {
            LengthHint::Warning
        } else {
            LengthHint::Normal
        }
    }
}

/// Append-only transcript.
#[derive(Debug, Clone, Default)]
pub struct TranscriptStore {
    entries: Vec<TranscriptEntry>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry at the end.
    pub fn append(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    /// All entries in append order.
    pub fn all(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Remove every entry.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    /// The wire history: every entry reduced to `{role, content}`.
    pub fn to_messages(&self) -> Vec<MessageParam> {
        self.entries.iter().map(TranscriptEntry::to_message).collect()
    }
}
