//! The session controller.
//!
//! A [`SessionController`] owns everything a conversation needs: the
//! transcript, the active persona, the credential, and the busy gate that
//! keeps at most one request in flight.  Front ends drive it through
//! [`submit`](SessionController::submit), [`reset`](SessionController::reset)
//! and [`switch_persona`](SessionController::switch_persona); none of its
//! behavior depends on how the conversation is displayed.
//!
//! Every method takes `&self`.  State sits behind a mutex that is never held
//! across the remote call, so a second `submit` polled while the first is
//! waiting on the backend observes the gate and returns
//! [`SubmitOutcome::Busy`] without touching the transcript.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::classify::{Classification, FailureCategory, Recovery, classify};
use crate::client::ChatBackend;
use crate::credential::{CredentialStore, SessionCredential};
use crate::error::{Error, Result};
use crate::observability::{
    CREDENTIAL_RESETS, PERSONA_SWITCHES, SESSION_DROPPED_SUBMITS, SESSION_FAILURES_AUTH,
    SESSION_FAILURES_NETWORK, SESSION_FAILURES_OTHER, SESSION_FAILURES_RATE_LIMITED,
    SESSION_FAILURES_SERVER, SESSION_REPLIES, SESSION_TURN_DURATION,
};
use crate::persona::greeting_for;
use crate::transcript::{TranscriptEntry, TranscriptStore};
use crate::types::{
    ChatRequest, ChatResponse, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, MessageRole, PersonaProfile,
    Usage,
};

/// Static settings for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Model identifier placed on every request.
    pub model: String,
    /// Output cap placed on every request.
    pub max_tokens: u32,
    /// Instruction text used when no persona is active.
    pub default_system_prompt: String,
    /// Refuse to send until a persona has been selected.
    pub require_persona: bool,
    /// Open each new conversation with a persona greeting.
    pub greeting: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            default_system_prompt: String::new(),
            require_persona: false,
            greeting: false,
        }
    }
}

impl SessionConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_default_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.default_system_prompt = prompt.into();
        self
    }

    pub fn with_require_persona(mut self, require_persona: bool) -> Self {
        self.require_persona = require_persona;
        self
    }

    pub fn with_greeting(mut self, greeting: bool) -> Self {
        self.greeting = greeting;
        self
    }
}

/// Whether a request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
}

/// The indicator a front end shows next to the persona's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No credential is held.
    Offline,
    Online,
    /// A request is in flight.
    Typing,
    /// The last turn failed.  Cleared by the next reply or a reset.
    Error,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Offline => "Offline",
            SessionStatus::Online => "Online",
            SessionStatus::Typing => "Typing...",
            SessionStatus::Error => "Error",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What became of a call to [`SessionController::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The model replied; the text is now the last transcript entry.
    Replied(String),
    /// The call failed; the classified notice is now the last transcript entry.
    Failed(Classification),
    /// Another request was in flight.  Nothing changed.
    Busy,
    /// The text was empty after trimming.  Nothing changed.
    Empty,
    /// No credential is held; the front end should ask for one.
    NeedsCredential,
    /// A persona is required and none is active; the front end should offer one.
    NeedsPersona,
}

/// Aggregated stats for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: String,
    /// The active persona's name, if any.
    pub persona: Option<String>,
    /// Entries currently in the transcript.
    pub message_count: usize,
    /// Remote calls issued.
    pub total_requests: u64,
    /// Turns that produced a reply.
    pub replies: u64,
    /// Turns that ended in a notice.
    pub failures: u64,
    /// Token usage summed over every reply that reported it.
    pub total_usage: Usage,
    /// Token usage of the most recent reply, if reported.
    pub last_turn_usage: Option<Usage>,
}

#[derive(Debug, Default)]
struct Inner {
    transcript: TranscriptStore,
    persona: Option<PersonaProfile>,
    credential: Option<SessionCredential>,
    last_failed: bool,
    total_requests: u64,
    replies: u64,
    failures: u64,
    total_usage: Usage,
    last_turn_usage: Option<Usage>,
}

/// Holds the busy gate closed until dropped.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One conversation against one backend.
pub struct SessionController<B: ChatBackend> {
    backend: B,
    store: Arc<dyn CredentialStore>,
    config: SessionConfig,
    inner: Mutex<Inner>,
    busy: AtomicBool,
}

impl<B: ChatBackend> SessionController<B> {
    /// Create an idle session with an empty transcript, no persona, and no
    /// credential.  Call [`load_credential`](Self::load_credential) to pick up
    /// a stored one.
    pub fn new(backend: B, store: Arc<dyn CredentialStore>, config: SessionConfig) -> Self {
        Self {
            backend,
            store,
            config,
            inner: Mutex::new(Inner::default()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run one turn.
    ///
    /// Guards are checked in order: non-empty text, a clear gate, a held
    /// credential, and an active persona when one is required.  A failed
    /// guard leaves the transcript untouched.  Otherwise the user entry is
    /// appended, the whole transcript is sent, and either the reply or a
    /// classified notice is appended before the gate reopens.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Empty;
        }
        let Some(_gate) = BusyGuard::claim(&self.busy) else {
            SESSION_DROPPED_SUBMITS.click();
            debug!("submit dropped: request already in flight");
            return SubmitOutcome::Busy;
        };

        let (request, sent) = {
            let mut inner = self.lock();
            let Some(credential) = inner.credential.clone() else {
                debug!("submit refused: no credential");
                return SubmitOutcome::NeedsCredential;
            };
            if self.config.require_persona && inner.persona.is_none() {
                debug!("submit refused: no persona");
                return SubmitOutcome::NeedsPersona;
            }
            inner.transcript.append(TranscriptEntry::user(text));
            inner.total_requests += 1;
            let system = match &inner.persona {
                Some(persona) => persona.system_prompt.clone(),
                None => self.config.default_system_prompt.clone(),
            };
            let request =
                ChatRequest::new(system, inner.transcript.to_messages(), credential.expose())
                    .with_model(self.config.model.clone())
                    .with_max_tokens(self.config.max_tokens);
            (request, credential)
        };

        debug!(messages = request.messages.len(), "submitting turn");
        let start = Instant::now();
        let result = self.backend.send(&request).await;
        SESSION_TURN_DURATION.add(start.elapsed().as_secs_f64());

        match result.and_then(|response| accept(&response)) {
            Ok((reply, usage)) => self.record_reply(reply, usage),
            Err(err) => self.record_failure(&err, &sent),
        }
    }

    fn record_reply(&self, reply: String, usage: Option<Usage>) -> SubmitOutcome {
        SESSION_REPLIES.click();
        let mut inner = self.lock();
        inner.transcript.append(TranscriptEntry::assistant(reply.clone()));
        inner.replies += 1;
        inner.last_failed = false;
        inner.last_turn_usage = usage;
        if let Some(usage) = usage {
            inner.total_usage = inner.total_usage + usage;
        }
        SubmitOutcome::Replied(reply)
    }

    /// Post the notice for a failed turn.  A credential reset only applies
    /// while `sent` is still the held credential; a key entered mid-flight
    /// is kept.
    fn record_failure(&self, err: &Error, sent: &SessionCredential) -> SubmitOutcome {
        let classification = classify(err);
        match classification.category {
            FailureCategory::Auth => SESSION_FAILURES_AUTH.click(),
            FailureCategory::RateLimited => SESSION_FAILURES_RATE_LIMITED.click(),
            FailureCategory::Network => SESSION_FAILURES_NETWORK.click(),
            FailureCategory::Server => SESSION_FAILURES_SERVER.click(),
            FailureCategory::BadRequest
            | FailureCategory::UnknownFormat
            | FailureCategory::Unknown => SESSION_FAILURES_OTHER.click(),
        };
        warn!(
            category = %classification.category,
            status = ?err.status_code(),
            error = %err,
            "turn failed"
        );

        let mut inner = self.lock();
        inner
            .transcript
            .append(TranscriptEntry::notice(classification.user_message));
        inner.failures += 1;
        inner.last_failed = true;
        if let Recovery::ResetCredential { .. } = classification.recovery {
            if inner.credential.as_ref() == Some(sent) {
                CREDENTIAL_RESETS.click();
                inner.credential = None;
                drop(inner);
                if let Err(err) = self.store.erase() {
                    warn!(error = %err, "could not erase stored credential");
                }
            } else {
                debug!("credential replaced while in flight; keeping it");
            }
        }
        SubmitOutcome::Failed(classification)
    }

    /// Start a new conversation with the current persona.
    ///
    /// Fails with [`Error::Busy`] while a request is in flight.
    pub fn reset(&self) -> Result<()> {
        let _gate = BusyGuard::claim(&self.busy).ok_or(Error::Busy)?;
        let mut inner = self.lock();
        inner.transcript.reset();
        inner.last_failed = false;
        self.greet(&mut inner);
        debug!("session cleared");
        Ok(())
    }

    /// Replace the active persona and start a new conversation.
    ///
    /// Fails with [`Error::Busy`] while a request is in flight.
    pub fn switch_persona(&self, persona: PersonaProfile) -> Result<()> {
        let _gate = BusyGuard::claim(&self.busy).ok_or(Error::Busy)?;
        PERSONA_SWITCHES.click();
        info!(id = %persona.id, name = %persona.name, "persona selected");
        let mut inner = self.lock();
        inner.persona = Some(persona);
        inner.transcript.reset();
        inner.last_failed = false;
        self.greet(&mut inner);
        Ok(())
    }

    fn greet(&self, inner: &mut Inner) {
        if self.config.greeting && inner.persona.is_some() {
            let line = greeting_for(crate::utils::time::now());
            inner.transcript.append(TranscriptEntry::greeting(line));
        }
    }

    /// Pick up a credential from the store.  Returns whether one was found.
    ///
    /// A stored value that no longer passes validation is ignored.
    pub fn load_credential(&self) -> Result<bool> {
        let Some(raw) = self.store.load()? else {
            return Ok(false);
        };
        match SessionCredential::parse(&raw) {
            Ok(credential) => {
                self.lock().credential = Some(credential);
                debug!("stored credential loaded");
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, "ignoring malformed stored credential");
                Ok(false)
            }
        }
    }

    /// Validate, persist, and adopt a credential typed by the user.
    pub fn set_credential(&self, raw: &str) -> Result<()> {
        let credential = SessionCredential::parse(raw)?;
        self.store.save(credential.expose())?;
        let mut inner = self.lock();
        inner.credential = Some(credential);
        inner.last_failed = false;
        info!("credential accepted");
        Ok(())
    }

    /// Forget the credential in memory and in the store.
    pub fn clear_credential(&self) -> Result<()> {
        self.lock().credential = None;
        self.store.erase()
    }

    pub fn has_credential(&self) -> bool {
        self.lock().credential.is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.busy.load(Ordering::Acquire) {
            SessionState::Sending
        } else {
            SessionState::Idle
        }
    }

    pub fn status(&self) -> SessionStatus {
        let inner = self.lock();
        if inner.credential.is_none() {
            SessionStatus::Offline
        } else if self.busy.load(Ordering::Acquire) {
            SessionStatus::Typing
        } else if inner.last_failed {
            SessionStatus::Error
        } else {
            SessionStatus::Online
        }
    }

    /// The active persona, if any.
    pub fn persona(&self) -> Option<PersonaProfile> {
        self.lock().persona.clone()
    }

    /// The name to show beside entries written by `role`.
    pub fn participant_name(&self, role: MessageRole) -> String {
        match role {
            MessageRole::User => String::from("You"),
            MessageRole::Assistant => self
                .lock()
                .persona
                .as_ref()
                .map(|p| p.display_name().to_string())
                .unwrap_or_else(|| String::from("Client")),
        }
    }

    /// A snapshot of every entry in append order.
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.lock().transcript.all().to_vec()
    }

    /// Number of entries in the transcript.
    pub fn message_count(&self) -> usize {
        self.lock().transcript.len()
    }

    pub fn stats(&self) -> SessionStats {
        let inner = self.lock();
        SessionStats {
            model: self.config.model.clone(),
            persona: inner.persona.as_ref().map(|p| p.display_name().to_string()),
            message_count: inner.transcript.len(),
            total_requests: inner.total_requests,
            replies: inner.replies,
            failures: inner.failures,
            total_usage: inner.total_usage,
            last_turn_usage: inner.last_turn_usage,
        }
    }
}

fn accept(response: &ChatResponse) -> Result<(String, Option<Usage>)> {
    let reply = response.reply()?;
    Ok((reply.to_string(), response.usage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::MemoryCredentialStore;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ChatBackend for Echo {
        async fn send(&self, request: &ChatRequest) -> Result<ChatResponse> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(ChatResponse::text(format!("echo: {last}")))
        }
    }

    fn session(config: SessionConfig) -> SessionController<Echo> {
        SessionController::new(Echo, Arc::new(MemoryCredentialStore::new()), config)
    }

    #[test]
    fn busy_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let first = BusyGuard::claim(&flag);
        assert!(first.is_some());
        assert!(BusyGuard::claim(&flag).is_none());
        drop(first);
        assert!(BusyGuard::claim(&flag).is_some());
    }

    #[test]
    fn status_tracks_credential() {
        let session = session(SessionConfig::default());
        assert_eq!(session.status(), SessionStatus::Offline);
        session.set_credential("sk-ant-test").unwrap();
        assert_eq!(session.status(), SessionStatus::Online);
        assert_eq!(session.state(), SessionState::Idle);
        session.clear_credential().unwrap();
        assert_eq!(session.status(), SessionStatus::Offline);
    }

    #[tokio::test]
    async fn whitespace_is_empty() {
        let session = session(SessionConfig::default());
        session.set_credential("sk-ant-test").unwrap();
        assert_eq!(session.submit("  \n\t").await, SubmitOutcome::Empty);
        assert_eq!(session.message_count(), 0);
    }

    #[tokio::test]
    async fn submitted_text_is_trimmed() {
        let session = session(SessionConfig::default());
        session.set_credential("sk-ant-test").unwrap();
        let outcome = session.submit("  hello  ").await;
        assert_eq!(outcome, SubmitOutcome::Replied("echo: hello".to_string()));
        assert_eq!(session.transcript()[0].content(), "hello");
    }

    #[tokio::test]
    async fn greeting_follows_reset_only_with_persona() {
        let session = session(SessionConfig::default().with_greeting(true));
        session.reset().unwrap();
        assert_eq!(session.message_count(), 0);

        session
            .switch_persona(PersonaProfile::new("sam", "Sam", "You are Sam."))
            .unwrap();
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role(), MessageRole::Assistant);
        assert!(crate::persona::GREETINGS.contains(&transcript[0].content()));
    }

    #[test]
    fn participant_names() {
        let session = session(SessionConfig::default());
        assert_eq!(session.participant_name(MessageRole::User), "You");
        assert_eq!(session.participant_name(MessageRole::Assistant), "Client");
        session
            .switch_persona(PersonaProfile::new("ria", "Ria", ""))
            .unwrap();
        assert_eq!(session.participant_name(MessageRole::Assistant), "Ria");
    }
}
