//! The bearer credential and where it is kept between runs.

use std::sync::Mutex;

use keyring::Entry;
use tracing::debug;

use crate::error::{Error, Result};

/// Every accepted credential starts with this prefix.
pub const CREDENTIAL_PREFIX: &str = "sk-ant-";

/// The key the credential is stored under.
pub const CREDENTIAL_KEY: &str = "claude_api_key";

const KEYRING_SERVICE: &str = "confidant";

/// A format-validated bearer credential.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    /// Validate raw user input.  Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("Please enter a valid API key."));
        }
        if !trimmed.starts_with(CREDENTIAL_PREFIX) {
            return Err(Error::validation(format!(
                "Invalid API key format. API keys should start with \"{CREDENTIAL_PREFIX}\"."
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The secret itself, for placing on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCredential(<redacted>)")
    }
}

/// An external key/value slot holding the credential between runs.
pub trait CredentialStore: Send + Sync {
    /// Read the stored credential, if any.
    fn load(&self) -> Result<Option<String>>;

    /// Persist a credential, replacing any previous one.
    fn save(&self, secret: &str) -> Result<()>;

    /// Forget the stored credential.  Erasing an empty slot is not an error.
    fn erase(&self) -> Result<()>;
}

/// A process-local store.  Used in tests and with `--no-keyring`.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `secret`.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(secret.into())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.lock().clone())
    }

    fn save(&self, secret: &str) -> Result<()> {
        *self.lock() = Some(secret.to_string());
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}

/// A store backed by the platform keyring.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
    key: String,
}

impl KeyringCredentialStore {
    /// The default slot: service `confidant`, key [`CREDENTIAL_KEY`].
    pub fn new() -> Self {
        Self::with_names(KEYRING_SERVICE, CREDENTIAL_KEY)
    }

    pub fn with_names(service: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            key: key.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Ok(Entry::new(&self.service, &self.key)?)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                debug!(service = %self.service, key = %self.key, "credential loaded");
                Ok(Some(secret))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, key = %self.key, "no stored credential");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, secret: &str) -> Result<()> {
        self.entry()?.set_password(secret)?;
        debug!(service = %self.service, key = %self.key, "credential saved");
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, key = %self.key, "credential erased");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_prefixed_key() {
        let credential = SessionCredential::parse("  sk-ant-abc123\n").unwrap();
        assert_eq!(credential.expose(), "sk-ant-abc123");
    }

    #[test]
    fn parse_rejects_empty() {
        let err = SessionCredential::parse("   ").unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn parse_rejects_wrong_prefix() {
        let err = SessionCredential::parse("sk-proj-123").unwrap_err();
        assert!(err.message().contains("sk-ant-"));
    }

    #[test]
    fn debug_is_redacted() {
        let credential = SessionCredential::parse("sk-ant-secret").unwrap();
        assert!(!format!("{credential:?}").contains("secret"));
    }

    #[test]
    fn memory_store_lifecycle() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save("sk-ant-1").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("sk-ant-1"));
        store.erase().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.erase().unwrap();
    }
}
