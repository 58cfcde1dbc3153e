//! Where personas come from.
//!
//! The session controller only ever sees a [`PersonaProfile`]; this module
//! supplies them.  [`HttpPersonaDirectory`] talks to the gateway's listing and
//! detail endpoints, [`YamlPersonaDirectory`] reads a local file, and
//! [`FixedInstructions`] wraps a single instruction text as a one-entry
//! directory for deployments without persona switching.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use reqwest::StatusCode;
use time::OffsetDateTime;
use tracing::{debug, warn};
use url::Url;

use crate::client::{
    RemoteChatClient, build_http_client, gateway_root, process_error_response, transport_error,
};
use crate::error::{Error, Result};
use crate::observability::{PERSONA_REQUESTS, PERSONA_REQUEST_ERRORS};
use crate::types::{PersonaListResponse, PersonaProfile, PersonaSummary};

/// Path of the persona listing, relative to the gateway root.
pub const PERSONA_LIST_ENDPOINT: &str = "api/personalities";

/// Path prefix of a single persona; the id is appended as one path segment.
pub const PERSONA_DETAIL_ENDPOINT: &str = "api/personality";

/// Identifier of the single persona a [`FixedInstructions`] source serves.
pub const FIXED_PERSONA_ID: &str = "default";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opening lines a persona uses when a conversation starts.
pub const GREETINGS: [&str; 5] = [
    "Hello... I'm here because someone suggested I should talk to someone. I'm not really sure how this works.",
    "Hi. I was told this might help, though I'm honestly not sure about any of this.",
    "Hello. I'm here because I think I need to talk to someone about what I've been going through.",
    "Hi there. I'm nervous about being here, but I know I need to try something different.",
    "Hello. I decided to come here because things have been really difficult lately.",
];

/// Pick an opening line using the clock as the source of variety.
pub fn greeting_for(at: OffsetDateTime) -> &'static str {
    GREETINGS[at.nanosecond() as usize % GREETINGS.len()]
}

/// A source of personas.
#[async_trait]
pub trait PersonaDirectory: Send + Sync {
    /// Summaries of every persona on offer.
    async fn list(&self) -> Result<Vec<PersonaSummary>>;

    /// The full profile, including its system prompt.
    async fn load(&self, id: &str) -> Result<PersonaProfile>;
}

////////////////////////////////////////// HttpPersonaDirectory //////////////////////////////////////////

/// Personas served by the gateway.
#[derive(Debug, Clone)]
pub struct HttpPersonaDirectory {
    client: ReqwestClient,
    gateway: Url,
}

impl HttpPersonaDirectory {
    pub fn new(gateway: &str) -> Result<Self> {
        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT)?,
            gateway: gateway_root(gateway)?,
        })
    }

    /// Share the HTTP client and gateway of an existing chat client.
    pub fn from_client(client: &RemoteChatClient) -> Self {
        Self {
            client: client.http().clone(),
            gateway: client.gateway().clone(),
        }
    }

    fn detail_url(&self, id: &str) -> Result<Url> {
        let mut url = self.gateway.clone();
        url.path_segments_mut()
            .map_err(|_| Error::url(format!("{} cannot be a base URL", self.gateway), None))?
            .pop_if_empty()
            .extend(PERSONA_DETAIL_ENDPOINT.split('/'))
            .push(id);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        PERSONA_REQUESTS.click();
        debug!(url = %url, "fetching persona data");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(process_error_response(response).await);
        }
        let body = response.text().await.map_err(transport_error)?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl PersonaDirectory for HttpPersonaDirectory {
    async fn list(&self) -> Result<Vec<PersonaSummary>> {
        let url = self.gateway.join(PERSONA_LIST_ENDPOINT)?;
        match self.get_json::<PersonaListResponse>(url).await {
            Ok(listing) => Ok(listing.personalities),
            Err(err) => {
                PERSONA_REQUEST_ERRORS.click();
                warn!(error = %err, "failed to list personas");
                Err(err)
            }
        }
    }

    async fn load(&self, id: &str) -> Result<PersonaProfile> {
        let url = self.detail_url(id)?;
        match self.get_json::<PersonaProfile>(url).await {
            Ok(mut profile) => {
                if profile.id.is_empty() {
                    profile.id = id.to_string();
                }
                Ok(profile)
            }
            Err(err) => {
                PERSONA_REQUEST_ERRORS.click();
                warn!(id, error = %err, "failed to load persona");
                if err.status_code() == Some(StatusCode::NOT_FOUND.as_u16()) {
                    Err(Error::persona_not_found(id))
                } else {
                    Err(err)
                }
            }
        }
    }
}

////////////////////////////////////////// YamlPersonaDirectory //////////////////////////////////////////

/// Personas defined in a YAML list.
///
/// ```yaml
/// - id: anxious-student
///   name: Sam
///   age: 20
///   condition: Generalized anxiety
///   background: Second-year student
///   systemPrompt: You are Sam...
/// ```
///
/// ```
/// use confidant::{PersonaDirectory, YamlPersonaDirectory};
///
/// # tokio_test::block_on(async {
/// let directory =
///     YamlPersonaDirectory::parse("- id: sam\n  name: Sam\n  systemPrompt: You are Sam.\n")
///         .unwrap();
/// let sam = directory.load("sam").await.unwrap();
/// assert_eq!(sam.system_prompt, "You are Sam.");
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct YamlPersonaDirectory {
    personas: Vec<PersonaProfile>,
}

impl YamlPersonaDirectory {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("could not read {}", path.display()), e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let personas: Vec<PersonaProfile> = serde_yaml::from_str(text)?;
        if let Some(unnamed) = personas.iter().find(|p| p.id.is_empty()) {
            return Err(Error::validation(format!(
                "persona {:?} has no id",
                unnamed.name
            )));
        }
        Ok(Self { personas })
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

#[async_trait]
impl PersonaDirectory for YamlPersonaDirectory {
    async fn list(&self) -> Result<Vec<PersonaSummary>> {
        Ok(self.personas.iter().map(PersonaProfile::summary).collect())
    }

    async fn load(&self, id: &str) -> Result<PersonaProfile> {
        self.personas
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Error::persona_not_found(id))
    }
}

//////////////////////////////////////////// FixedInstructions ////////////////////////////////////////////

/// One instruction text used for every conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedInstructions {
    profile: PersonaProfile,
}

impl FixedInstructions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            profile: PersonaProfile::new(FIXED_PERSONA_ID, "", text),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("could not read {}", path.display()), e))?;
        Ok(Self::new(text.trim()))
    }

    /// Fetch the instruction text once from `url`.
    pub async fn fetch(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        let client = build_http_client(DEFAULT_TIMEOUT)?;
        PERSONA_REQUESTS.click();
        let response = client.get(url).send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            PERSONA_REQUEST_ERRORS.click();
            return Err(process_error_response(response).await);
        }
        let text = response.text().await.map_err(transport_error)?;
        Ok(Self::new(text.trim()))
    }

    /// The unnamed persona carrying the instruction text.
    pub fn profile(&self) -> &PersonaProfile {
        &self.profile
    }

    pub fn text(&self) -> &str {
        &self.profile.system_prompt
    }
}

#[async_trait]
impl PersonaDirectory for FixedInstructions {
    async fn list(&self) -> Result<Vec<PersonaSummary>> {
        Ok(vec![self.profile.summary()])
    }

    async fn load(&self, id: &str) -> Result<PersonaProfile> {
        if id == FIXED_PERSONA_ID {
            Ok(self.profile.clone())
        } else {
            Err(Error::persona_not_found(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const PERSONAS: &str = r#"
- id: anxious-student
  name: Sam
  age: 20
  condition: Generalized anxiety
  background: Second-year student
  systemPrompt: You are Sam, a student who worries.
- id: grieving-parent
  name: Morgan
  age: "52"
  condition: Grief
  background: Lost a partner last spring
  personality: You are Morgan.
"#;

    #[tokio::test]
    async fn yaml_directory_lists_and_loads() {
        let directory = YamlPersonaDirectory::parse(PERSONAS).unwrap();
        assert_eq!(directory.len(), 2);

        let listing = directory.list().await.unwrap();
        assert_eq!(listing[0].name, "Sam");
        assert_eq!(listing[0].age, "20");
        assert_eq!(listing[1].id, "grieving-parent");

        let morgan = directory.load("grieving-parent").await.unwrap();
        assert_eq!(morgan.system_prompt, "You are Morgan.");
    }

    #[tokio::test]
    async fn yaml_directory_unknown_id() {
        let directory = YamlPersonaDirectory::parse(PERSONAS).unwrap();
        let err = directory.load("nobody").await.unwrap_err();
        assert!(matches!(err, Error::PersonaNotFound { ref id } if id == "nobody"));
    }

    #[test]
    fn yaml_directory_requires_ids() {
        let err = YamlPersonaDirectory::parse("- name: Nobody\n  systemPrompt: hi\n").unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn fixed_instructions_is_single_entry() {
        let fixed = FixedInstructions::new("Be a gentle client.");
        assert_eq!(fixed.text(), "Be a gentle client.");
        assert_eq!(fixed.list().await.unwrap().len(), 1);
        assert_eq!(
            fixed.load(FIXED_PERSONA_ID).await.unwrap().system_prompt,
            "Be a gentle client."
        );
        assert!(fixed.load("other").await.is_err());
    }

    #[test]
    fn detail_url_escapes_id() {
        let directory = HttpPersonaDirectory::new("http://localhost:3001/app").unwrap();
        assert_eq!(
            directory.detail_url("a b/c").unwrap().as_str(),
            "http://localhost:3001/app/api/personality/a%20b%2Fc"
        );
    }

    #[test]
    fn greetings_cycle_with_clock() {
        let at = datetime!(2025-05-14 09:05:00 UTC);
        assert_eq!(greeting_for(at), GREETINGS[0]);
        assert_eq!(
            greeting_for(at.replace_nanosecond(3).unwrap()),
            GREETINGS[3]
        );
    }
}
