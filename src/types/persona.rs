use serde::{Deserialize, Deserializer, Serialize};

/// A directory entry describing a selectable persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonaSummary {
    /// Stable identifier used to fetch the full profile.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Presenting condition, for display.
    #[serde(default)]
    pub condition: String,

    /// Age, for display.  Accepts numbers or strings on the wire.
    #[serde(default, deserialize_with = "lenient_text")]
    pub age: String,

    /// Short background, for display.
    #[serde(default)]
    pub background: String,
}

/// The response of the persona listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonaListResponse {
    /// All personas the gateway offers.
    #[serde(default)]
    pub personalities: Vec<PersonaSummary>,
}

/// A fully loaded persona: the display fields plus the instruction text that
/// conditions the remote model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonaProfile {
    /// Stable identifier.
    #[serde(default)]
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Age, for display.
    #[serde(default, deserialize_with = "lenient_text")]
    pub age: String,

    /// Presenting condition, for display.
    #[serde(default)]
    pub condition: String,

    /// Short background, for display.
    #[serde(default)]
    pub background: String,

    /// Instruction text injected as the request's `system` field.
    #[serde(
        rename = "systemPrompt",
        alias = "system_prompt",
        alias = "personality",
        default
    )]
    pub system_prompt: String,
}

impl PersonaSummary {
    /// One-line description for pickers: `Name (age) - condition`.
    pub fn describe(&self) -> String {
        let mut line = self.name.clone();
        if !self.age.is_empty() {
            line.push_str(&format!(" ({})", self.age));
        }
        if !self.condition.is_empty() {
            line.push_str(&format!(" - {}", self.condition));
        }
        line
    }
}

impl PersonaProfile {
    /// Create a profile with only an id, name and instruction text.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            system_prompt: system_prompt.into(),
            ..Self::default()
        }
    }

    /// Set the age.
    pub fn with_age(mut self, age: impl Into<String>) -> Self {
        self.age = age.into();
        self
    }

    /// Set the condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Set the background.
    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    /// Uppercased first letter of the name, used as an avatar.
    pub fn initial(&self) -> char {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or('?')
    }

    /// The name to show for this persona's turns.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Client"
        } else {
            &self.name
        }
    }

    /// The directory entry for this profile.
    pub fn summary(&self) -> PersonaSummary {
        PersonaSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            condition: self.condition.clone(),
            age: self.age.clone(),
            background: self.background.clone(),
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Str(String),
        Int(i64),
        Float(f64),
        Null(()),
    }

    Ok(match Text::deserialize(deserializer)? {
        Text::Str(s) => s,
        Text::Int(i) => i.to_string(),
        Text::Float(f) => f.to_string(),
        Text::Null(()) => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_parses_numeric_age() {
        let body = r#"{"personalities":[
            {"id":"sam","name":"Sam","condition":"Social anxiety","age":28,"background":"Graduate student"},
            {"id":"ria","name":"Ria","condition":"Insomnia","age":"41","background":"Nurse"}
        ]}"#;
        let listing: PersonaListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(listing.personalities.len(), 2);
        assert_eq!(listing.personalities[0].age, "28");
        assert_eq!(listing.personalities[1].age, "41");
        assert_eq!(
            listing.personalities[0].describe(),
            "Sam (28) - Social anxiety"
        );
    }

    #[test]
    fn detail_accepts_prompt_aliases() {
        for field in ["systemPrompt", "system_prompt", "personality"] {
            let body = format!(r#"{{"id":"sam","name":"Sam","{field}":"You are Sam."}}"#);
            let profile: PersonaProfile = serde_json::from_str(&body).unwrap();
            assert_eq!(profile.system_prompt, "You are Sam.", "field {field}");
        }
    }

    #[test]
    fn initial_is_uppercase() {
        assert_eq!(PersonaProfile::new("a", "alex", "").initial(), 'A');
        assert_eq!(PersonaProfile::new("a", "", "").initial(), '?');
    }

    #[test]
    fn unnamed_persona_is_client() {
        assert_eq!(PersonaProfile::new("a", "", "").display_name(), "Client");
        assert_eq!(PersonaProfile::new("a", "Ria", "").display_name(), "Ria");
    }

    #[test]
    fn summary_copies_display_fields() {
        let profile = PersonaProfile::new("sam", "Sam", "prompt")
            .with_age("28")
            .with_condition("Social anxiety")
            .with_background("Graduate student");
        let summary = profile.summary();
        assert_eq!(summary.id, "sam");
        assert_eq!(summary.background, "Graduate student");
    }
}
