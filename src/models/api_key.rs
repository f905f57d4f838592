use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::store::Record;

use super::{decode, encode, parse_datetime, Entity};

/// LLM vendors a key can be registered for. At most one key per provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Claude,
    Gemini,
    Cohere,
    Mistral,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::OpenAi,
        Provider::Claude,
        Provider::Gemini,
        Provider::Cohere,
        Provider::Mistral,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
            Provider::Gemini => "gemini",
            Provider::Cohere => "cohere",
            Provider::Mistral => "mistral",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Claude => "Claude",
            Provider::Gemini => "Gemini",
            Provider::Cohere => "Cohere",
            Provider::Mistral => "Mistral",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| AppError::Validation(format!("unknown provider: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: i64,
    pub provider: Provider,
    #[serde(serialize_with = "serialize_masked")]
    pub key: String,
    pub is_active: bool,
    pub added_at: DateTime<Utc>,
}

impl ApiKey {
    /// The key with everything but a short prefix and the last four characters hidden.
    pub fn masked(&self) -> String {
        mask(&self.key)
    }
}

fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let prefix: String = chars[..3].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

fn serialize_masked<S>(key: &str, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&mask(key))
}

#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub provider: Provider,
    pub key: String,
}

#[derive(Debug, Clone, Default)]
pub struct ApiKeyPatch {
    pub key: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ApiKeyFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<Provider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(rename = "isActive", skip_serializing_if = "Option::is_none")]
    is_active: Option<bool>,
    #[serde(rename = "addedAt", skip_serializing_if = "Option::is_none")]
    added_at: Option<String>,
}

impl Entity for ApiKey {
    const NAME: &'static str = "apikey";
    const LABEL: &'static str = "API key";
    const FIELDS: &'static [&'static str] = &["provider", "key", "isActive", "addedAt"];

    type Draft = NewApiKey;
    type Patch = ApiKeyPatch;

    fn from_record(record: Record) -> Result<Self> {
        let envelope = decode::<ApiKeyFields>(record)?;
        let created_at = envelope.created_at();
        let id = envelope.id;
        let fields = envelope.fields;
        Ok(ApiKey {
            id,
            provider: fields
                .provider
                .ok_or_else(|| AppError::store(Self::NAME, format!("key {} has no provider", id)))?,
            key: fields.key.unwrap_or_default(),
            is_active: fields.is_active.unwrap_or(true),
            added_at: fields
                .added_at
                .as_deref()
                .and_then(parse_datetime)
                .unwrap_or(created_at),
        })
    }

    fn draft_record(draft: &NewApiKey) -> Result<Record> {
        encode(&ApiKeyFields {
            provider: Some(draft.provider),
            key: Some(draft.key.clone()),
            is_active: Some(true),
            added_at: Some(Utc::now().to_rfc3339()),
        })
    }

    fn patch_record(patch: &ApiKeyPatch) -> Result<Record> {
        encode(&ApiKeyFields {
            key: patch.key.clone(),
            is_active: patch.is_active,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(secret: &str) -> ApiKey {
        ApiKey {
            id: 1,
            provider: Provider::OpenAi,
            key: secret.to_string(),
            is_active: true,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_masked_hides_middle_of_key() {
        assert_eq!(key("sk-proj-1234567890abcd").masked(), "sk-...abcd");
        assert_eq!(key("short").masked(), "*****");
    }

    #[test]
    fn test_serialized_key_is_masked() {
        let json = serde_json::to_value(key("sk-proj-1234567890abcd")).unwrap();
        assert_eq!(json["key"], "sk-...abcd");
        assert_eq!(json["provider"], "openai");
    }

    #[test]
    fn test_provider_parses_ids() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("mistral".parse::<Provider>().unwrap(), Provider::Mistral);
        assert!("llama".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_serializes_as_id() {
        for provider in Provider::ALL {
            let json = serde_json::to_value(provider).unwrap();
            assert_eq!(json, serde_json::Value::from(provider.id()));
        }
    }
}
