use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{OrderBy, Record};

use super::{decode, encode, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BonusType {
    Templates,
    Training,
}

impl fmt::Display for BonusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BonusType::Templates => write!(f, "Templates"),
            BonusType::Training => write!(f, "Training"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusContent {
    pub target_gap: String,
    pub components: Vec<String>,
}

/// A bonus offer, either freshly generated or loaded from the store.
///
/// Generated bonuses carry a synthetic `bonus_<millis>_<index>` id until they
/// are saved; stored ones use the record id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bonus {
    pub id: String,
    pub product_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub bonus_type: BonusType,
    pub value: String,
    pub description: String,
    pub content: BonusContent,
    pub created_at: DateTime<Utc>,
}

impl Bonus {
    /// Record id, if this bonus has been saved.
    pub fn record_id(&self) -> Option<i64> {
        self.id.parse().ok()
    }
}

#[derive(Debug, Clone)]
pub struct NewBonus {
    pub product_id: String,
    pub title: String,
    pub bonus_type: BonusType,
    pub value: String,
    pub description: String,
    pub content: BonusContent,
}

impl From<&Bonus> for NewBonus {
    fn from(bonus: &Bonus) -> Self {
        Self {
            product_id: bonus.product_id.clone(),
            title: bonus.title.clone(),
            bonus_type: bonus.bonus_type,
            value: bonus.value.clone(),
            description: bonus.description.clone(),
            content: bonus.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BonusPatch {
    pub title: Option<String>,
    pub bonus_type: Option<BonusType>,
    pub value: Option<String>,
    pub description: Option<String>,
    pub content: Option<BonusContent>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BonusFields {
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(rename = "productId", skip_serializing_if = "Option::is_none")]
    product_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    bonus_type: Option<BonusType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// JSON-encoded [`BonusContent`].
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

fn encode_content(content: &BonusContent) -> Result<String> {
    Ok(serde_json::to_string(content)?)
}

impl Entity for Bonus {
    const NAME: &'static str = "bonus";
    const LABEL: &'static str = "bonus";
    const FIELDS: &'static [&'static str] =
        &["Name", "productId", "type", "value", "description", "content"];

    type Draft = NewBonus;
    type Patch = BonusPatch;

    fn order_by() -> Vec<OrderBy> {
        OrderBy::newest_first()
    }

    fn from_record(record: Record) -> Result<Self> {
        let envelope = decode::<BonusFields>(record)?;
        let created_at = envelope.created_at();
        let fields = envelope.fields;
        let content = match fields.content.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)?,
            _ => BonusContent {
                target_gap: String::new(),
                components: Vec::new(),
            },
        };
        Ok(Bonus {
            id: envelope.id.to_string(),
            product_id: fields.product_id.unwrap_or_default(),
            title: fields.title.unwrap_or_default(),
            bonus_type: fields.bonus_type.unwrap_or(BonusType::Templates),
            value: fields.value.unwrap_or_default(),
            description: fields.description.unwrap_or_default(),
            content,
            created_at,
        })
    }

    fn draft_record(draft: &NewBonus) -> Result<Record> {
        encode(&BonusFields {
            title: Some(draft.title.clone()),
            product_id: Some(draft.product_id.clone()),
            bonus_type: Some(draft.bonus_type),
            value: Some(draft.value.clone()),
            description: Some(draft.description.clone()),
            content: Some(encode_content(&draft.content)?),
        })
    }

    fn patch_record(patch: &BonusPatch) -> Result<Record> {
        encode(&BonusFields {
            title: patch.title.clone(),
            bonus_type: patch.bonus_type,
            value: patch.value.clone(),
            description: patch.description.clone(),
            content: patch.content.as_ref().map(encode_content).transpose()?,
            ..Default::default()
        })
    }
}
