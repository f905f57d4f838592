use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::store::{OrderBy, Record};

use super::{conversion_rate, decode, encode, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Active,
    Draft,
    Archived,
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageStatus::Active => "active",
            PageStatus::Draft => "draft",
            PageStatus::Archived => "archived",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PageStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(PageStatus::Active),
            "draft" => Ok(PageStatus::Draft),
            "archived" => Ok(PageStatus::Archived),
            other => Err(AppError::Validation(format!("unknown page status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDesign {
    pub background_color: String,
    pub primary_color: String,
    pub accent_color: String,
}

impl Default for PageDesign {
    fn default() -> Self {
        Self {
            background_color: "#0F172A".to_string(),
            primary_color: "#6366F1".to_string(),
            accent_color: "#F59E0B".to_string(),
        }
    }
}

/// Extra copy explaining the bonus: free text or a list of points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BonusExplanation {
    Items(Vec<String>),
    Text(String),
}

impl BonusExplanation {
    /// Decode the stored string. A string holding a JSON array becomes a list.
    pub fn from_stored(raw: &str) -> Self {
        if raw.trim_start().starts_with('[') {
            if let Ok(items) = serde_json::from_str::<Vec<String>>(raw) {
                return BonusExplanation::Items(items);
            }
        }
        BonusExplanation::Text(raw.to_string())
    }

    pub fn to_stored(&self) -> Result<String> {
        match self {
            BonusExplanation::Text(text) => Ok(text.clone()),
            BonusExplanation::Items(items) => Ok(serde_json::to_string(items)?),
        }
    }

    pub fn items(&self) -> Vec<String> {
        match self {
            BonusExplanation::Items(items) => items.clone(),
            BonusExplanation::Text(text) => vec![text.clone()],
        }
    }
}

/// A hosted page presenting one bonus with a call to action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusPage {
    pub id: i64,
    pub bonus_id: String,
    pub title: String,
    pub headline: String,
    pub subheadline: String,
    pub description: String,
    pub url: String,
    pub affiliate_link: String,
    pub cta_link: Option<String>,
    pub cta_text: String,
    pub design: PageDesign,
    pub status: PageStatus,
    pub views: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub video_url: Option<String>,
    pub bonus_explanation: Option<BonusExplanation>,
    pub created_at: DateTime<Utc>,
}

impl BonusPage {
    /// Where the call to action sends the visitor: the CTA link, else the affiliate link.
    pub fn resolve_redirect(&self) -> &str {
        self.cta_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
            .unwrap_or(self.affiliate_link.as_str())
    }

    pub fn conversion_rate(&self) -> f64 {
        conversion_rate(self.clicks, self.views)
    }
}

/// Page builder input. `url` and `status` are filled in by the page service.
#[derive(Debug, Clone, Default)]
pub struct NewBonusPage {
    pub bonus_id: String,
    pub title: String,
    pub headline: String,
    pub subheadline: String,
    pub description: String,
    pub url: String,
    pub affiliate_link: String,
    pub cta_link: Option<String>,
    pub cta_text: String,
    pub design: PageDesign,
    pub status: PageStatus,
    pub video_url: Option<String>,
    pub bonus_explanation: Option<BonusExplanation>,
}

/// Editable page fields. Counters only move through view and click tracking.
#[derive(Debug, Clone, Default)]
pub struct BonusPagePatch {
    pub title: Option<String>,
    pub headline: Option<String>,
    pub subheadline: Option<String>,
    pub description: Option<String>,
    pub affiliate_link: Option<String>,
    pub cta_link: Option<String>,
    pub cta_text: Option<String>,
    pub design: Option<PageDesign>,
    pub status: Option<PageStatus>,
    pub video_url: Option<String>,
    pub bonus_explanation: Option<BonusExplanation>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BonusPageFields {
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bonus_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subheadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    affiliate_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cta_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cta_text: Option<String>,
    /// JSON-encoded [`PageDesign`].
    #[serde(skip_serializing_if = "Option::is_none")]
    design: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<PageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clicks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bonus_explanation: Option<StoredExplanation>,
}

/// The store may hand back the explanation as a string or as a real array.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredExplanation {
    Items(Vec<String>),
    Text(String),
}

impl StoredExplanation {
    fn decode(self) -> BonusExplanation {
        match self {
            StoredExplanation::Items(items) => BonusExplanation::Items(items),
            StoredExplanation::Text(raw) => BonusExplanation::from_stored(&raw),
        }
    }
}

fn encode_design(design: &PageDesign) -> Result<String> {
    Ok(serde_json::to_string(design)?)
}

fn encode_explanation(explanation: &BonusExplanation) -> Result<StoredExplanation> {
    Ok(StoredExplanation::Text(explanation.to_stored()?))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Entity for BonusPage {
    const NAME: &'static str = "bonuspage";
    const LABEL: &'static str = "bonus page";
    const FIELDS: &'static [&'static str] = &[
        "Name",
        "bonus_id",
        "headline",
        "subheadline",
        "description",
        "url",
        "affiliate_link",
        "cta_link",
        "cta_text",
        "design",
        "status",
        "views",
        "clicks",
        "conversions",
        "video_url",
        "bonus_explanation",
    ];

    type Draft = NewBonusPage;
    type Patch = BonusPagePatch;

    fn order_by() -> Vec<OrderBy> {
        OrderBy::newest_first()
    }

    fn from_record(record: Record) -> Result<Self> {
        let envelope = decode::<BonusPageFields>(record)?;
        let created_at = envelope.created_at();
        let fields = envelope.fields;
        let design = match fields.design.as_deref() {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)?,
            _ => PageDesign::default(),
        };
        Ok(BonusPage {
            id: envelope.id,
            bonus_id: fields.bonus_id.unwrap_or_default(),
            title: fields.title.unwrap_or_default(),
            headline: fields.headline.unwrap_or_default(),
            subheadline: fields.subheadline.unwrap_or_default(),
            description: fields.description.unwrap_or_default(),
            url: fields.url.unwrap_or_default(),
            affiliate_link: fields.affiliate_link.unwrap_or_default(),
            cta_link: non_blank(fields.cta_link),
            cta_text: fields.cta_text.unwrap_or_else(|| "Claim Your Bonus".to_string()),
            design,
            status: fields.status.unwrap_or_default(),
            views: fields.views.unwrap_or(0),
            clicks: fields.clicks.unwrap_or(0),
            conversions: fields.conversions.unwrap_or(0),
            video_url: non_blank(fields.video_url),
            bonus_explanation: fields.bonus_explanation.map(StoredExplanation::decode),
            created_at,
        })
    }

    fn draft_record(draft: &NewBonusPage) -> Result<Record> {
        encode(&BonusPageFields {
            title: Some(draft.title.clone()),
            bonus_id: Some(draft.bonus_id.clone()),
            headline: Some(draft.headline.clone()),
            subheadline: Some(draft.subheadline.clone()),
            description: Some(draft.description.clone()),
            url: Some(draft.url.clone()),
            affiliate_link: Some(draft.affiliate_link.clone()),
            cta_link: draft.cta_link.clone(),
            cta_text: Some(draft.cta_text.clone()),
            design: Some(encode_design(&draft.design)?),
            status: Some(draft.status),
            views: Some(0),
            clicks: Some(0),
            conversions: Some(0),
            video_url: draft.video_url.clone(),
            bonus_explanation: draft
                .bonus_explanation
                .as_ref()
                .map(encode_explanation)
                .transpose()?,
        })
    }

    fn patch_record(patch: &BonusPagePatch) -> Result<Record> {
        encode(&BonusPageFields {
            title: patch.title.clone(),
            headline: patch.headline.clone(),
            subheadline: patch.subheadline.clone(),
            description: patch.description.clone(),
            affiliate_link: patch.affiliate_link.clone(),
            cta_link: patch.cta_link.clone(),
            cta_text: patch.cta_text.clone(),
            design: patch.design.as_ref().map(encode_design).transpose()?,
            status: patch.status,
            video_url: patch.video_url.clone(),
            bonus_explanation: patch
                .bonus_explanation
                .as_ref()
                .map(encode_explanation)
                .transpose()?,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn stored(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_explanation_decodes_every_stored_form() {
        let plain = BonusPage::from_record(stored(json!({
            "Id": 1, "bonus_explanation": "Everything you need"
        })))
        .unwrap();
        assert_eq!(
            plain.bonus_explanation,
            Some(BonusExplanation::Text("Everything you need".to_string()))
        );

        let encoded = BonusPage::from_record(stored(json!({
            "Id": 2, "bonus_explanation": "[\"Step one\",\"Step two\"]"
        })))
        .unwrap();
        assert_eq!(
            encoded.bonus_explanation.unwrap().items(),
            vec!["Step one".to_string(), "Step two".to_string()]
        );

        let array = BonusPage::from_record(stored(json!({
            "Id": 3, "bonus_explanation": ["Only item"]
        })))
        .unwrap();
        assert_eq!(
            array.bonus_explanation,
            Some(BonusExplanation::Items(vec!["Only item".to_string()]))
        );
    }

    #[test]
    fn test_malformed_array_string_stays_text() {
        let explanation = BonusExplanation::from_stored("[not json");
        assert_eq!(explanation, BonusExplanation::Text("[not json".to_string()));
    }

    #[test]
    fn test_draft_starts_counters_at_zero() {
        let draft = NewBonusPage {
            bonus_id: "4".to_string(),
            affiliate_link: "https://x.test".to_string(),
            ..Default::default()
        };
        let record = BonusPage::draft_record(&draft).unwrap();
        assert_eq!(record["views"], json!(0));
        assert_eq!(record["clicks"], json!(0));
        assert_eq!(record["conversions"], json!(0));
        assert!(!record.contains_key("cta_link"));
    }

    #[test]
    fn test_patch_writes_only_given_fields() {
        let patch = BonusPagePatch {
            status: Some(PageStatus::Archived),
            ..Default::default()
        };
        let record = BonusPage::patch_record(&patch).unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record["status"], json!("archived"));
    }

    #[test]
    fn test_redirect_falls_back_to_affiliate_link() {
        let mut page = BonusPage::from_record(stored(json!({
            "Id": 9, "affiliate_link": "https://x.test", "cta_link": "  "
        })))
        .unwrap();
        assert_eq!(page.resolve_redirect(), "https://x.test");

        page.cta_link = Some("https://cta.test".to_string());
        assert_eq!(page.resolve_redirect(), "https://cta.test");
    }

    #[test]
    fn test_status_parses_case_insensitively() {
        assert_eq!("Draft".parse::<PageStatus>().unwrap(), PageStatus::Draft);
        assert!("deleted".parse::<PageStatus>().is_err());
    }
}
