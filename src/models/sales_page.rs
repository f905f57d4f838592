use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{OrderBy, Record};

use super::{decode, encode, Entity};

const DEFAULT_STATUS: &str = "Draft";

/// Marketing copy for a product's sales page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesPage {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub affiliate_link: String,
    pub cta_text: String,
    pub status: String,
    pub views: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub copywriting: String,
    pub benefits: String,
    pub life_changes: String,
    pub product_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesPageFields {
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "affiliatelink", skip_serializing_if = "Option::is_none")]
    pub affiliate_link: Option<String>,
    #[serde(rename = "ctatext", skip_serializing_if = "Option::is_none")]
    pub cta_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copywriting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    #[serde(rename = "lifechanges", skip_serializing_if = "Option::is_none")]
    pub life_changes: Option<String>,
    #[serde(rename = "productId", skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
}

impl Entity for SalesPage {
    const NAME: &'static str = "salespage";
    const LABEL: &'static str = "sales page";
    const FIELDS: &'static [&'static str] = &[
        "Name",
        "title",
        "description",
        "url",
        "affiliatelink",
        "ctatext",
        "status",
        "views",
        "clicks",
        "conversions",
        "copywriting",
        "benefits",
        "lifechanges",
        "productId",
    ];

    type Draft = SalesPageFields;
    type Patch = SalesPageFields;

    fn order_by() -> Vec<OrderBy> {
        OrderBy::newest_first()
    }

    fn from_record(record: Record) -> Result<Self> {
        let envelope = decode::<SalesPageFields>(record)?;
        let created_at = envelope.created_at();
        let fields = envelope.fields;
        Ok(SalesPage {
            id: envelope.id,
            name: fields.name.unwrap_or_default(),
            title: fields.title.unwrap_or_default(),
            description: fields.description.unwrap_or_default(),
            url: fields.url.unwrap_or_default(),
            affiliate_link: fields.affiliate_link.unwrap_or_default(),
            cta_text: fields.cta_text.unwrap_or_default(),
            status: fields.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            views: fields.views.unwrap_or(0),
            clicks: fields.clicks.unwrap_or(0),
            conversions: fields.conversions.unwrap_or(0),
            copywriting: fields.copywriting.unwrap_or_default(),
            benefits: fields.benefits.unwrap_or_default(),
            life_changes: fields.life_changes.unwrap_or_default(),
            product_id: fields.product_id,
            created_at,
        })
    }

    /// New sales pages default to draft status with zeroed counters.
    fn draft_record(draft: &SalesPageFields) -> Result<Record> {
        let mut draft = draft.clone();
        draft.status.get_or_insert_with(|| DEFAULT_STATUS.to_string());
        draft.views.get_or_insert(0);
        draft.clicks.get_or_insert(0);
        draft.conversions.get_or_insert(0);
        encode(&draft)
    }

    fn patch_record(patch: &SalesPageFields) -> Result<Record> {
        encode(patch)
    }
}
