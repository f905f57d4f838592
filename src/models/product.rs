use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::Record;

use super::{decode, encode, parse_datetime, Entity};

/// A product page that has been through analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub description: String,
    pub features: Vec<String>,
    pub gaps: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub url: String,
    pub name: String,
    pub description: String,
    pub features: Vec<String>,
    pub gaps: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl From<&Product> for NewProduct {
    fn from(product: &Product) -> Self {
        Self {
            url: product.url.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            features: product.features.clone(),
            gaps: product.gaps.clone(),
            analyzed_at: product.analyzed_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
    pub gaps: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProductFields {
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gaps: Option<Vec<String>>,
    #[serde(rename = "analyzedAt", skip_serializing_if = "Option::is_none")]
    analyzed_at: Option<String>,
}

impl Entity for Product {
    const NAME: &'static str = "product";
    const LABEL: &'static str = "product";
    const FIELDS: &'static [&'static str] =
        &["Name", "url", "description", "features", "gaps", "analyzedAt"];

    type Draft = NewProduct;
    type Patch = ProductPatch;

    fn from_record(record: Record) -> Result<Self> {
        let envelope = decode::<ProductFields>(record)?;
        let created_at = envelope.created_at();
        let fields = envelope.fields;
        Ok(Product {
            id: envelope.id,
            url: fields.url.unwrap_or_default(),
            name: fields.name.unwrap_or_default(),
            description: fields.description.unwrap_or_default(),
            features: fields.features.unwrap_or_default(),
            gaps: fields.gaps.unwrap_or_default(),
            analyzed_at: fields
                .analyzed_at
                .as_deref()
                .and_then(parse_datetime)
                .unwrap_or(created_at),
        })
    }

    fn draft_record(draft: &NewProduct) -> Result<Record> {
        encode(&ProductFields {
            name: Some(draft.name.clone()),
            url: Some(draft.url.clone()),
            description: Some(draft.description.clone()),
            features: Some(draft.features.clone()),
            gaps: Some(draft.gaps.clone()),
            analyzed_at: Some(draft.analyzed_at.to_rfc3339()),
        })
    }

    fn patch_record(patch: &ProductPatch) -> Result<Record> {
        encode(&ProductFields {
            name: patch.name.clone(),
            description: patch.description.clone(),
            features: patch.features.clone(),
            gaps: patch.gaps.clone(),
            ..Default::default()
        })
    }
}
