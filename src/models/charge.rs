use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{OrderBy, Record};

use super::{decode, encode, Entity};

/// A pricing tier attached to a sales page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub limits_of_use: String,
    pub sales_page_id: Option<i64>,
}

/// Charge fields as the store names them. Used for both create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChargeFields {
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "limitsOfUse", skip_serializing_if = "Option::is_none")]
    pub limits_of_use: Option<String>,
    #[serde(rename = "salesPageId", skip_serializing_if = "Option::is_none")]
    pub sales_page_id: Option<i64>,
}

impl Entity for Charge {
    const NAME: &'static str = "charge";
    const LABEL: &'static str = "charge";
    const FIELDS: &'static [&'static str] =
        &["Name", "price", "description", "limitsOfUse", "salesPageId"];

    type Draft = ChargeFields;
    type Patch = ChargeFields;

    fn order_by() -> Vec<OrderBy> {
        vec![OrderBy::asc("price")]
    }

    fn from_record(record: Record) -> Result<Self> {
        let envelope = decode::<ChargeFields>(record)?;
        let fields = envelope.fields;
        Ok(Charge {
            id: envelope.id,
            name: fields.name.unwrap_or_default(),
            price: fields.price.unwrap_or(0.0),
            description: fields.description.unwrap_or_default(),
            limits_of_use: fields.limits_of_use.unwrap_or_default(),
            sales_page_id: fields.sales_page_id,
        })
    }

    fn draft_record(draft: &ChargeFields) -> Result<Record> {
        encode(draft)
    }

    fn patch_record(patch: &ChargeFields) -> Result<Record> {
        encode(patch)
    }
}
