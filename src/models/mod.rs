mod api_key;
mod bonus;
mod bonus_page;
mod charge;
mod product;
mod sales_page;
mod stats;
mod video_script;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::store::{OrderBy, Record};

pub use api_key::{ApiKey, ApiKeyPatch, NewApiKey, Provider};
pub use bonus::{Bonus, BonusContent, BonusPatch, BonusType, NewBonus};
pub use bonus_page::{BonusPage, BonusPagePatch, NewBonusPage, PageStatus};
pub use charge::Charge;
pub use product::{NewProduct, Product, ProductPatch};
pub use sales_page::SalesPage;
pub use stats::{
    conversion_rate, ActivityItem, ActivityKind, Analytics, ChartPoint, ChartSeries,
    DashboardStats, DateRange, PageActivity, TopPage,
};
pub use video_script::VideoTrainingScript;

// Draft and patch shapes only tests build directly
#[cfg(test)]
pub use bonus_page::{BonusExplanation, PageDesign};
#[cfg(test)]
pub use charge::ChargeFields;
#[cfg(test)]
pub use sales_page::SalesPageFields;
#[cfg(test)]
pub use video_script::VideoTrainingScriptFields;

/// Maps one app-level type to and from the record store's field layout.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Entity name in the record store.
    const NAME: &'static str;
    /// Human-readable name used in notices.
    const LABEL: &'static str;
    /// Fields requested on reads.
    const FIELDS: &'static [&'static str];

    type Draft: Send + Sync;
    type Patch: Send + Sync;

    fn order_by() -> Vec<OrderBy> {
        Vec::new()
    }

    fn from_record(record: Record) -> Result<Self>;

    fn draft_record(draft: &Self::Draft) -> Result<Record>;

    /// Only the fields set on the patch end up in the record.
    fn patch_record(patch: &Self::Patch) -> Result<Record>;

    fn fields() -> Vec<String> {
        Self::FIELDS.iter().map(|f| f.to_string()).collect()
    }
}

/// Store-managed fields wrapped around an entity's own wire fields.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "CreatedOn", default)]
    pub created_on: Option<String>,
    #[serde(flatten)]
    pub fields: T,
}

impl<T> Envelope<T> {
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_on
            .as_deref()
            .and_then(parse_datetime)
            .unwrap_or_else(Utc::now)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(record: Record) -> Result<Envelope<T>> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

pub(crate) fn encode<T: Serialize>(fields: &T) -> Result<Record> {
    match serde_json::to_value(fields)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Validation(format!(
            "expected an object of fields, got {}",
            other
        ))),
    }
}

pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}
