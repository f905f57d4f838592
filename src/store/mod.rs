mod memory;
mod remote;
mod schema;
mod sqlite;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use sqlite::SqliteStore;

/// A record as the store sees it: a flat JSON object of named fields.
pub type Record = serde_json::Map<String, Value>;

pub const ID_FIELD: &str = "Id";
pub const CREATED_FIELD: &str = "CreatedOn";
pub const VERSION_FIELD: &str = "Version";

/// Attempts made by [`optimistic_increment`] before giving up on a contended record.
pub const MAX_CAS_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortType {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "sorttype")]
    pub sort_type: SortType,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        Self {
            field_name: field.to_string(),
            sort_type: SortType::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field_name: field.to_string(),
            sort_type: SortType::Desc,
        }
    }

    /// Latest `CreatedOn` first. Records created in the same instant fall back to the higher id.
    pub fn newest_first() -> Vec<Self> {
        vec![Self::desc(CREATED_FIELD), Self::desc(ID_FIELD)]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchParams {
    pub fields: Vec<String>,
    #[serde(rename = "orderBy", default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> StoreResponse<T> {
    pub fn ok(data: Option<T>) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    /// Turn a store-reported failure into an error; a missing payload stays `None`.
    pub fn into_result(self, entity: &str) -> Result<Option<T>> {
        if !self.success {
            return Err(AppError::store(
                entity,
                self.message.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        Ok(self.data)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResult {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Record>,
}

impl RecordResult {
    pub fn ok(data: Record) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Vec<RecordResult>,
}

impl BatchResponse {
    pub fn from_results(results: Vec<RecordResult>) -> Self {
        Self {
            success: true,
            message: None,
            results,
        }
    }

    /// Check the top-level flag and then every per-record result.
    ///
    /// A batch counts as failed when any record inside it failed, even if the
    /// store reported overall success.
    pub fn into_records(self, entity: &str, action: &str) -> Result<Vec<Record>> {
        if !self.success {
            return Err(AppError::store(
                entity,
                self.message.unwrap_or_else(|| format!("{} failed", action)),
            ));
        }

        let (ok, failed): (Vec<_>, Vec<_>) = self.results.into_iter().partition(|r| r.success);
        if !failed.is_empty() {
            let messages: Vec<String> = failed
                .iter()
                .map(|r| r.message.clone().unwrap_or_else(|| "unknown error".to_string()))
                .collect();
            tracing::error!(
                entity,
                "Failed to {} {} records: {}",
                action,
                failed.len(),
                messages.join("; ")
            );
            return Err(AppError::store(
                entity,
                format!("failed to {} {} record(s): {}", action, failed.len(), messages.join("; ")),
            ));
        }

        Ok(ok.into_iter().filter_map(|r| r.data).collect())
    }
}

/// Generic CRUD access to an external record service, keyed by entity name.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_records(
        &self,
        entity: &str,
        params: &FetchParams,
    ) -> Result<StoreResponse<Vec<Record>>>;

    /// A missing id is a successful response with no data.
    async fn get_record_by_id(
        &self,
        entity: &str,
        id: i64,
        fields: &[String],
    ) -> Result<StoreResponse<Record>>;

    async fn create_records(&self, entity: &str, records: Vec<Record>) -> Result<BatchResponse>;

    /// Each record must carry its `Id`; only the fields present are written.
    async fn update_records(&self, entity: &str, records: Vec<Record>) -> Result<BatchResponse>;

    async fn delete_records(&self, entity: &str, ids: &[i64]) -> Result<BatchResponse>;

    /// Write `fields` only if the record is still at `expected_version`.
    /// Returns `false` on a version mismatch.
    async fn compare_and_swap(
        &self,
        entity: &str,
        id: i64,
        expected_version: i64,
        fields: Record,
    ) -> Result<bool>;

    /// Add `delta` to a numeric field without losing concurrent updates.
    async fn increment_field(&self, entity: &str, id: i64, field: &str, delta: i64)
        -> Result<Record>;

    /// Replace the record whose `key_field` matches, or insert it, as one operation.
    async fn upsert_by_key(&self, entity: &str, key_field: &str, record: Record) -> Result<Record>;
}

/// Read-then-conditional-write increment for stores without a native atomic one.
pub async fn optimistic_increment<S: RecordStore + ?Sized>(
    store: &S,
    entity: &str,
    id: i64,
    field: &str,
    delta: i64,
) -> Result<Record> {
    for attempt in 1..=MAX_CAS_ATTEMPTS {
        let current = store
            .get_record_by_id(entity, id, &[field.to_string()])
            .await?
            .into_result(entity)?
            .ok_or_else(|| AppError::not_found(entity, id))?;

        let version = record_version(&current);
        let next = current.get(field).and_then(Value::as_i64).unwrap_or(0) + delta;

        let mut fields = Record::new();
        fields.insert(field.to_string(), Value::from(next));

        if store.compare_and_swap(entity, id, version, fields).await? {
            let mut updated = current;
            updated.insert(field.to_string(), Value::from(next));
            updated.insert(VERSION_FIELD.to_string(), Value::from(version + 1));
            return Ok(updated);
        }

        tracing::debug!(entity, id, field, attempt, "Version conflict, retrying increment");
    }

    Err(AppError::Conflict {
        entity: entity.to_string(),
        id,
        attempts: MAX_CAS_ATTEMPTS,
    })
}

pub fn record_id(record: &Record) -> Option<i64> {
    record.get(ID_FIELD).and_then(Value::as_i64)
}

pub fn record_version(record: &Record) -> i64 {
    record.get(VERSION_FIELD).and_then(Value::as_i64).unwrap_or(0)
}

/// Keep only the requested fields plus the store-managed ones. An empty list keeps everything.
pub(crate) fn project(record: &Record, fields: &[String]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    record
        .iter()
        .filter(|(key, _)| {
            matches!(key.as_str(), ID_FIELD | CREATED_FIELD | VERSION_FIELD)
                || fields.iter().any(|f| f == *key)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

pub(crate) fn sort_records(records: &mut [Record], order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for order in order_by {
            let ordering = compare_values(a.get(&order.field_name), b.get(&order.field_name));
            let ordering = match order.sort_type {
                SortType::Asc => ordering,
                SortType::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_batch_with_failed_inner_result_is_an_error() {
        let batch = BatchResponse::from_results(vec![
            RecordResult::ok(record(json!({"Id": 1}))),
            RecordResult::failure("price must be positive"),
        ]);
        let err = batch.into_records("charge", "create").unwrap_err();
        assert!(err.to_string().contains("price must be positive"));
    }

    #[test]
    fn test_batch_top_level_failure_is_an_error() {
        let batch = BatchResponse {
            success: false,
            message: Some("quota exceeded".to_string()),
            results: vec![],
        };
        assert!(batch.into_records("charge", "update").is_err());
    }

    #[test]
    fn test_failed_store_response_carries_message() {
        let response: StoreResponse<Record> = StoreResponse {
            success: false,
            message: Some("invalid field".to_string()),
            data: None,
        };
        let err = response.into_result("bonus").unwrap_err();
        assert_eq!(err.to_string(), "Record store error on bonus: invalid field");
    }

    #[test]
    fn test_project_keeps_store_fields() {
        let full = record(json!({"Id": 4, "Version": 2, "title": "A", "views": 3}));
        let projected = project(&full, &["views".to_string()]);
        assert_eq!(projected.len(), 3);
        assert!(projected.contains_key("Id"));
        assert!(!projected.contains_key("title"));
    }

    #[test]
    fn test_sort_records_by_number_then_desc() {
        let mut records = vec![
            record(json!({"Id": 1, "price": 47})),
            record(json!({"Id": 2, "price": 9})),
            record(json!({"Id": 3, "price": 197})),
        ];
        sort_records(&mut records, &[OrderBy::asc("price")]);
        let ids: Vec<_> = records.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);

        sort_records(&mut records, &[OrderBy::desc("price")]);
        let ids: Vec<_> = records.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_newest_first_breaks_ties_by_id() {
        let mut records = vec![
            record(json!({"Id": 1, "CreatedOn": "2026-10-19T09:00:00Z"})),
            record(json!({"Id": 2, "CreatedOn": "2026-10-19T09:00:00Z"})),
            record(json!({"Id": 3, "CreatedOn": "2026-10-18T09:00:00Z"})),
        ];
        sort_records(&mut records, &OrderBy::newest_first());
        let ids: Vec<_> = records.iter().filter_map(record_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn test_optimistic_increment_applies_each_delta() {
        let store = MemoryStore::new();
        let created = store
            .create_records("bonuspage", vec![record(json!({"views": 0}))])
            .await
            .unwrap()
            .into_records("bonuspage", "create")
            .unwrap();
        let id = record_id(&created[0]).unwrap();

        optimistic_increment(&store, "bonuspage", id, "views", 1).await.unwrap();
        let updated = optimistic_increment(&store, "bonuspage", id, "views", 2).await.unwrap();
        assert_eq!(updated["views"], json!(3));
    }

    #[tokio::test]
    async fn test_optimistic_increment_on_missing_record() {
        let store = MemoryStore::new();
        let err = optimistic_increment(&store, "bonuspage", 99, "views", 1)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    /// Loses the first `conflicts` compare-and-swap races, then defers to memory.
    struct Contended {
        inner: MemoryStore,
        conflicts: std::sync::atomic::AtomicUsize,
    }

    impl Contended {
        fn new(conflicts: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                conflicts: std::sync::atomic::AtomicUsize::new(conflicts),
            }
        }
    }

    #[async_trait]
    impl RecordStore for Contended {
        async fn fetch_records(
            &self,
            entity: &str,
            params: &FetchParams,
        ) -> Result<StoreResponse<Vec<Record>>> {
            self.inner.fetch_records(entity, params).await
        }

        async fn get_record_by_id(
            &self,
            entity: &str,
            id: i64,
            fields: &[String],
        ) -> Result<StoreResponse<Record>> {
            self.inner.get_record_by_id(entity, id, fields).await
        }

        async fn create_records(&self, entity: &str, records: Vec<Record>) -> Result<BatchResponse> {
            self.inner.create_records(entity, records).await
        }

        async fn update_records(&self, entity: &str, records: Vec<Record>) -> Result<BatchResponse> {
            self.inner.update_records(entity, records).await
        }

        async fn delete_records(&self, entity: &str, ids: &[i64]) -> Result<BatchResponse> {
            self.inner.delete_records(entity, ids).await
        }

        async fn compare_and_swap(
            &self,
            entity: &str,
            id: i64,
            expected_version: i64,
            fields: Record,
        ) -> Result<bool> {
            use std::sync::atomic::Ordering::SeqCst;
            let lost = self
                .conflicts
                .fetch_update(SeqCst, SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if lost {
                return Ok(false);
            }
            self.inner
                .compare_and_swap(entity, id, expected_version, fields)
                .await
        }

        async fn increment_field(
            &self,
            entity: &str,
            id: i64,
            field: &str,
            delta: i64,
        ) -> Result<Record> {
            self.inner.increment_field(entity, id, field, delta).await
        }

        async fn upsert_by_key(&self, entity: &str, key_field: &str, record: Record) -> Result<Record> {
            self.inner.upsert_by_key(entity, key_field, record).await
        }
    }

    async fn seeded_page(store: &Contended) -> i64 {
        let created = store
            .create_records("bonuspage", vec![record(json!({"views": 10}))])
            .await
            .unwrap()
            .into_records("bonuspage", "create")
            .unwrap();
        record_id(&created[0]).unwrap()
    }

    #[tokio::test]
    async fn test_optimistic_increment_retries_lost_races() {
        let store = Contended::new(MAX_CAS_ATTEMPTS - 1);
        let id = seeded_page(&store).await;

        let updated = optimistic_increment(&store, "bonuspage", id, "views", 1).await.unwrap();
        assert_eq!(updated["views"], json!(11));

        let stored = store
            .get_record_by_id("bonuspage", id, &[])
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(stored["views"], json!(11));
    }

    #[tokio::test]
    async fn test_optimistic_increment_gives_up_after_max_attempts() {
        let store = Contended::new(MAX_CAS_ATTEMPTS);
        let id = seeded_page(&store).await;

        let err = optimistic_increment(&store, "bonuspage", id, "views", 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Conflict { attempts: MAX_CAS_ATTEMPTS, .. }
        ));

        let stored = store
            .get_record_by_id("bonuspage", id, &[])
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(stored["views"], json!(10));
    }
}
