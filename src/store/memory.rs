use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};

use super::{
    project, record_id, record_version, sort_records, BatchResponse, FetchParams, Record,
    RecordResult, RecordStore, StoreResponse, CREATED_FIELD, ID_FIELD, VERSION_FIELD,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    entities: HashMap<String, BTreeMap<i64, Record>>,
}

impl Tables {
    fn table(&mut self, entity: &str) -> &mut BTreeMap<i64, Record> {
        self.entities.entry(entity.to_string()).or_default()
    }

    fn insert(&mut self, entity: &str, mut record: Record) -> Record {
        self.next_id += 1;
        let id = self.next_id;
        record.insert(ID_FIELD.to_string(), Value::from(id));
        record.insert(CREATED_FIELD.to_string(), Value::from(Utc::now().to_rfc3339()));
        record.insert(VERSION_FIELD.to_string(), Value::from(1));
        self.table(entity).insert(id, record.clone());
        record
    }
}

/// Records held in process memory. Each store instance is its own database.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn merge_fields(target: &mut Record, fields: Record) {
    for (key, value) in fields {
        if matches!(key.as_str(), ID_FIELD | CREATED_FIELD | VERSION_FIELD) {
            continue;
        }
        target.insert(key, value);
    }
    let version = record_version(target) + 1;
    target.insert(VERSION_FIELD.to_string(), Value::from(version));
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_records(
        &self,
        entity: &str,
        params: &FetchParams,
    ) -> Result<StoreResponse<Vec<Record>>> {
        let mut tables = self.tables.lock().await;
        let mut records: Vec<Record> = tables
            .table(entity)
            .values()
            .map(|r| project(r, &params.fields))
            .collect();
        sort_records(&mut records, &params.order_by);
        Ok(StoreResponse::ok(Some(records)))
    }

    async fn get_record_by_id(
        &self,
        entity: &str,
        id: i64,
        fields: &[String],
    ) -> Result<StoreResponse<Record>> {
        let mut tables = self.tables.lock().await;
        let record = tables.table(entity).get(&id).map(|r| project(r, fields));
        Ok(StoreResponse::ok(record))
    }

    async fn create_records(&self, entity: &str, records: Vec<Record>) -> Result<BatchResponse> {
        let mut tables = self.tables.lock().await;
        let results = records
            .into_iter()
            .map(|record| RecordResult::ok(tables.insert(entity, record)))
            .collect();
        Ok(BatchResponse::from_results(results))
    }

    async fn update_records(&self, entity: &str, records: Vec<Record>) -> Result<BatchResponse> {
        let mut tables = self.tables.lock().await;
        let table = tables.table(entity);
        let results = records
            .into_iter()
            .map(|fields| {
                let Some(id) = record_id(&fields) else {
                    return RecordResult::failure("record is missing Id");
                };
                match table.get_mut(&id) {
                    Some(existing) => {
                        merge_fields(existing, fields);
                        RecordResult::ok(existing.clone())
                    }
                    None => RecordResult::failure(format!("record {} not found", id)),
                }
            })
            .collect();
        Ok(BatchResponse::from_results(results))
    }

    async fn delete_records(&self, entity: &str, ids: &[i64]) -> Result<BatchResponse> {
        let mut tables = self.tables.lock().await;
        let table = tables.table(entity);
        let results = ids
            .iter()
            .map(|id| match table.remove(id) {
                Some(removed) => RecordResult::ok(removed),
                None => RecordResult::failure(format!("record {} not found", id)),
            })
            .collect();
        Ok(BatchResponse::from_results(results))
    }

    async fn compare_and_swap(
        &self,
        entity: &str,
        id: i64,
        expected_version: i64,
        fields: Record,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.table(entity).get_mut(&id) {
            Some(existing) if record_version(existing) == expected_version => {
                merge_fields(existing, fields);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_field(
        &self,
        entity: &str,
        id: i64,
        field: &str,
        delta: i64,
    ) -> Result<Record> {
        let mut tables = self.tables.lock().await;
        let existing = tables
            .table(entity)
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(entity, id))?;

        let next = existing.get(field).and_then(Value::as_i64).unwrap_or(0) + delta;
        let mut fields = Record::new();
        fields.insert(field.to_string(), Value::from(next));
        merge_fields(existing, fields);
        Ok(existing.clone())
    }

    async fn upsert_by_key(&self, entity: &str, key_field: &str, record: Record) -> Result<Record> {
        let mut tables = self.tables.lock().await;
        let key = record.get(key_field).cloned();
        let existing_id = tables
            .table(entity)
            .iter()
            .find(|(_, r)| key.is_some() && r.get(key_field) == key.as_ref())
            .map(|(id, _)| *id);

        match existing_id {
            Some(id) => {
                let table = tables.table(entity);
                let existing = table
                    .get_mut(&id)
                    .ok_or_else(|| AppError::not_found(entity, id))?;
                existing.retain(|k, _| matches!(k.as_str(), ID_FIELD | CREATED_FIELD | VERSION_FIELD));
                merge_fields(existing, record);
                Ok(existing.clone())
            }
            None => Ok(tables.insert(entity, record)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    async fn seed(store: &MemoryStore, value: Value) -> i64 {
        let created = store
            .create_records("bonuspage", vec![record(value)])
            .await
            .unwrap()
            .into_records("bonuspage", "create")
            .unwrap();
        record_id(&created[0]).unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_store_fields() {
        let store = MemoryStore::new();
        let id = seed(&store, json!({"title": "Pack"})).await;
        let fetched = store
            .get_record_by_id("bonuspage", id, &[])
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(fetched["title"], json!("Pack"));
        assert_eq!(fetched["Version"], json!(1));
        assert!(fetched.contains_key("CreatedOn"));
    }

    #[tokio::test]
    async fn test_update_is_sparse_merge() {
        let store = MemoryStore::new();
        let id = seed(&store, json!({"title": "Pack", "status": "draft"})).await;
        store
            .update_records("bonuspage", vec![record(json!({"Id": id, "status": "active"}))])
            .await
            .unwrap()
            .into_records("bonuspage", "update")
            .unwrap();
        let fetched = store
            .get_record_by_id("bonuspage", id, &[])
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(fetched["title"], json!("Pack"));
        assert_eq!(fetched["status"], json!("active"));
        assert_eq!(fetched["Version"], json!(2));
    }

    #[tokio::test]
    async fn test_update_missing_id_fails_per_record() {
        let store = MemoryStore::new();
        let batch = store
            .update_records("bonuspage", vec![record(json!({"Id": 7, "title": "x"}))])
            .await
            .unwrap();
        assert!(batch.success);
        assert!(!batch.results[0].success);
    }

    #[tokio::test]
    async fn test_stale_compare_and_swap_is_rejected() {
        let store = MemoryStore::new();
        let id = seed(&store, json!({"views": 0})).await;
        assert!(store
            .compare_and_swap("bonuspage", id, 1, record(json!({"views": 1})))
            .await
            .unwrap());
        assert!(!store
            .compare_and_swap("bonuspage", id, 1, record(json!({"views": 5})))
            .await
            .unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, json!({"views": 0})).await;

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.increment_field("bonuspage", id, "views", 1).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let fetched = store
            .get_record_by_id("bonuspage", id, &[])
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(fetched["views"], json!(50));
    }

    #[tokio::test]
    async fn test_upsert_replaces_matching_key() {
        let store = MemoryStore::new();
        let first = store
            .upsert_by_key("apikey", "provider", record(json!({"provider": "openai", "key": "a"})))
            .await
            .unwrap();
        let second = store
            .upsert_by_key("apikey", "provider", record(json!({"provider": "openai", "key": "b"})))
            .await
            .unwrap();
        assert_eq!(record_id(&first), record_id(&second));

        let all = store
            .fetch_records("apikey", &FetchParams::default())
            .await
            .unwrap()
            .data
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["key"], json!("b"));
    }
}
