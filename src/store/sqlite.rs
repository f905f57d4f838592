use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};

use super::schema::SCHEMA;
use super::{
    project, record_id, sort_records, BatchResponse, FetchParams, Record, RecordResult,
    RecordStore, StoreResponse, CREATED_FIELD, ID_FIELD, VERSION_FIELD,
};

const SELECT_COLUMNS: &str = "SELECT id, data, version, created_on FROM records";

/// A row as stored, before its JSON payload is parsed.
struct RawRecord {
    id: i64,
    data: String,
    version: i64,
    created_on: String,
}

/// Local record store persisted in a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    async fn load(&self, entity: &str, id: i64) -> Result<Option<Record>> {
        let entity = entity.to_string();
        let raw = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("{} WHERE entity = ?1 AND id = ?2", SELECT_COLUMNS))?;
                let raw = stmt
                    .query_row(params![entity, id], raw_from_row)
                    .optional()?;
                Ok(raw)
            })
            .await?;
        raw.map(into_record).transpose()
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn fetch_records(
        &self,
        entity: &str,
        params: &FetchParams,
    ) -> Result<StoreResponse<Vec<Record>>> {
        let entity = entity.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("{} WHERE entity = ?1 ORDER BY id", SELECT_COLUMNS))?;
                let rows = stmt
                    .query_map(params![entity], raw_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut records = rows
            .into_iter()
            .map(|raw| into_record(raw).map(|r| project(&r, &params.fields)))
            .collect::<Result<Vec<_>>>()?;
        sort_records(&mut records, &params.order_by);
        Ok(StoreResponse::ok(Some(records)))
    }

    async fn get_record_by_id(
        &self,
        entity: &str,
        id: i64,
        fields: &[String],
    ) -> Result<StoreResponse<Record>> {
        let record = self.load(entity, id).await?;
        Ok(StoreResponse::ok(record.map(|r| project(&r, fields))))
    }

    async fn create_records(&self, entity: &str, records: Vec<Record>) -> Result<BatchResponse> {
        let payloads = records
            .into_iter()
            .map(|r| serde_json::to_string(&strip_store_fields(r)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let entity_name = entity.to_string();
        let ids = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut ids = Vec::with_capacity(payloads.len());
                for data in payloads {
                    tx.execute(
                        "INSERT INTO records (entity, data) VALUES (?1, ?2)",
                        params![entity_name, data],
                    )?;
                    ids.push(tx.last_insert_rowid());
                }
                tx.commit()?;
                Ok(ids)
            })
            .await?;

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(entity, id).await? {
                Some(record) => results.push(RecordResult::ok(record)),
                None => results.push(RecordResult::failure(format!("record {} vanished", id))),
            }
        }
        Ok(BatchResponse::from_results(results))
    }

    async fn update_records(&self, entity: &str, records: Vec<Record>) -> Result<BatchResponse> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let Some(id) = record_id(&record) else {
                results.push(RecordResult::failure("record is missing Id"));
                continue;
            };
            let patch = serde_json::to_string(&strip_store_fields(record))?;
            let entity_name = entity.to_string();
            let changed = self
                .conn
                .call(move |conn| {
                    let changed = conn.execute(
                        "UPDATE records SET data = json_patch(data, ?1), version = version + 1
                         WHERE entity = ?2 AND id = ?3",
                        params![patch, entity_name, id],
                    )?;
                    Ok(changed)
                })
                .await?;

            if changed == 0 {
                results.push(RecordResult::failure(format!("record {} not found", id)));
                continue;
            }
            match self.load(entity, id).await? {
                Some(updated) => results.push(RecordResult::ok(updated)),
                None => results.push(RecordResult::failure(format!("record {} not found", id))),
            }
        }
        Ok(BatchResponse::from_results(results))
    }

    async fn delete_records(&self, entity: &str, ids: &[i64]) -> Result<BatchResponse> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            let Some(existing) = self.load(entity, id).await? else {
                results.push(RecordResult::failure(format!("record {} not found", id)));
                continue;
            };
            let entity_name = entity.to_string();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        "DELETE FROM records WHERE entity = ?1 AND id = ?2",
                        params![entity_name, id],
                    )?;
                    Ok(())
                })
                .await?;
            results.push(RecordResult::ok(existing));
        }
        Ok(BatchResponse::from_results(results))
    }

    async fn compare_and_swap(
        &self,
        entity: &str,
        id: i64,
        expected_version: i64,
        fields: Record,
    ) -> Result<bool> {
        let patch = serde_json::to_string(&strip_store_fields(fields))?;
        let entity_name = entity.to_string();
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE records SET data = json_patch(data, ?1), version = version + 1
                     WHERE entity = ?2 AND id = ?3 AND version = ?4",
                    params![patch, entity_name, id, expected_version],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed == 1)
    }

    async fn increment_field(
        &self,
        entity: &str,
        id: i64,
        field: &str,
        delta: i64,
    ) -> Result<Record> {
        let path = json_path(field);
        let entity_name = entity.to_string();
        let changed = self
            .conn
            .call(move |conn| {
                // Single statement, so concurrent increments serialize inside SQLite.
                let changed = conn.execute(
                    "UPDATE records
                     SET data = json_set(data, ?1, COALESCE(json_extract(data, ?1), 0) + ?2),
                         version = version + 1
                     WHERE entity = ?3 AND id = ?4",
                    params![path, delta, entity_name, id],
                )?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(AppError::not_found(entity, id));
        }
        self.load(entity, id)
            .await?
            .ok_or_else(|| AppError::not_found(entity, id))
    }

    async fn upsert_by_key(&self, entity: &str, key_field: &str, record: Record) -> Result<Record> {
        let key = record
            .get(key_field)
            .map(serde_json::to_string)
            .transpose()?
            .ok_or_else(|| AppError::Validation(format!("{} is required", key_field)))?;
        let data = serde_json::to_string(&strip_store_fields(record))?;
        let path = json_path(key_field);
        let entity_name = entity.to_string();

        let id = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let existing: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM records
                         WHERE entity = ?1 AND json_quote(json_extract(data, ?2)) = ?3",
                        params![entity_name, path, key],
                        |row| row.get(0),
                    )
                    .optional()?;

                let id = match existing {
                    Some(id) => {
                        tx.execute(
                            "UPDATE records SET data = ?1, version = version + 1 WHERE id = ?2",
                            params![data, id],
                        )?;
                        id
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO records (entity, data) VALUES (?1, ?2)",
                            params![entity_name, data],
                        )?;
                        tx.last_insert_rowid()
                    }
                };
                tx.commit()?;
                Ok(id)
            })
            .await?;

        self.load(entity, id)
            .await?
            .ok_or_else(|| AppError::not_found(entity, id))
    }
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

fn strip_store_fields(mut record: Record) -> Record {
    record.remove(ID_FIELD);
    record.remove(CREATED_FIELD);
    record.remove(VERSION_FIELD);
    record
}

fn raw_from_row(row: &Row) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        data: row.get(1)?,
        version: row.get(2)?,
        created_on: row.get(3)?,
    })
}

fn into_record(raw: RawRecord) -> Result<Record> {
    let mut record = match serde_json::from_str::<Value>(&raw.data)? {
        Value::Object(map) => map,
        other => {
            return Err(AppError::store(
                "records",
                format!("record {} holds {} instead of an object", raw.id, other),
            ))
        }
    };
    record.insert(ID_FIELD.to_string(), Value::from(raw.id));
    record.insert(CREATED_FIELD.to_string(), Value::from(raw.created_on));
    record.insert(VERSION_FIELD.to_string(), Value::from(raw.version));
    Ok(record)
}
