use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::Entity;
use crate::notify::Notifier;
use crate::store::{record_id, FetchParams, RecordStore, ID_FIELD};

/// CRUD for one entity type over the record store.
///
/// The `try_*` methods propagate every failure. The plain methods are for
/// callers that only need a value: they log the failure, push a notice and
/// fall back to an empty list, `None` or `false`.
pub struct EntityService<E: Entity> {
    store: Arc<dyn RecordStore>,
    notifier: Notifier,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: self.notifier.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityService<E> {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Notifier) -> Self {
        Self {
            store,
            notifier,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Records that fail to decode are logged and skipped.
    pub async fn try_get_all(&self) -> Result<Vec<E>> {
        let params = FetchParams {
            fields: E::fields(),
            order_by: E::order_by(),
        };
        let records = self
            .store
            .fetch_records(E::NAME, &params)
            .await?
            .into_result(E::NAME)?
            .unwrap_or_default();
        Ok(records
            .into_iter()
            .filter_map(|record| {
                let id = record_id(&record);
                match E::from_record(record) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        tracing::warn!(entity = E::NAME, ?id, "Skipping undecodable record: {}", e);
                        None
                    }
                }
            })
            .collect())
    }

    pub async fn try_get_by_id(&self, id: i64) -> Result<Option<E>> {
        self.store
            .get_record_by_id(E::NAME, id, &E::fields())
            .await?
            .into_result(E::NAME)?
            .map(E::from_record)
            .transpose()
    }

    pub async fn try_create(&self, draft: &E::Draft) -> Result<E> {
        let record = E::draft_record(draft)?;
        let created = self
            .store
            .create_records(E::NAME, vec![record])
            .await?
            .into_records(E::NAME, "create")?;
        let record = created
            .into_iter()
            .next()
            .ok_or_else(|| AppError::store(E::NAME, "create returned no record"))?;
        E::from_record(record)
    }

    /// Sparse update: only the fields set on `patch` are written.
    pub async fn try_update(&self, id: i64, patch: &E::Patch) -> Result<E> {
        let mut record = E::patch_record(patch)?;
        record.insert(ID_FIELD.to_string(), Value::from(id));
        let updated = self
            .store
            .update_records(E::NAME, vec![record])
            .await?
            .into_records(E::NAME, "update")?;
        let record = updated
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(E::NAME, id))?;
        E::from_record(record)
    }

    pub async fn try_delete(&self, id: i64) -> Result<()> {
        self.store
            .delete_records(E::NAME, &[id])
            .await?
            .into_records(E::NAME, "delete")?;
        Ok(())
    }

    /// Insert `draft`, replacing any record with the same value in `key_field`.
    pub async fn try_upsert_by_key(&self, key_field: &str, draft: &E::Draft) -> Result<E> {
        let record = E::draft_record(draft)?;
        let stored = self.store.upsert_by_key(E::NAME, key_field, record).await?;
        E::from_record(stored)
    }

    pub async fn get_all(&self) -> Vec<E> {
        match self.try_get_all().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(entity = E::NAME, "Error fetching records: {}", e);
                self.notifier.error(format!("Failed to fetch {} records", E::LABEL));
                Vec::new()
            }
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Option<E> {
        match self.try_get_by_id(id).await {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(entity = E::NAME, id, "Error fetching record: {}", e);
                self.notifier.error(format!("Failed to fetch {}", E::LABEL));
                None
            }
        }
    }

    pub async fn create(&self, draft: &E::Draft) -> Option<E> {
        match self.try_create(draft).await {
            Ok(item) => {
                self.notifier.success(format!("Created {}", E::LABEL));
                Some(item)
            }
            Err(e) => {
                tracing::error!(entity = E::NAME, "Error creating record: {}", e);
                self.notifier.error(format!("Failed to create {}", E::LABEL));
                None
            }
        }
    }

    pub async fn update(&self, id: i64, patch: &E::Patch) -> Option<E> {
        match self.try_update(id, patch).await {
            Ok(item) => {
                self.notifier.success(format!("Updated {}", E::LABEL));
                Some(item)
            }
            Err(e) => {
                tracing::error!(entity = E::NAME, id, "Error updating record: {}", e);
                self.notifier.error(format!("Failed to update {}", E::LABEL));
                None
            }
        }
    }

    pub async fn delete(&self, id: i64) -> bool {
        match self.try_delete(id).await {
            Ok(()) => {
                self.notifier.success(format!("Deleted {}", E::LABEL));
                true
            }
            Err(e) => {
                tracing::error!(entity = E::NAME, id, "Error deleting record: {}", e);
                self.notifier.error(format!("Failed to delete {}", E::LABEL));
                false
            }
        }
    }
}
