use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};

use super::{
    optimistic_increment, BatchResponse, FetchParams, Record, RecordStore, StoreResponse,
};

#[derive(Debug, Serialize)]
struct RecordsRequest {
    records: Vec<Record>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    #[serde(rename = "RecordIds")]
    record_ids: &'a [i64],
}

#[derive(Debug, Serialize)]
struct ConditionalUpdateRequest {
    records: Vec<Record>,
    #[serde(rename = "expectedVersion")]
    expected_version: i64,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    #[serde(rename = "keyField")]
    key_field: &'a str,
    record: Record,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for the hosted record service.
pub struct RemoteStore {
    client: Client,
    base_url: String,
    project_id: String,
    public_key: String,
}

impl RemoteStore {
    pub fn new(
        base_url: &str,
        project_id: String,
        public_key: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("bonus-boost/1.0")
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            public_key,
        })
    }

    /// Build a client from validated config; missing credentials are a config error.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let remote = &config.remote;
        let missing = |name: &str| AppError::Config(format!("remote.{} is not set", name));
        Self::new(
            remote.base_url.as_deref().ok_or_else(|| missing("base_url"))?,
            remote.project_id.clone().ok_or_else(|| missing("project_id"))?,
            remote.public_key.clone().ok_or_else(|| missing("public_key"))?,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn endpoint(&self, entity: &str, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, entity, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-Project-Id", &self.project_id)
            .bearer_auth(&self.public_key)
    }

    async fn send_batch(&self, entity: &str, request: RequestBuilder) -> Result<BatchResponse> {
        let response = self.authorized(request).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(entity, response).await);
        }
        Ok(response.json().await?)
    }
}

async fn error_from_response(entity: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody { message: Some(m) }) => m,
        _ => format!("HTTP {}", status),
    };
    AppError::store(entity, message)
}

#[async_trait]
impl RecordStore for RemoteStore {
    async fn fetch_records(
        &self,
        entity: &str,
        params: &FetchParams,
    ) -> Result<StoreResponse<Vec<Record>>> {
        tracing::debug!(entity, "Fetching records");
        let response = self
            .authorized(self.client.post(self.endpoint(entity, "fetch")))
            .json(params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(entity, response).await);
        }
        Ok(response.json().await?)
    }

    async fn get_record_by_id(
        &self,
        entity: &str,
        id: i64,
        fields: &[String],
    ) -> Result<StoreResponse<Record>> {
        tracing::debug!(entity, id, "Fetching record");
        let response = self
            .authorized(self.client.get(self.endpoint(entity, &id.to_string())))
            .query(&[("fields", fields.join(","))])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(StoreResponse::ok(None));
        }
        if !response.status().is_success() {
            return Err(error_from_response(entity, response).await);
        }
        Ok(response.json().await?)
    }

    async fn create_records(&self, entity: &str, records: Vec<Record>) -> Result<BatchResponse> {
        let request = self
            .client
            .post(self.endpoint(entity, "records"))
            .json(&RecordsRequest { records });
        self.send_batch(entity, request).await
    }

    async fn update_records(&self, entity: &str, records: Vec<Record>) -> Result<BatchResponse> {
        let request = self
            .client
            .put(self.endpoint(entity, "records"))
            .json(&RecordsRequest { records });
        self.send_batch(entity, request).await
    }

    async fn delete_records(&self, entity: &str, ids: &[i64]) -> Result<BatchResponse> {
        let request = self
            .client
            .delete(self.endpoint(entity, "records"))
            .json(&DeleteRequest { record_ids: ids });
        self.send_batch(entity, request).await
    }

    async fn compare_and_swap(
        &self,
        entity: &str,
        id: i64,
        expected_version: i64,
        mut fields: Record,
    ) -> Result<bool> {
        fields.insert(super::ID_FIELD.to_string(), id.into());
        let response = self
            .authorized(self.client.put(self.endpoint(entity, "records")))
            .json(&ConditionalUpdateRequest {
                records: vec![fields],
                expected_version,
            })
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(error_from_response(entity, response).await);
        }
        let batch: BatchResponse = response.json().await?;
        batch.into_records(entity, "update")?;
        Ok(true)
    }

    async fn increment_field(
        &self,
        entity: &str,
        id: i64,
        field: &str,
        delta: i64,
    ) -> Result<Record> {
        optimistic_increment(self, entity, id, field, delta).await
    }

    async fn upsert_by_key(&self, entity: &str, key_field: &str, record: Record) -> Result<Record> {
        let response = self
            .authorized(self.client.post(self.endpoint(entity, "upsert")))
            .json(&UpsertRequest { key_field, record })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(entity, response).await);
        }
        let body: StoreResponse<Record> = response.json().await?;
        body.into_result(entity)?
            .ok_or_else(|| AppError::store(entity, "upsert returned no record"))
    }
}
