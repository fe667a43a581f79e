use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;
use std::sync::Arc;
use uuid::Uuid;

use super::r#trait::WorkerDetailsRepository;
use crate::core::client::database::constant::WORKER_DETAILS_COLLECTION;
use crate::core::client::database::error::DatabaseError;
use crate::core::client::database::mongo_client::MongoClient;
use crate::types::worker_details::WorkerDetails;

pub struct MongoWorkerDetailsRepository {
    client: Arc<MongoClient>,
}

impl MongoWorkerDetailsRepository {
    pub fn new(client: Arc<MongoClient>) -> Self {
        Self { client }
    }

    fn worker_filter(worker_name: &str, internal_id: Uuid) -> Document {
        doc! {
            "worker_name": worker_name,
            "worker_internal_id": internal_id.to_string(),
        }
    }
}

#[async_trait]
impl WorkerDetailsRepository for MongoWorkerDetailsRepository {
    async fn ensure_indexes(&self) -> Result<(), DatabaseError> {
        let index = IndexModel::builder()
            .keys(doc! { "worker_name": 1, "worker_internal_id": 1 })
            .options(IndexOptions::builder().name("worker_name_1_worker_internal_id_1".to_string()).build())
            .build();

        self.client.create_indexes::<WorkerDetails>(WORKER_DETAILS_COLLECTION, vec![index]).await
    }

    async fn find_worker(&self, worker_name: &str, internal_id: Uuid) -> Result<Option<WorkerDetails>, DatabaseError> {
        self.client.find_one(WORKER_DETAILS_COLLECTION, Self::worker_filter(worker_name, internal_id), None).await
    }

    async fn insert_worker(&self, details: WorkerDetails) -> Result<(), DatabaseError> {
        self.client.insert_one(WORKER_DETAILS_COLLECTION, &details).await
    }

    async fn touch_worker(&self, worker_name: &str, internal_id: Uuid, at: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let update = doc! {
            "$set": { "last_operation_timestamp": Bson::DateTime(at.into()) }
        };
        let result = self
            .client
            .update_one::<WorkerDetails>(WORKER_DETAILS_COLLECTION, Self::worker_filter(worker_name, internal_id), update)
            .await?;
        Ok(result.matched_count)
    }

    async fn set_progress(
        &self,
        worker_name: &str,
        internal_id: Uuid,
        at: DateTime<Utc>,
        message: String,
    ) -> Result<u64, DatabaseError> {
        let update = doc! {
            "$set": {
                "last_operation_timestamp": Bson::DateTime(at.into()),
                "last_operation_message": message,
            }
        };
        let result = self
            .client
            .update_one::<WorkerDetails>(WORKER_DETAILS_COLLECTION, Self::worker_filter(worker_name, internal_id), update)
            .await?;
        Ok(result.matched_count)
    }
}
