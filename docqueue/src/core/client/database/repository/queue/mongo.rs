use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::IndexModel;
use std::sync::Arc;
use tracing::debug;

use super::r#trait::QueueRepository;
use crate::core::client::database::error::DatabaseError;
use crate::core::client::database::mongo_client::MongoClient;
use crate::types::message::{now, QueueMessage, UNCLAIMED};

pub struct MongoQueueRepository {
    client: Arc<MongoClient>,
    collection: String,
}

impl MongoQueueRepository {
    pub fn new(client: Arc<MongoClient>, collection: impl Into<String>) -> Self {
        Self { client, collection: collection.into() }
    }

    fn pending_filter() -> Document {
        doc! {
            "claimant": UNCLAIMED,
            "processed": false,
        }
    }

    fn claimant_filter(worker_name: &str) -> Document {
        doc! { "claimant": worker_name }
    }

    fn fifo_sort() -> Document {
        doc! { "last_changed": 1, "_id": 1 }
    }
}

#[async_trait]
impl QueueRepository for MongoQueueRepository {
    async fn ensure_indexes(&self) -> Result<(), DatabaseError> {
        let indexes = ["last_changed", "claimant", "processed"]
            .into_iter()
            .map(|field| {
                let mut keys = Document::new();
                keys.insert(field, 1);
                IndexModel::builder()
                    .keys(keys)
                    .options(IndexOptions::builder().name(format!("{}_1", field)).build())
                    .build()
            })
            .collect();

        self.client.create_indexes::<QueueMessage>(&self.collection, indexes).await?;
        debug!(collection = %self.collection, "Queue indexes provisioned");
        Ok(())
    }

    async fn insert_message(&self, message: QueueMessage) -> Result<(), DatabaseError> {
        self.client.insert_one(&self.collection, &message).await
    }

    async fn find_claimed_by(&self, worker_name: &str) -> Result<Option<QueueMessage>, DatabaseError> {
        self.client.find_one(&self.collection, Self::claimant_filter(worker_name), Some(Self::fifo_sort())).await
    }

    async fn claim_next(&self, worker_name: &str) -> Result<Option<QueueMessage>, DatabaseError> {
        let update = doc! {
            "$set": {
                "claimant": worker_name,
                "last_changed": Bson::DateTime(now().into()),
            }
        };

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .sort(Self::fifo_sort())
            .build();

        let result = self
            .client
            .find_one_and_update::<QueueMessage>(&self.collection, Self::pending_filter(), update, options)
            .await?;

        if let Some(ref message) = result {
            debug!(
                message_id = %message.id,
                worker_name = worker_name,
                collection = %self.collection,
                "Claimed queue message"
            );
        }

        Ok(result)
    }

    async fn delete_claimed(&self, worker_name: &str) -> Result<u64, DatabaseError> {
        self.client.delete_one::<QueueMessage>(&self.collection, Self::claimant_filter(worker_name)).await
    }

    async fn release_claimed(
        &self,
        worker_name: &str,
        payload: String,
        processed: bool,
        at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let update = doc! {
            "$set": {
                "claimant": UNCLAIMED,
                "processed": processed,
                "last_changed": Bson::DateTime(at.into()),
                "payload": payload,
            }
        };

        let result = self
            .client
            .update_one::<QueueMessage>(&self.collection, Self::claimant_filter(worker_name), update)
            .await?;
        Ok(result.matched_count)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<QueueMessage>, DatabaseError> {
        self.client.find_one(&self.collection, doc! { "_id": id }, None).await
    }

    async fn count_pending(&self) -> Result<u64, DatabaseError> {
        self.client.count::<QueueMessage>(&self.collection, Self::pending_filter()).await
    }
}
