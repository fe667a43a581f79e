pub mod helpers;

use self::helpers::record_metrics;
use crate::core::client::database::error::DatabaseError;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, FindOneAndUpdateOptions, FindOneOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Generic MongoDB client with no queue knowledge
///
/// This is the store binding every repository goes through. It exposes the
/// handful of primitives the queue protocol needs:
/// - unconditional insert, update and delete
/// - single-document lookups with an optional sort
/// - the atomic find-and-update used for claiming
/// - index provisioning and health checks
pub struct MongoClient {
    client: Client,
    database: Arc<Database>,
}

impl MongoClient {
    /// Create a new MongoClient connection
    pub async fn new(connection_uri: &str, database_name: &str) -> Result<Self, DatabaseError> {
        Self::with_pool_size(connection_uri, database_name, None).await
    }

    /// Create a new connection with an explicit upper bound on the driver's connection pool
    pub async fn with_pool_size(
        connection_uri: &str,
        database_name: &str,
        max_pool_size: Option<u32>,
    ) -> Result<Self, DatabaseError> {
        if connection_uri.trim().is_empty() {
            return Err(DatabaseError::InvalidConnectionSettings("connection uri is empty".to_string()));
        }
        if database_name.trim().is_empty() {
            return Err(DatabaseError::InvalidConnectionSettings("database name is empty".to_string()));
        }

        let mut options = ClientOptions::parse(connection_uri).await?;
        if max_pool_size.is_some() {
            options.max_pool_size = max_pool_size;
        }
        let client = Client::with_options(options)?;
        let database = Arc::new(client.database(database_name));
        Ok(Self { client, database })
    }

    /// Get a typed collection
    pub fn collection<T>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    /// Get the underlying MongoDB client (for advanced usage)
    pub fn client(&self) -> &Client {
        &self.client
    }

    // =========================================================================
    // Generic CRUD Operations
    // =========================================================================

    /// Find a single document, taking the first one in `sort` order when given
    pub async fn find_one<T>(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Option<T>, DatabaseError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        record_metrics("find_one", || async {
            let options = FindOneOptions::builder().sort(sort).build();
            Ok(self.collection::<T>(collection).find_one(filter, options).await?)
        })
        .await
    }

    /// Insert a single document
    pub async fn insert_one<T>(&self, collection: &str, doc: &T) -> Result<(), DatabaseError>
    where
        T: Serialize + Send + Sync,
    {
        record_metrics("insert_one", || async {
            self.collection::<T>(collection).insert_one(doc, None).await?;
            Ok(())
        })
        .await
    }

    /// Update a single document
    pub async fn update_one<T>(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, DatabaseError>
    where
        T: Send + Sync,
    {
        record_metrics("update_one", || async {
            let result = self.collection::<T>(collection).update_one(filter, update, None).await?;
            Ok(UpdateResult { matched_count: result.matched_count, modified_count: result.modified_count })
        })
        .await
    }

    /// Find one and update atomically
    ///
    /// The server selects the first document matching `filter` in the sort order
    /// carried by `options` and applies `update` in a single indivisible step.
    pub async fn find_one_and_update<T>(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        options: FindOneAndUpdateOptions,
    ) -> Result<Option<T>, DatabaseError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        record_metrics("find_one_and_update", || async {
            Ok(self.collection::<T>(collection).find_one_and_update(filter, update, options).await?)
        })
        .await
    }

    /// Count documents matching filter
    pub async fn count<T>(&self, collection: &str, filter: Document) -> Result<u64, DatabaseError>
    where
        T: Send + Sync,
    {
        record_metrics("count", || async { Ok(self.collection::<T>(collection).count_documents(filter, None).await?) })
            .await
    }

    /// Delete a single document
    pub async fn delete_one<T>(&self, collection: &str, filter: Document) -> Result<u64, DatabaseError>
    where
        T: Send + Sync,
    {
        record_metrics("delete_one", || async {
            let result = self.collection::<T>(collection).delete_one(filter, None).await?;
            Ok(result.deleted_count)
        })
        .await
    }

    // =========================================================================
    // Index Management
    // =========================================================================

    /// Create indexes on a collection. Creating an index that already exists is a no-op.
    pub async fn create_indexes<T>(&self, collection: &str, indexes: Vec<IndexModel>) -> Result<(), DatabaseError>
    where
        T: Send + Sync,
    {
        record_metrics("create_indexes", || async {
            self.collection::<T>(collection).create_indexes(indexes, None).await?;
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Health Check
    // =========================================================================

    /// Health check - ping the database
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        record_metrics("health_check", || async {
            self.database.run_command(doc! { "ping": 1 }, None).await?;
            Ok(())
        })
        .await
    }
}

/// Result of an update operation
#[derive(Debug, Clone, Copy)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}
