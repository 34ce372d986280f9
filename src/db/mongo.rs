//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::TryStreamExt;
use mongodb::{
    options::{ClientOptions, IndexOptions, ReturnDocument},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::BattleError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping, failing fast if the server is unreachable
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, BattleError> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast on an unreachable server instead of hanging at startup
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| BattleError::Database(format!("Invalid MongoDB URI: {}", e)))?;
        options.server_selection_timeout = Some(Duration::from_secs(3));
        options.connect_timeout = Some(Duration::from_secs(3));
        options.app_name.get_or_insert_with(|| "meme-battle".to_string());

        let client = Client::with_options(options)
            .map_err(|e| BattleError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| BattleError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its indexes applied
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, BattleError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Open a collection and apply its indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, BattleError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), BattleError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| BattleError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps.
    ///
    /// Unique index violations come back as `Conflict`.
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, BattleError> {
        item.mut_metadata().stamp();

        let result = self.inner.insert_one(item).await?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| BattleError::Database("Failed to get inserted ID".into()))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, BattleError> {
        Ok(self.inner.find_one(filter).await?)
    }

    /// Find many documents, optionally sorted and limited
    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
        limit: Option<i64>,
    ) -> Result<Vec<T>, BattleError> {
        let mut find = self.inner.find(filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        if let Some(limit) = limit {
            find = find.limit(limit);
        }

        let cursor = find.await?;
        Ok(cursor.try_collect().await?)
    }

    /// `$set` the given fields and stamp `metadata.updated_at`.
    ///
    /// Returns the document after the update, or None if nothing matched.
    pub async fn set_fields(
        &self,
        filter: Document,
        mut fields: Document,
    ) -> Result<Option<T>, BattleError> {
        fields.insert("metadata.updated_at", DateTime::now());

        Ok(self
            .inner
            .find_one_and_update(filter, doc! { "$set": fields })
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// `$set` without reading the document back. Returns whether one matched.
    pub async fn set_fields_quiet(
        &self,
        filter: Document,
        mut fields: Document,
    ) -> Result<bool, BattleError> {
        fields.insert("metadata.updated_at", DateTime::now());

        let result = self.inner.update_one(filter, doc! { "$set": fields }).await?;
        Ok(result.matched_count > 0)
    }

    /// Hard delete one document
    pub async fn delete_one(&self, filter: Document) -> Result<bool, BattleError> {
        let result = self.inner.delete_one(filter).await?;
        Ok(result.deleted_count > 0)
    }

    /// Hard delete every matching document
    pub async fn delete_many(&self, filter: Document) -> Result<u64, BattleError> {
        let result = self.inner.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    /// Count matching documents
    pub async fn count(&self, filter: Document) -> Result<u64, BattleError> {
        Ok(self.inner.count_documents(filter).await?)
    }

    /// Run an aggregation pipeline, returning raw documents
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>, BattleError> {
        let cursor = self.inner.aggregate(pipeline).await?;
        Ok(cursor.try_collect().await?)
    }
}
