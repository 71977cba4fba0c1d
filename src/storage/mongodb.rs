//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides `MongoDataService<T>` backed by a MongoDB database via
//! `mongodb::Database`.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag.
//!
//! # Storage model
//!
//! One collection per entity type, named after `T::resource_name()`
//! (`books`, `authors`). Documents are returned in natural order, which is
//! the insertion order for collections that only ever receive inserts.
//!
//! # Serialization strategy
//!
//! Entities are serialized via `serde_json::Value` as an intermediate format,
//! then converted to BSON documents. The `id` field is mapped to MongoDB's
//! `_id` convention and stored as a plain string.

use crate::core::{Data, DataService, StorageError};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::{Client, Database};

const BACKEND: &str = "mongodb";

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Connect to a MongoDB deployment and return a handle to `database`.
///
/// The driver connects lazily, so a `ping` is issued to surface an
/// unreachable server at startup instead of on the first request.
pub async fn connect(uri: &str, database: &str) -> std::result::Result<Database, StorageError> {
    let client = Client::with_uri_str(uri)
        .await
        .map_err(|e| StorageError::ConnectionError {
            backend: BACKEND.to_string(),
            message: e.to_string(),
        })?;

    let db = client.database(database);
    db.run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| StorageError::ConnectionError {
            backend: BACKEND.to_string(),
            message: e.to_string(),
        })?;

    tracing::info!(database, "connected to MongoDB");
    Ok(db)
}

/// Wrap a driver failure as a typed storage error
fn query_error(action: String, err: mongodb::error::Error) -> StorageError {
    StorageError::QueryError {
        backend: BACKEND.to_string(),
        message: format!("{}: {}", action, err),
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a serde_json::Value (expected to be an Object) into a BSON Document,
/// renaming `id` → `_id` for MongoDB convention.
fn json_to_document(json: serde_json::Value) -> Result<Document> {
    let bson_val = mongodb::bson::to_bson(&json)
        .map_err(|e| anyhow!("Failed to convert JSON to BSON: {}", e))?;

    let mut doc = match bson_val {
        Bson::Document(d) => d,
        _ => return Err(anyhow!("Expected BSON document, got non-object")),
    };

    if let Some(id) = doc.remove("id") {
        doc.insert("_id", id);
    }

    Ok(doc)
}

/// Convert a BSON Document back into a serde_json::Value,
/// renaming `_id` → `id` for domain entity convention.
fn document_to_json(mut doc: Document) -> serde_json::Value {
    if let Some(id) = doc.remove("_id") {
        doc.insert("id", id);
    }

    Bson::Document(doc).into_relaxed_extjson()
}

/// Build the equality filter for `search`.
///
/// Values arrive as strings but attributes such as `age` are stored as BSON
/// integers, so integer-looking values match either representation.
fn equality_filter(field: &str, value: &str) -> Document {
    let field = if field == "id" { "_id" } else { field };

    match value.parse::<i64>() {
        Ok(i) => {
            let mut variants = vec![Bson::String(value.to_string()), Bson::Int64(i)];
            if let Ok(small) = i32::try_from(i) {
                variants.push(Bson::Int32(small));
            }
            doc! { field: { "$in": variants } }
        }
        Err(_) => doc! { field: value },
    }
}

// ---------------------------------------------------------------------------
// MongoDataService<T>
// ---------------------------------------------------------------------------

/// Generic data storage service backed by MongoDB.
///
/// # Example
///
/// ```rust,ignore
/// use bookshelf::storage::{MongoDataService, mongodb::connect};
///
/// let db = connect("mongodb://localhost:27017", "bookshelf").await?;
/// let books = MongoDataService::<Book>::new(db);
/// let created = books.create(Book::new("Dune", "sci-fi", author_id)).await?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoDataService<T> {
    database: Database,
    _marker: std::marker::PhantomData<T>,
}

impl<T> MongoDataService<T> {
    /// Create a new `MongoDataService` with the given database handle.
    pub fn new(database: Database) -> Self {
        Self {
            database,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }
}

impl<T: Data> MongoDataService<T> {
    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(T::resource_name())
    }

    /// Create single-field indexes on every indexed attribute except `id`.
    ///
    /// Idempotent, safe to call on every startup. For books this covers the
    /// `authorID` lookup behind `Author.books`.
    pub async fn ensure_indexes(&self) -> Result<()> {
        use mongodb::IndexModel;

        let indexes: Vec<IndexModel> = T::indexed_fields()
            .iter()
            .filter(|field| **field != "id")
            .map(|field| {
                let key: &str = field;
                IndexModel::builder().keys(doc! { key: 1 }).build()
            })
            .collect();

        if indexes.is_empty() {
            return Ok(());
        }

        self.collection()
            .create_indexes(indexes)
            .await
            .map_err(|e| query_error(format!("create indexes on {}", T::resource_name()), e))?;

        Ok(())
    }

    fn entity_to_document(entity: &T) -> Result<Document> {
        let json = serde_json::to_value(entity)
            .map_err(|e| anyhow!("Failed to serialize entity: {}", e))?;
        json_to_document(json)
    }

    fn document_to_entity(doc: Document) -> Result<T> {
        let json = document_to_json(doc);
        serde_json::from_value(json)
            .map_err(|e| anyhow!("Failed to deserialize entity from document: {}", e))
    }

    async fn find(&self, filter: Document) -> Result<Vec<T>> {
        let cursor = self
            .collection()
            .find(filter)
            .await
            .map_err(|e| query_error(format!("query {}", T::resource_name()), e))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| query_error(format!("collect {}", T::resource_name()), e))?;

        docs.into_iter().map(Self::document_to_entity).collect()
    }
}

#[async_trait]
impl<T: Data> DataService<T> for MongoDataService<T> {
    /// Insert the document and read it back to return the stored version.
    async fn create(&self, entity: T) -> Result<T> {
        let doc = Self::entity_to_document(&entity)?;
        let id = entity.id().to_string();

        self.collection()
            .insert_one(doc)
            .await
            .map_err(|e| query_error(format!("create {}", T::resource_name_singular()), e))?;

        tracing::debug!(collection = T::resource_name(), id = %id, "inserted document");

        let result = self
            .collection()
            .find_one(doc! { "_id": &id })
            .await
            .map_err(|e| query_error(format!("read back {} {}", T::resource_name_singular(), id), e))?
            .ok_or_else(|| anyhow!("Entity not found after insert"))?;

        Self::document_to_entity(result)
    }

    async fn get(&self, id: &str) -> Result<Option<T>> {
        let doc = self
            .collection()
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| query_error(format!("get {}", T::resource_name_singular()), e))?;

        doc.map(Self::document_to_entity).transpose()
    }

    async fn list(&self) -> Result<Vec<T>> {
        self.find(doc! {}).await
    }

    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>> {
        self.find(equality_filter(field, value)).await
    }
}
