//! In-memory implementation of DataService for testing and development

use crate::core::{Data, DataService};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

/// In-memory data service implementation
///
/// Records are kept in an `IndexMap` keyed by id, so `list` and `search`
/// return them in insertion order. Uses RwLock for thread-safe access;
/// clones share the same underlying collection.
#[derive(Clone)]
pub struct InMemoryDataService<T> {
    entities: Arc<RwLock<IndexMap<String, T>>>,
}

impl<T> InMemoryDataService<T> {
    /// Create a new, empty in-memory data service
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(IndexMap::new())),
        }
    }
}

impl<T: Data> InMemoryDataService<T> {
    /// Create a service pre-populated with records, kept in the given order
    pub fn with_data(entities: Vec<T>) -> Self {
        Self {
            entities: Arc::new(RwLock::new(
                entities
                    .into_iter()
                    .map(|entity| (entity.id().to_string(), entity))
                    .collect(),
            )),
        }
    }
}

impl<T> Default for InMemoryDataService<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Data> DataService<T> for InMemoryDataService<T> {
    async fn create(&self, entity: T) -> Result<T> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if entities.contains_key(entity.id()) {
            return Err(anyhow!(
                "{} with id '{}' already exists",
                T::resource_name_singular(),
                entity.id()
            ));
        }

        entities.insert(entity.id().to_string(), entity.clone());

        tracing::debug!(
            collection = T::resource_name(),
            id = entity.id(),
            "inserted record"
        );

        Ok(entity)
    }

    async fn get(&self, id: &str) -> Result<Option<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(entities.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(entities.values().cloned().collect())
    }

    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(entities
            .values()
            .filter(|entity| {
                entity
                    .field_value(field)
                    .is_some_and(|field_value| field_value.matches(value))
            })
            .cloned()
            .collect())
    }
}
