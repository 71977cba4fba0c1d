//! Service trait for catalog persistence

use crate::core::Data;
use anyhow::Result;
use async_trait::async_trait;

/// Service trait for managing data entities
///
/// Implementations provide the four operations the catalog needs from a
/// document store. Records are never updated or deleted. The framework is
/// agnostic to the underlying storage mechanism.
#[async_trait]
pub trait DataService<T: Data>: Send + Sync {
    /// Insert a new entity and return the stored record
    async fn create(&self, entity: T) -> Result<T>;

    /// Get an entity by ID (exact string match)
    ///
    /// Returns `Ok(None)` when no record has this id.
    async fn get(&self, id: &str) -> Result<Option<T>>;

    /// List all entities in persisted insertion order
    async fn list(&self) -> Result<Vec<T>>;

    /// Find entities whose stored attribute equals `value`, in insertion order
    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>>;
}
