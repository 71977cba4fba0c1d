//! Entity traits defining the core abstraction for catalog records

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::field::FieldValue;

/// Base trait for every record kept by the catalog.
///
/// All entities have:
/// - id: unique, system-generated identifier (opaque string)
/// - a resource name, which doubles as the storage collection name
///
/// Ids are compared by exact string equality everywhere in the crate.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// The plural resource name used for collections (e.g., "books", "authors")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g., "book", "author")
    fn resource_name_singular() -> &'static str;

    /// Get the unique identifier for this entity instance
    fn id(&self) -> &str;

    /// Generate a fresh identifier for a record about to be inserted
    fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Trait for data entities that can be searched by attribute.
///
/// Data entities extend the base Entity with:
/// - name: A human-readable name
/// - indexed_fields: Attributes usable in equality filters
/// - field_value: Dynamic attribute access by stored name
pub trait Data: Entity {
    /// Get the name of this data entity
    fn name(&self) -> &str;

    /// List of stored attribute names that can be used with `DataService::search`
    fn indexed_fields() -> &'static [&'static str];

    /// Get the value of a stored attribute by its external name
    fn field_value(&self, field: &str) -> Option<FieldValue>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct TestEntity {
        id: String,
        name: String,
    }

    impl Entity for TestEntity {
        fn resource_name() -> &'static str {
            "test_entities"
        }

        fn resource_name_singular() -> &'static str {
            "test_entity"
        }

        fn id(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn test_entity_metadata() {
        assert_eq!(TestEntity::resource_name(), "test_entities");
        assert_eq!(TestEntity::resource_name_singular(), "test_entity");
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = TestEntity::generate_id();
        let b = TestEntity::generate_id();
        assert_ne!(a, b);
        assert!(!a.is_empty());

        let entity = TestEntity {
            id: a.clone(),
            name: "x".to_string(),
        };
        assert_eq!(entity.id(), a);
    }
}
