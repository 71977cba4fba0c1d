//! Author entity

use serde::{Deserialize, Serialize};

use crate::core::{Data, Entity, FieldValue};

/// A book author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    /// Unique identifier, assigned on creation
    pub id: String,
    pub name: String,
    pub age: i32,
}

impl Author {
    /// Build a new author with a freshly generated id
    pub fn new(name: impl Into<String>, age: i32) -> Self {
        Self {
            id: Self::generate_id(),
            name: name.into(),
            age,
        }
    }
}

impl Entity for Author {
    fn resource_name() -> &'static str {
        "authors"
    }

    fn resource_name_singular() -> &'static str {
        "author"
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl Data for Author {
    fn name(&self) -> &str {
        &self.name
    }

    fn indexed_fields() -> &'static [&'static str] {
        &["id", "name", "age"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::String(self.id.clone())),
            "name" => Some(FieldValue::String(self.name.clone())),
            "age" => Some(FieldValue::Integer(i64::from(self.age))),
            _ => None,
        }
    }
}
