//! Book entity

use serde::{Deserialize, Serialize};

use crate::core::{Data, Entity, FieldValue};

/// A catalogued book
///
/// `author_id` is stored and exposed under the name `authorID`. It is never
/// checked against the authors collection, so it may dangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier, assigned on creation
    pub id: String,
    pub name: String,
    pub genre: String,
    #[serde(rename = "authorID")]
    pub author_id: String,
}

impl Book {
    /// Build a new book with a freshly generated id
    pub fn new(
        name: impl Into<String>,
        genre: impl Into<String>,
        author_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            name: name.into(),
            genre: genre.into(),
            author_id: author_id.into(),
        }
    }
}

impl Entity for Book {
    fn resource_name() -> &'static str {
        "books"
    }

    fn resource_name_singular() -> &'static str {
        "book"
    }

    fn id(&self) -> &str {
        &self.id
    }
}

impl Data for Book {
    fn name(&self) -> &str {
        &self.name
    }

    fn indexed_fields() -> &'static [&'static str] {
        &["id", "name", "genre", "authorID"]
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::String(self.id.clone())),
            "name" => Some(FieldValue::String(self.name.clone())),
            "genre" => Some(FieldValue::String(self.genre.clone())),
            "authorID" => Some(FieldValue::String(self.author_id.clone())),
            _ => None,
        }
    }
}
