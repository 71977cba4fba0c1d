//! Core module containing fundamental traits and types for the catalog

pub mod entity;
pub mod error;
pub mod field;
pub mod service;

pub use entity::{Data, Entity};
pub use error::{CatalogError, CatalogResult, ConfigError, GraphQLError, StorageError};
pub use field::FieldValue;
pub use service::DataService;
