//! # Bookshelf
//!
//! A book and author catalog served over GraphQL.
//!
//! ## Features
//!
//! - **Schema as data**: types, fields and resolvers live in an explicit
//!   `SchemaRegistry`; nothing is derived by reflection
//! - **Cross-type resolution**: `Book.authorID` resolves to its `Author`,
//!   `Author.books` to every book referencing the author
//! - **Partial responses**: a failing field becomes `null` with an entry in
//!   `errors` while its siblings still resolve
//! - **Pluggable storage**: in-memory collections by default, MongoDB behind
//!   the `mongodb_backend` feature
//! - **Configuration-based**: YAML file plus environment overrides
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bookshelf::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     ServerBuilder::new()
//!         .with_in_memory_storage()
//!         .serve()
//!         .await
//! }
//! ```
//!
//! Then:
//!
//! ```text
//! curl -X POST localhost:4000/graphql -H 'content-type: application/json' \
//!      -d '{"query":"mutation { addAuthor(name: \"Ann\", age: 30) { id } }"}'
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        CatalogError, CatalogResult,
        entity::{Data, Entity},
        field::FieldValue,
        service::DataService,
    };

    // === Entities ===
    pub use crate::entities::{Author, Book};

    // === Storage ===
    pub use crate::storage::{InMemoryDataService, seed_catalog};
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoDataService;

    // === Config ===
    pub use crate::config::{AppConfig, LoggingConfig, ServerConfig, StorageConfig};

    // === Server ===
    pub use crate::server::exposure::graphql::{
        FieldDef, GraphQLExecutor, GraphQLRequest, ObjectType, Response, SchemaRegistry, TypeRef,
        catalog_schema,
    };
    pub use crate::server::{ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};

    // === Axum ===
    pub use axum::{Router, routing::get};
}
