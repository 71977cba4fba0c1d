//! Server host for transport-agnostic API exposure
//!
//! The host carries everything a request needs: the storage services for
//! both collections and the schema registry. It is shared (`Arc`) between
//! every exposure and every in-flight request.

use crate::core::DataService;
use crate::entities::{Author, Book};
use crate::server::exposure::graphql::schema::SchemaRegistry;
use anyhow::Result;
use std::sync::Arc;

/// Host context containing all application state
///
/// # Example
///
/// ```rust,ignore
/// let host = ServerHost::new(
///     Arc::new(InMemoryDataService::<Book>::new()),
///     Arc::new(InMemoryDataService::<Author>::new()),
///     catalog_schema(),
/// )?;
///
/// let host = Arc::new(host);
/// let graphql_app = GraphQLExposure::build_router(host.clone(), &ServerConfig::default())?;
/// let health_app = RestExposure::build_router(host)?;
/// ```
pub struct ServerHost {
    /// The `books` collection
    pub books: Arc<dyn DataService<Book>>,

    /// The `authors` collection
    pub authors: Arc<dyn DataService<Author>>,

    /// Types, fields and resolvers served over GraphQL
    pub schema: Arc<SchemaRegistry>,
}

impl ServerHost {
    /// Build the host, rejecting a schema with dangling type references
    pub fn new(
        books: Arc<dyn DataService<Book>>,
        authors: Arc<dyn DataService<Author>>,
        schema: SchemaRegistry,
    ) -> Result<Self> {
        schema.validate()?;

        Ok(Self {
            books,
            authors,
            schema: Arc::new(schema),
        })
    }
}
