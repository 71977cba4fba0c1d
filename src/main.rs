//! Bookshelf server binary
//!
//! Reads the configuration (file named by `BOOKSHELF_CONFIG`, then
//! environment overrides), opens the configured storage and serves the
//! GraphQL endpoint until Ctrl+C / SIGTERM.

use anyhow::Result;
use bookshelf::config::{AppConfig, StorageConfig};
use bookshelf::core::{CatalogResult, DataService};
use bookshelf::entities::{Author, Book};
use bookshelf::server::ServerBuilder;
use bookshelf::storage::{InMemoryDataService, seed_catalog};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type Services = (Arc<dyn DataService<Book>>, Arc<dyn DataService<Author>>);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (books, authors) = open_storage(&config.storage).await?;

    ServerBuilder::new()
        .with_shared_services(books, authors)
        .with_config(config.server)
        .serve()
        .await
}

async fn open_storage(config: &StorageConfig) -> CatalogResult<Services> {
    match config {
        StorageConfig::Memory { seed } => {
            let books = InMemoryDataService::<Book>::new();
            let authors = InMemoryDataService::<Author>::new();
            if *seed {
                seed_catalog(&books, &authors).await?;
            }
            tracing::info!(seed, "using in-memory storage");
            Ok((Arc::new(books), Arc::new(authors)))
        }
        #[cfg(feature = "mongodb_backend")]
        StorageConfig::Mongodb { uri, database } => {
            use bookshelf::storage::{MongoDataService, mongodb::connect};

            let db = connect(uri, database).await?;
            let books = MongoDataService::<Book>::new(db.clone());
            let authors = MongoDataService::<Author>::new(db);
            books.ensure_indexes().await?;
            authors.ensure_indexes().await?;
            Ok((Arc::new(books), Arc::new(authors)))
        }
        #[cfg(not(feature = "mongodb_backend"))]
        StorageConfig::Mongodb { .. } => Err(bookshelf::core::StorageError::Unavailable {
            backend: "mongodb".to_string(),
        }
        .into()),
    }
}
