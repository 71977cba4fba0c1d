//! Storage implementations for different backends

pub mod in_memory;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;
pub mod seed;

pub use in_memory::InMemoryDataService;
#[cfg(feature = "mongodb_backend")]
pub use mongodb::MongoDataService;
pub use seed::seed_catalog;
