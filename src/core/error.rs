//! Typed error handling for the catalog service
//!
//! Service traits return `anyhow::Result` so storage backends can attach
//! context freely. Errors that cross a boundary the caller can act on
//! (configuration, storage, GraphQL request handling) are expressed with
//! the typed hierarchy below.
//!
//! # Error Categories
//!
//! - [`ConfigError`]: configuration parsing and validation
//! - [`StorageError`]: storage backends
//! - [`GraphQLError`]: request-level GraphQL failures
//!
//! Field-level resolver failures never surface as [`CatalogError`]; they are
//! folded into the `errors` array of a partial GraphQL response.

use axum::http::StatusCode;
use thiserror::Error;

/// Result alias for operations returning [`CatalogError`]
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that stop the service from starting
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Anything else raised while bootstrapping
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<StorageError>() {
            Ok(storage) => CatalogError::Storage(storage),
            Err(err) => CatalogError::Internal(err.to_string()),
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    /// A configuration value is invalid
    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not connect to the backend
    #[error("Failed to connect to {backend}: {message}")]
    ConnectionError { backend: String, message: String },

    /// A query against the backend failed
    #[error("{backend} query failed: {message}")]
    QueryError { backend: String, message: String },

    /// The backend was not compiled in
    #[error("Storage backend '{backend}' is unavailable")]
    Unavailable { backend: String },
}

// =============================================================================
// GraphQL Errors
// =============================================================================

/// Request-level GraphQL errors (the request never reached execution)
#[derive(Debug, Error)]
pub enum GraphQLError {
    /// The document is not valid GraphQL syntax
    #[error("Syntax Error: {message}")]
    ParseError { message: String },

    /// The HTTP body is not a GraphQL request
    #[error("{message}")]
    InvalidRequest { message: String },
}

impl GraphQLError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}
