//! GraphQL executor module
//!
//! This module contains the custom GraphQL executor that runs documents
//! against the schema registry.
//!
//! The executor is split into several sub-modules:
//! - `core`: Request orchestration, operation selection, variable coercion
//! - `validation`: Static checks of the selected operation
//! - `field_resolver`: Field resolution, value completion, null propagation
//! - `response`: Response envelope and field-scoped errors
//! - `utils`: Scalar coercion helpers

mod core;
mod field_resolver;
mod response;
mod utils;
mod validation;

pub use core::{GraphQLExecutor, GraphQLRequest, OperationKind};
pub use response::{Location, PathSegment, Response, ServerError};
