//! Server module: the shared host, the GraphQL and REST exposures, and the
//! `ServerBuilder` that assembles them into one router.

pub mod builder;
pub mod exposure;
pub mod host;

pub use builder::ServerBuilder;
pub use exposure::{GraphQLExposure, RestExposure};
pub use host::ServerHost;
