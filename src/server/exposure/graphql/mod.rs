//! GraphQL API exposure
//!
//! Routes, relative to `server.graphql_path` (default `/graphql`):
//! - `POST {path}`: execute `{query, variables?, operationName?}`
//! - `GET {path}`: GraphQL Playground (when `server.playground` is on)
//! - `GET {path}/schema`: schema SDL as plain text
//!
//! Requests rejected before execution (syntax, validation, variables) answer
//! 400 with only `errors`; any executed request answers 200, field errors
//! included.

pub mod executor;
pub mod resolvers;
pub mod schema;

use crate::config::ServerConfig;
use crate::core::GraphQLError;
use crate::server::host::ServerHost;
use anyhow::{Result, bail};
use async_graphql::http::{GraphQLPlaygroundConfig, playground_source};
use axum::{
    Router,
    extract::{Extension, Json as AxumJson, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use std::sync::Arc;

pub use executor::{GraphQLExecutor, GraphQLRequest, Response, ServerError};
pub use resolvers::catalog_schema;
pub use schema::{FieldDef, ObjectType, SchemaRegistry, TypeRef};

/// State shared by the GraphQL handlers
struct GraphQLState {
    executor: GraphQLExecutor,
    schema: Arc<SchemaRegistry>,
    endpoint: String,
}

/// GraphQL API exposure implementation
pub struct GraphQLExposure;

impl GraphQLExposure {
    /// Build the GraphQL router from a host
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let host = Arc::new(builder.build_host()?);
    /// let graphql_app = GraphQLExposure::build_router(host, &ServerConfig::default())?;
    /// ```
    pub fn build_router(host: Arc<ServerHost>, config: &ServerConfig) -> Result<Router> {
        let endpoint = config.graphql_path.trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            bail!("GraphQL endpoint cannot be mounted at the root path");
        }

        let state = Arc::new(GraphQLState {
            schema: host.schema.clone(),
            executor: GraphQLExecutor::new(host),
            endpoint: endpoint.clone(),
        });

        let mut query_route = post(graphql_handler);
        if config.playground {
            query_route = query_route.get(graphql_playground);
        }

        let router = Router::new()
            .route(&endpoint, query_route)
            .route(&format!("{}/schema", endpoint), get(graphql_schema))
            .layer(Extension(state));

        Ok(router)
    }
}

/// Handler for GraphQL queries and mutations
async fn graphql_handler(
    Extension(state): Extension<Arc<GraphQLState>>,
    request: Result<AxumJson<GraphQLRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match request {
        Ok(AxumJson(request)) => request,
        Err(rejection) => {
            let error = GraphQLError::InvalidRequest {
                message: rejection.body_text(),
            };
            tracing::debug!(error = %error, "rejected GraphQL request body");
            return (
                error.status_code(),
                AxumJson(Response::from_errors(vec![ServerError::new(error.to_string())])),
            );
        }
    };

    let response = state.executor.execute_request(request).await;

    let status = if response.is_executed() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    (status, AxumJson(response))
}

/// Handler for the GraphQL Playground UI
async fn graphql_playground(Extension(state): Extension<Arc<GraphQLState>>) -> impl IntoResponse {
    Html(playground_source(GraphQLPlaygroundConfig::new(&state.endpoint)))
}

/// Handler for GraphQL schema SDL export
async fn graphql_schema(Extension(state): Extension<Arc<GraphQLState>>) -> impl IntoResponse {
    let sdl = state.schema.to_sdl();

    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; charset=utf-8",
        )],
        sdl,
    )
}
