//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::{GraphQLExposure, RestExposure};
use super::host::ServerHost;
use crate::config::ServerConfig;
use crate::core::DataService;
use crate::entities::{Author, Book};
use crate::server::exposure::graphql::{SchemaRegistry, catalog_schema};
use crate::storage::InMemoryDataService;
use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the catalog HTTP server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_book_service(InMemoryDataService::<Book>::new())
///     .with_author_service(InMemoryDataService::<Author>::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    book_service: Option<Arc<dyn DataService<Book>>>,
    author_service: Option<Arc<dyn DataService<Author>>>,
    schema: Option<SchemaRegistry>,
    config: ServerConfig,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            book_service: None,
            author_service: None,
            schema: None,
            config: ServerConfig::default(),
            custom_routes: Vec::new(),
        }
    }

    /// Set the storage service for books (required)
    pub fn with_book_service(mut self, service: impl DataService<Book> + 'static) -> Self {
        self.book_service = Some(Arc::new(service));
        self
    }

    /// Set the storage service for authors (required)
    pub fn with_author_service(mut self, service: impl DataService<Author> + 'static) -> Self {
        self.author_service = Some(Arc::new(service));
        self
    }

    /// Set both services from already shared handles
    pub fn with_shared_services(
        mut self,
        books: Arc<dyn DataService<Book>>,
        authors: Arc<dyn DataService<Author>>,
    ) -> Self {
        self.book_service = Some(books);
        self.author_service = Some(authors);
        self
    }

    /// Use fresh in-memory collections for both entity types
    pub fn with_in_memory_storage(self) -> Self {
        self.with_book_service(InMemoryDataService::<Book>::new())
            .with_author_service(InMemoryDataService::<Author>::new())
    }

    /// Replace the catalog schema (defaults to [`catalog_schema`])
    pub fn with_schema(mut self, schema: SchemaRegistry) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Apply the `server` section of the configuration
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Add custom routes to the server
    ///
    /// # Example
    ///
    /// ```ignore
    /// let metrics = Router::new().route("/metrics", get(metrics_handler));
    ///
    /// ServerBuilder::new()
    ///     .with_in_memory_storage()
    ///     .with_custom_routes(metrics)
    ///     .build()?;
    /// ```
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    pub fn build_host(&mut self) -> Result<ServerHost> {
        let books = self.book_service.take().ok_or_else(|| {
            anyhow::anyhow!("Book service is required. Call .with_book_service()")
        })?;
        let authors = self.author_service.take().ok_or_else(|| {
            anyhow::anyhow!("Author service is required. Call .with_author_service()")
        })?;
        let schema = self.schema.take().unwrap_or_else(catalog_schema);

        ServerHost::new(books, authors, schema)
    }

    /// Build the final router: GraphQL endpoint, health checks and custom
    /// routes, wrapped in request tracing and permissive CORS.
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);

        let app = RestExposure::build_router(host.clone(), custom_routes)?
            .merge(GraphQLExposure::build_router(host, &self.config)?)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        Ok(app)
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to `server.bind_address`
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    ///
    /// # Example
    ///
    /// ```ignore
    /// ServerBuilder::new()
    ///     .with_in_memory_storage()
    ///     .with_config(config.server)
    ///     .serve().await?;
    /// ```
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self.config.bind_address;
        let graphql_path = self.config.graphql_path.clone();
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(
            "Server listening on http://{}{}",
            listener.local_addr()?,
            graphql_path
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
