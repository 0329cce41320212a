//! HTTP server facade for shelf with Axum, error handling, and OpenAPI support.

use anyhow::Context;
use axum::{routing::get, Router};

use shelf_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod router;

pub use error::AppError;
use router::RouterBuilder;

/// Start the HTTP server and serve until ctrl-c
pub async fn start_server(
    registry: &ModuleRegistry,
    settings: &Settings,
    pages: Router,
) -> anyhow::Result<()> {
    let address = settings.server.bind_address();
    tracing::info!("starting HTTP server on {}", address);

    let app = build_router(registry, settings, pages);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {address}"))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router: module routes under `/api/{module}`, `pages`
/// at the root, health and API docs, wrapped in the global middleware.
pub fn build_router(registry: &ModuleRegistry, settings: &Settings, pages: Router) -> Router {
    let mut router_builder = RouterBuilder::new()
        .route("/healthz", get(health_check))
        .merge(pages);

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under /api/{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module.routes());
    }

    router_builder
        .with_openapi(registry)
        .with_timeout(settings.server.request_timeout_ms)
        .with_cors()
        .with_tracing()
        .with_request_id()
        .build()
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
