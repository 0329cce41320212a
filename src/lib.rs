//! Shelf application library
//!
//! Wires the project modules, the database and the HTTP layer together.

pub mod modules;
pub mod pages;

use anyhow::Context;
use axum::Router;
use shelf_db::DbPool;
use shelf_kernel::{InitCtx, ModuleRegistry, Settings};

/// A bootstrapped application: database connected, migrations applied and
/// every module initialized and started.
pub struct App {
    settings: Settings,
    db: DbPool,
    registry: ModuleRegistry,
}

impl App {
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let db = shelf_db::connect(&settings.database.url, settings.database.max_connections)
            .await
            .context("failed to open database")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &db);

        registry.run_migrations(&db).await?;

        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        registry.init_modules(&ctx).await?;
        registry.start_modules(&ctx).await?;

        Ok(Self {
            settings,
            db,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn db(&self) -> &DbPool {
        &self.db
    }

    /// The complete HTTP application
    pub fn router(&self) -> Router {
        shelf_http::build_router(&self.registry, &self.settings, pages::router())
    }

    /// Serve until ctrl-c, then stop modules and close the pool.
    pub async fn serve(self) -> anyhow::Result<()> {
        let served =
            shelf_http::start_server(&self.registry, &self.settings, pages::router()).await;
        self.shutdown().await?;
        served
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.registry.stop_modules().await?;
        self.db.close().await;
        Ok(())
    }
}

/// Apply pending migrations without starting any module.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = shelf_db::connect(&settings.database.url, settings.database.max_connections)
        .await
        .context("failed to open database")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &db);

    let applied = registry.run_migrations(&db).await?;
    db.close().await;
    Ok(applied)
}
