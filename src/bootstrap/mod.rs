//! Application lifecycle: open the store, bring modules up, serve, tear down.

use anyhow::Context;
use atlas_db::Database;
use atlas_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// Registry with every project module registered against `db`.
pub fn build_registry(db: &Database) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, db)?;
    Ok(registry)
}

/// Open the database, run modules through init and start, serve HTTP until
/// shutdown, then stop modules and close the database.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.endpoint,
        "catalog bootstrap starting"
    );

    let db = Database::connect(&settings.database.endpoint)
        .await
        .with_context(|| format!("failed to open database at {}", settings.database.endpoint))?;

    let registry = build_registry(&db)?;
    db.declare_collections(registry.collect_collections())
        .await
        .context("failed to declare collections")?;

    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;
    tracing::info!(modules = registry.module_count(), "catalog bootstrap complete");

    let served = atlas_http::start_server(&registry, &settings).await;

    registry.stop_modules().await?;
    db.close().await.context("failed to close database")?;
    tracing::info!("catalog shut down");

    served
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_http::build_router;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn assembled() -> axum::Router {
        let db = Database::in_memory().await.unwrap();
        let registry = build_registry(&db).unwrap();
        db.declare_collections(registry.collect_collections())
            .await
            .unwrap();
        build_router(&registry, &Settings::default())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn registry_holds_catalog_module() {
        let db = Database::in_memory().await.unwrap();
        let registry = build_registry(&db).unwrap();
        assert_eq!(registry.module_count(), 1);
        assert!(registry.get_module("catalog").is_some());
    }

    #[tokio::test]
    async fn root_redirects_to_catalog() {
        let app = assembled().await;
        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/catalog");
    }

    #[tokio::test]
    async fn catalog_is_mounted() {
        let app = assembled().await;
        let response = app.clone().oneshot(get("/catalog/authors")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_lists_catalog_paths() {
        let app = assembled().await;
        let response = app.oneshot(get("/docs/openapi.json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(doc["paths"]["/catalog/author/{id}/delete"]["post"].is_object());
    }
}
