//! Library catalog: authors, books, genres and book copies.

pub mod gateway;
pub mod integrity;
pub mod models;
pub mod routes;
pub mod validation;
pub mod view;
pub mod workflow;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use atlas_db::Database;
use atlas_kernel::{InitCtx, Module};
use axum::Router;
use serde_json::{json, Map, Value};

use gateway::Catalog;
use models::{Author, Book, BookInstance, Genre, Record, CATALOG_PATH};
use routes::{CatalogState, RouteInfo, ROUTES};
use view::{JsonRenderer, Renderer};

pub struct CatalogModule {
    catalog: Catalog,
    renderer: Arc<dyn Renderer>,
}

impl CatalogModule {
    pub fn new(db: Database, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            catalog: Catalog::new(db),
            renderer,
        }
    }
}

#[async_trait]
impl Module for CatalogModule {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn mount_path(&self) -> String {
        CATALOG_PATH.to_string()
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            endpoint = %ctx.db.endpoint(),
            "catalog module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(CatalogState {
            catalog: self.catalog.clone(),
            renderer: Arc::clone(&self.renderer),
        })
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment(ROUTES))
    }

    fn collections(&self) -> Vec<&'static str> {
        vec![
            Author::COLLECTION,
            Book::COLLECTION,
            Genre::COLLECTION,
            BookInstance::COLLECTION,
        ]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), routes = ROUTES.len(), "catalog module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "catalog module stopped");
        Ok(())
    }
}

fn operation(route: &RouteInfo) -> Value {
    let mut responses = Map::new();
    if route.method == "POST" {
        responses.insert(
            "303".to_string(),
            json!({ "description": "Redirect to the affected record or its list" }),
        );
    }
    responses.insert(
        "200".to_string(),
        json!({
            "description": "Rendered page",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Page" } } }
        }),
    );
    if route.path.contains("{id}") {
        responses.insert(
            "404".to_string(),
            json!({
                "description": "Record not found",
                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
            }),
        );
    }

    let mut op = json!({
        "summary": route.summary,
        "tags": ["Catalog"],
        "responses": responses,
    });
    if route.path.contains("{id}") {
        op["parameters"] = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        }]);
    }
    if route.method == "POST" {
        op["requestBody"] = json!({
            "required": true,
            "content": {
                "application/x-www-form-urlencoded": { "schema": { "type": "object" } }
            }
        });
    }
    op
}

/// OpenAPI paths for the routing table, relative to the mount path.
fn openapi_fragment(routes: &[RouteInfo]) -> Value {
    let mut paths = Map::new();
    for route in routes {
        let item = paths
            .entry(route.path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        item[route.method.to_lowercase()] = operation(route);
    }

    json!({
        "paths": paths,
        "components": {
            "schemas": {
                "Page": {
                    "type": "object",
                    "properties": {
                        "template": { "type": "string" },
                        "context": { "type": "object" }
                    },
                    "required": ["template", "context"]
                }
            }
        }
    })
}

/// Catalog module serving pages through the JSON renderer.
pub fn create_module(db: Database) -> Arc<dyn Module> {
    Arc::new(CatalogModule::new(db, Arc::new(JsonRenderer)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_covers_every_route() {
        let fragment = openapi_fragment(ROUTES);
        for route in ROUTES {
            let method = route.method.to_lowercase();
            assert!(
                fragment["paths"][route.path][&method].is_object(),
                "{} {}",
                route.method,
                route.path
            );
        }
    }

    #[test]
    fn id_routes_declare_path_parameter() {
        let fragment = openapi_fragment(ROUTES);
        let op = &fragment["paths"]["/genre/{id}/delete"]["post"];
        assert_eq!(op["parameters"][0]["name"], "id");
        assert!(op["responses"]["303"].is_object());
        assert!(op["requestBody"].is_object());
    }

    #[tokio::test]
    async fn module_declares_catalog_collections() {
        let module = create_module(Database::in_memory().await.unwrap());
        assert_eq!(module.mount_path(), "/catalog");
        let mut collections = module.collections();
        collections.sort_unstable();
        assert_eq!(collections, vec!["authors", "bookinstances", "books", "genres"]);
    }
}
