//! Document store gateway for ATLAS.
//!
//! Modules talk to persistence through [`Database`], a cloneable handle that is
//! opened once at startup from the configured endpoint and closed at shutdown.
//! The store knows nothing about the entities it holds: documents are JSON
//! field maps keyed by opaque, store-assigned string identifiers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub mod error;
pub mod query;
pub mod surreal;

pub use error::{StoreError, StoreResult};
pub use query::{Direction, Document, Filter, Query, Sort};
pub use surreal::SurrealStore;

const MEM_SCHEME: &str = "mem://";

/// Persistence operations over named collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Make a collection available. Declaring an existing collection is a no-op.
    async fn declare_collection(&self, name: &str) -> StoreResult<()>;

    async fn find(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>>;

    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// First document matching `query`, if any.
    async fn find_one(&self, collection: &str, query: &Query) -> StoreResult<Option<Document>> {
        Ok(self.find(collection, query).await?.into_iter().next())
    }

    async fn count(&self, collection: &str, query: &Query) -> StoreResult<usize> {
        Ok(self.find(collection, query).await?.len())
    }

    /// Persist a new document and return it with its assigned identifier.
    async fn insert(&self, collection: &str, fields: Map<String, Value>) -> StoreResult<Document>;

    /// Replace the fields of an existing document. The identifier never changes.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<Option<Document>>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    async fn close(&self) -> StoreResult<()>;
}

/// Long-lived handle to the configured store.
#[derive(Clone)]
pub struct Database {
    endpoint: String,
    store: Arc<dyn DocumentStore>,
}

impl Database {
    /// Open the store behind `endpoint`.
    pub async fn connect(endpoint: &str) -> StoreResult<Self> {
        if !endpoint.starts_with(MEM_SCHEME) {
            return Err(StoreError::UnsupportedEndpoint(endpoint.to_string()));
        }

        let store = SurrealStore::in_memory().await?;
        tracing::info!(target: "atlas-db", endpoint, "document store opened");
        Ok(Self::from_store(endpoint, Arc::new(store)))
    }

    pub fn from_store(endpoint: impl Into<String>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            endpoint: endpoint.into(),
            store,
        }
    }

    /// Fresh in-process store, used by tests and local runs.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect(MEM_SCHEME).await
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub async fn declare_collections<I, S>(&self, names: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.store.declare_collection(name.as_ref()).await?;
            tracing::debug!(target: "atlas-db", collection = name.as_ref(), "collection declared");
        }
        Ok(())
    }

    pub async fn close(&self) -> StoreResult<()> {
        self.store.close().await?;
        tracing::info!(target: "atlas-db", endpoint = %self.endpoint, "document store closed");
        Ok(())
    }
}
