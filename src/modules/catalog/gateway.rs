//! Typed access to catalog collections on top of the document store.

use atlas_db::{Database, Document, DocumentStore, Query, StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::models::{Record, Stored};

/// Persistence gateway for catalog records. Cheap to clone.
#[derive(Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn store(&self) -> &dyn DocumentStore {
        self.db.store()
    }

    pub async fn list<T: Record>(&self, query: &Query) -> StoreResult<Vec<Stored<T>>> {
        self.store()
            .find(T::COLLECTION, query)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Like [`Catalog::list`] but decodes into a projection type `P`.
    pub async fn project<T: Record, P: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> StoreResult<Vec<Stored<P>>> {
        self.store()
            .find(T::COLLECTION, query)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn get<T: Record>(&self, id: &str) -> StoreResult<Option<Stored<T>>> {
        self.store()
            .find_by_id(T::COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn find_one<T: Record>(&self, query: &Query) -> StoreResult<Option<Stored<T>>> {
        self.store()
            .find_one(T::COLLECTION, query)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn count<T: Record>(&self, query: &Query) -> StoreResult<usize> {
        self.store().count(T::COLLECTION, query).await
    }

    pub async fn create<T: Record>(&self, record: T) -> StoreResult<Stored<T>> {
        let document = self.store().insert(T::COLLECTION, encode(&record)?).await?;
        Ok(Stored {
            id: document.id,
            record,
        })
    }

    /// Replace every field of the record with `id`; `None` if it does not exist.
    pub async fn replace<T: Record>(&self, id: &str, record: T) -> StoreResult<Option<Stored<T>>> {
        let updated = self
            .store()
            .update(T::COLLECTION, id, encode(&record)?)
            .await?;
        Ok(updated.map(|document| Stored {
            id: document.id,
            record,
        }))
    }

    pub async fn delete<T: Record>(&self, id: &str) -> StoreResult<bool> {
        self.store().delete(T::COLLECTION, id).await
    }
}

fn encode<T: Serialize>(record: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(StoreError::NotAnObject {
            collection: std::any::type_name::<T>().to_string(),
        }),
    }
}

fn decode<P: DeserializeOwned>(document: Document) -> StoreResult<Stored<P>> {
    let record = serde_json::from_value(Value::Object(document.fields))?;
    Ok(Stored {
        id: document.id,
        record,
    })
}
