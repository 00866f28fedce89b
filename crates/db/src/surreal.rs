//! SurrealDB document backend (`mem://`)
//!
//! Each collection is a schemaless table. A record keeps the caller's field
//! map under `fields`, case-folded copies of its string fields under `folded`,
//! the store-assigned `doc_id` and an insertion counter `seq` that gives
//! unsorted queries and sort ties a stable order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use surrealdb::engine::local::{Db, Mem};
use surrealdb::Surreal;
use tokio::sync::RwLock;
use uuid::{NoContext, Timestamp, Uuid};

use crate::error::{StoreError, StoreResult};
use crate::query::{fold_case, Direction, Document, Filter, Query};
use crate::DocumentStore;

const NAMESPACE: &str = "atlas";
const DATABASE: &str = "catalog";

#[derive(Debug, Deserialize)]
struct Row {
    doc_id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl From<Row> for Document {
    fn from(row: Row) -> Self {
        Document {
            id: row.doc_id,
            fields: row.fields,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CountRow {
    total: usize,
}

/// SurrealQL text plus its bound parameters.
struct Statement {
    text: String,
    params: Vec<(String, Value)>,
}

impl Statement {
    fn new(collection: &str) -> Self {
        Self {
            text: String::new(),
            params: vec![("table".to_string(), Value::String(collection.to_string()))],
        }
    }

    fn bind(&mut self, value: Value) -> String {
        let name = format!("p{}", self.params.len());
        self.params.push((name.clone(), value));
        format!("${name}")
    }

    /// ` WHERE ...` for the query's filters, or nothing.
    fn filters(&mut self, filters: &[Filter]) -> StoreResult<String> {
        let mut clauses = Vec::with_capacity(filters.len());
        for filter in filters {
            let clause = match filter {
                Filter::Eq { field, value } => {
                    let field = ident(field)?;
                    let param = self.bind(value.clone());
                    format!(
                        "(fields.`{field}` = {param} OR (type::is::array(fields.`{field}`) AND fields.`{field}` CONTAINS {param}))"
                    )
                }
                Filter::EqIgnoreCase { field, value } => {
                    let field = ident(field)?;
                    let param = self.bind(Value::String(fold_case(value)));
                    format!("folded.`{field}` = {param}")
                }
            };
            clauses.push(clause);
        }

        if clauses.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", clauses.join(" AND ")))
        }
    }
}

/// Only plain identifiers are spliced into SurrealQL text.
fn ident(name: &str) -> StoreResult<&str> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

fn folded(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_str()
                .map(|text| (key.clone(), Value::String(fold_case(text))))
        })
        .collect()
}

/// Embedded SurrealDB instance holding every collection of one database.
pub struct SurrealStore {
    db: Surreal<Db>,
    declared: RwLock<HashSet<String>>,
    seq: AtomicU64,
    closed: AtomicBool,
}

impl SurrealStore {
    /// Start an in-process, memory-backed instance.
    pub async fn in_memory() -> StoreResult<Self> {
        let db = Surreal::new::<Mem>(()).await?;
        db.use_ns(NAMESPACE).use_db(DATABASE).await?;
        Ok(Self {
            db,
            declared: RwLock::new(HashSet::new()),
            seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    async fn ensure_declared(&self, collection: &str) -> StoreResult<()> {
        self.ensure_open()?;
        if self.declared.read().await.contains(collection) {
            Ok(())
        } else {
            Err(StoreError::UnknownCollection(collection.to_string()))
        }
    }

    fn next_id() -> String {
        Uuid::new_v7(Timestamp::now(NoContext)).simple().to_string()
    }

    async fn run(&self, statement: Statement) -> StoreResult<surrealdb::Response> {
        let mut request = self.db.query(statement.text);
        for param in statement.params {
            request = request.bind(param);
        }
        Ok(request.await?.check()?)
    }

    /// Whether `collection` holds a document with `id`.
    async fn existing(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut statement = Statement::new(collection);
        let id = statement.bind(Value::String(id.to_string()));
        statement.text = format!("SELECT VALUE doc_id FROM type::table($table) WHERE doc_id = {id}");
        let found: Vec<String> = self.run(statement).await?.take(0)?;
        Ok(!found.is_empty())
    }
}

#[async_trait]
impl DocumentStore for SurrealStore {
    async fn declare_collection(&self, name: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let table = ident(name)?;
        let statement = Statement {
            text: format!(
                "DEFINE TABLE IF NOT EXISTS `{table}` SCHEMALESS; \
                 DEFINE INDEX IF NOT EXISTS `{table}_doc_id` ON TABLE `{table}` FIELDS doc_id UNIQUE;"
            ),
            params: Vec::new(),
        };
        self.run(statement).await?;
        self.declared.write().await.insert(name.to_string());
        Ok(())
    }

    async fn find(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        self.ensure_declared(collection).await?;
        let mut statement = Statement::new(collection);
        let filters = statement.filters(&query.filters)?;

        statement.text = match &query.sort {
            Some(sort) => {
                let direction = match sort.direction {
                    Direction::Ascending => "ASC",
                    Direction::Descending => "DESC",
                };
                format!(
                    "SELECT doc_id, seq, fields, fields.`{}` AS sort_key FROM type::table($table){filters} \
                     ORDER BY sort_key {direction}, seq ASC",
                    ident(&sort.field)?
                )
            }
            None => format!(
                "SELECT doc_id, seq, fields FROM type::table($table){filters} ORDER BY seq ASC"
            ),
        };

        let rows: Vec<Row> = self.run(statement).await?.take(0)?;
        let mut documents: Vec<Document> = rows.into_iter().map(Document::from).collect();
        for document in &mut documents {
            query.apply_projection(document);
        }
        Ok(documents)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.ensure_declared(collection).await?;
        let mut statement = Statement::new(collection);
        let id = statement.bind(Value::String(id.to_string()));
        statement.text = format!("SELECT doc_id, fields FROM type::table($table) WHERE doc_id = {id}");

        let row: Option<Row> = self.run(statement).await?.take(0)?;
        Ok(row.map(Document::from))
    }

    async fn count(&self, collection: &str, query: &Query) -> StoreResult<usize> {
        self.ensure_declared(collection).await?;
        let mut statement = Statement::new(collection);
        let filters = statement.filters(&query.filters)?;
        statement.text =
            format!("SELECT count() AS total FROM type::table($table){filters} GROUP ALL");

        let row: Option<CountRow> = self.run(statement).await?.take(0)?;
        Ok(row.map_or(0, |row| row.total))
    }

    async fn insert(&self, collection: &str, fields: Map<String, Value>) -> StoreResult<Document> {
        self.ensure_declared(collection).await?;
        let document = Document {
            id: Self::next_id(),
            fields,
        };

        let mut statement = Statement::new(collection);
        let content = statement.bind(json!({
            "doc_id": document.id,
            "seq": self.seq.fetch_add(1, Ordering::Relaxed),
            "fields": document.fields,
            "folded": folded(&document.fields),
        }));
        statement.text = format!("CREATE type::table($table) CONTENT {content} RETURN NONE");
        self.run(statement).await?;

        tracing::debug!(collection, id = %document.id, "document inserted");
        Ok(document)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<Option<Document>> {
        self.ensure_declared(collection).await?;
        if !self.existing(collection, id).await? {
            return Ok(None);
        }

        let mut statement = Statement::new(collection);
        let target = statement.bind(Value::String(id.to_string()));
        let folded = statement.bind(Value::Object(folded(&fields)));
        let replacement = statement.bind(Value::Object(fields.clone()));
        statement.text = format!(
            "UPDATE type::table($table) SET fields = {replacement}, folded = {folded} \
             WHERE doc_id = {target} RETURN NONE"
        );
        self.run(statement).await?;

        tracing::debug!(collection, id, "document replaced");
        Ok(Some(Document {
            id: id.to_string(),
            fields,
        }))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.ensure_declared(collection).await?;
        let removed = self.existing(collection, id).await?;

        let mut statement = Statement::new(collection);
        let target = statement.bind(Value::String(id.to_string()));
        statement.text = format!("DELETE type::table($table) WHERE doc_id = {target} RETURN NONE");
        self.run(statement).await?;

        tracing::debug!(collection, id, removed, "document delete");
        Ok(removed)
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
