//! Per-entity request workflows: validation, integrity checks, persistence,
//! then a render or redirect decision.
//!
//! Every function returns a [`Page`]; only a missing record on a detail or
//! update page and store failures surface as [`AppError`]s.

pub mod author;
pub mod book;
pub mod book_instance;
pub mod genre;

use atlas_db::{Filter, Query};
use atlas_http::error::AppError;
use serde_json::{json, Map, Value};

use super::gateway::Catalog;
use super::models::{Author, Book, BookInstance, BookStatus, Genre};
use super::validation::{FieldError, FormData};
use super::view::Page;

/// Identifier of the record a delete confirmation targets.
///
/// The submitted body field decides which record is deleted; a differing
/// path id is only logged.
pub(crate) fn deletion_target(
    entity: &'static str,
    path_id: &str,
    form: &FormData,
    field: &'static str,
) -> Result<String, AppError> {
    let target = form
        .get(field)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("missing '{field}' in delete request")))?;

    if target != path_id {
        tracing::warn!(
            entity,
            path_id,
            body_id = target,
            "delete body id differs from path id"
        );
    }

    Ok(target.to_string())
}

/// Form context for a re-render: submitted values, optional id, and errors.
pub(crate) fn form_context(
    title: &str,
    key: &str,
    values: Map<String, Value>,
    id: Option<&str>,
    errors: &[FieldError],
) -> Value {
    let mut record = values;
    if let Some(id) = id {
        record.insert("id".to_string(), Value::String(id.to_string()));
    }

    let mut context = Map::new();
    context.insert("title".to_string(), Value::String(title.to_string()));
    context.insert(key.to_string(), Value::Object(record));
    context.insert("errors".to_string(), json!(errors));
    Value::Object(context)
}

pub(crate) fn not_found(what: &str, id: &str) -> AppError {
    tracing::debug!(id, "{} not found", what);
    AppError::not_found(format!("{what} not found"))
}

/// Catalog home: record counts, read concurrently.
pub async fn summary(catalog: &Catalog) -> Result<Page, AppError> {
    let all = Query::new();
    let available = Query::new().filter(Filter::eq("status", BookStatus::Available.as_str()));

    let (books, copies, copies_available, authors, genres) = tokio::try_join!(
        catalog.count::<Book>(&all),
        catalog.count::<BookInstance>(&all),
        catalog.count::<BookInstance>(&available),
        catalog.count::<Author>(&all),
        catalog.count::<Genre>(&all),
    )?;

    Ok(Page::render(
        "index",
        json!({
            "title": "Local Library Home",
            "book_count": books,
            "book_instance_count": copies,
            "book_instance_available_count": copies_available,
            "author_count": authors,
            "genre_count": genres,
        }),
    ))
}
