use std::collections::HashMap;

use atlas_db::{Direction, Query};
use atlas_http::error::AppError;
use serde_json::{json, Map, Value};

use super::{deletion_target, form_context, not_found};
use crate::modules::catalog::gateway::Catalog;
use crate::modules::catalog::models::{
    list_url, Book, BookInstance, BookStatus, BookSummary, Stored,
};
use crate::modules::catalog::validation::{self, FieldError, FormData};
use crate::modules::catalog::view::{self, Page};

pub async fn list(catalog: &Catalog) -> Result<Page, AppError> {
    let all = Query::new();
    let (copies, books) = tokio::try_join!(
        catalog.list::<BookInstance>(&all),
        catalog.list::<Book>(&all),
    )?;
    let books: HashMap<&str, &Stored<Book>> = books.iter().map(|b| (b.id.as_str(), b)).collect();

    let list: Vec<Value> = copies
        .iter()
        .map(|copy| view::book_instance(copy, books.get(copy.record.book.as_str()).copied()))
        .collect();

    Ok(Page::render(
        "bookinstance_list",
        json!({
            "title": "Book Instance List",
            "bookinstance_list": list,
        }),
    ))
}

pub async fn detail(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let copy = catalog
        .get::<BookInstance>(id)
        .await?
        .ok_or_else(|| not_found("Book copy", id))?;
    let book = catalog.get::<Book>(&copy.record.book).await?;

    Ok(Page::render(
        "bookinstance_detail",
        json!({
            "title": "Book:",
            "bookinstance": view::book_instance(&copy, book.as_ref()),
        }),
    ))
}

async fn form_page(
    catalog: &Catalog,
    title: &str,
    values: Map<String, Value>,
    id: Option<&str>,
    errors: &[FieldError],
) -> Result<Page, AppError> {
    let titles = Query::new()
        .project(["title"])
        .sort_by("title", Direction::Ascending);
    let books = catalog.project::<Book, BookSummary>(&titles).await?;

    let selected_book = [values
        .get("book")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()];
    let selected_status = [values
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()];

    let book_list = view::choices(
        books.iter().map(|b| (b.id.as_str(), b.record.title.clone())),
        &selected_book,
    );
    let statuses = view::choices(
        BookStatus::LABELS
            .iter()
            .map(|label| (*label, label.to_string())),
        &selected_status,
    );

    let mut context = form_context(title, "bookinstance", values, id, errors);
    if let Value::Object(map) = &mut context {
        map.insert("book_list".to_string(), Value::Array(book_list));
        map.insert("statuses".to_string(), Value::Array(statuses));
    }
    Ok(Page::render("bookinstance_form", context))
}

pub async fn create_get(catalog: &Catalog) -> Result<Page, AppError> {
    form_page(catalog, "Create BookInstance", Map::new(), None, &[]).await
}

pub async fn create_post(catalog: &Catalog, form: &FormData) -> Result<Page, AppError> {
    let copy = match validation::book_instance(form) {
        Ok(copy) => copy,
        Err(rejected) => {
            return form_page(
                catalog,
                "Create BookInstance",
                rejected.values,
                None,
                &rejected.errors,
            )
            .await;
        }
    };

    let copy = catalog.create(copy).await?;
    tracing::info!(entity = "bookinstance", id = %copy.id, status = %copy.record.status, "book copy created");
    Ok(Page::redirect(copy.url()))
}

pub async fn delete_get(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let Some(copy) = catalog.get::<BookInstance>(id).await? else {
        return Ok(Page::redirect(list_url::<BookInstance>()));
    };
    let book = catalog.get::<Book>(&copy.record.book).await?;

    Ok(Page::render(
        "bookinstance_delete",
        json!({
            "title": "Delete BookInstance",
            "bookinstance": view::book_instance(&copy, book.as_ref()),
        }),
    ))
}

pub async fn delete_post(catalog: &Catalog, path_id: &str, form: &FormData) -> Result<Page, AppError> {
    let target = deletion_target("bookinstance", path_id, form, "bookinstanceid")?;

    let removed = catalog.delete::<BookInstance>(&target).await?;
    tracing::info!(entity = "bookinstance", id = %target, removed, "book copy deleted");
    Ok(Page::redirect(list_url::<BookInstance>()))
}

pub async fn update_get(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let copy = catalog
        .get::<BookInstance>(id)
        .await?
        .ok_or_else(|| not_found("Book copy", id))?;

    let values = match view::book_instance(&copy, None) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    form_page(catalog, "Update BookInstance", values, Some(id), &[]).await
}

pub async fn update_post(catalog: &Catalog, id: &str, form: &FormData) -> Result<Page, AppError> {
    let copy = match validation::book_instance(form) {
        Ok(copy) => copy,
        Err(rejected) => {
            return form_page(
                catalog,
                "Update BookInstance",
                rejected.values,
                Some(id),
                &rejected.errors,
            )
            .await;
        }
    };

    let copy = catalog
        .replace(id, copy)
        .await?
        .ok_or_else(|| not_found("Book copy", id))?;
    tracing::info!(entity = "bookinstance", id = %copy.id, status = %copy.record.status, "book copy updated");
    Ok(Page::redirect(copy.url()))
}
