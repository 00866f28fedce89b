use atlas_db::{Direction, Query};
use atlas_http::error::AppError;
use serde_json::json;

use super::{deletion_target, form_context, not_found};
use crate::modules::catalog::gateway::Catalog;
use crate::modules::catalog::integrity::{self, BookRef, Guarded};
use crate::modules::catalog::models::{list_url, Author, Book, BookSummary, Stored};
use crate::modules::catalog::validation::{self, FormData};
use crate::modules::catalog::view::{self, Page};

pub async fn list(catalog: &Catalog) -> Result<Page, AppError> {
    let query = Query::new().sort_by("family_name", Direction::Ascending);
    let authors = catalog.list::<Author>(&query).await?;

    Ok(Page::render(
        "author_list",
        json!({
            "title": "Author List",
            "author_list": authors.iter().map(view::author).collect::<Vec<_>>(),
        }),
    ))
}

pub async fn detail(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let written = integrity::dependents_query(Guarded::Author, id);
    let (author, books) = tokio::try_join!(
        catalog.get::<Author>(id),
        catalog.project::<Book, BookSummary>(&written),
    )?;
    let author = author.ok_or_else(|| not_found("Author", id))?;

    let books: Vec<_> = books.into_iter().map(BookRef::from).collect();

    Ok(Page::render(
        "author_detail",
        json!({
            "title": "Author Detail",
            "author": view::author(&author),
            "author_books": books,
        }),
    ))
}

pub fn create_get() -> Page {
    Page::render("author_form", json!({ "title": "Create Author" }))
}

pub async fn create_post(catalog: &Catalog, form: &FormData) -> Result<Page, AppError> {
    let author = match validation::author(form) {
        Ok(author) => author,
        Err(rejected) => {
            return Ok(Page::render(
                "author_form",
                form_context(
                    "Create Author",
                    "author",
                    rejected.values,
                    None,
                    &rejected.errors,
                ),
            ));
        }
    };

    let author = catalog.create(author).await?;
    tracing::info!(entity = "author", id = %author.id, "author created");
    Ok(Page::redirect(author.url()))
}

pub async fn delete_get(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let (author, check) = tokio::try_join!(
        catalog.get::<Author>(id),
        integrity::can_delete(catalog, Guarded::Author, id),
    )?;

    let Some(author) = author else {
        return Ok(Page::redirect(list_url::<Author>()));
    };

    Ok(delete_page(&author, check))
}

pub async fn delete_post(catalog: &Catalog, path_id: &str, form: &FormData) -> Result<Page, AppError> {
    let target = deletion_target("author", path_id, form, "authorid")?;

    // Re-checked here: books may have been added since the confirmation page.
    let (author, check) = tokio::try_join!(
        catalog.get::<Author>(&target),
        integrity::can_delete(catalog, Guarded::Author, &target),
    )?;

    if !check.allowed() {
        tracing::warn!(
            entity = "author",
            id = %target,
            blockers = check.blockers.len(),
            "author delete refused"
        );
        return Ok(match author {
            Some(author) => delete_page(&author, check),
            None => Page::redirect(list_url::<Author>()),
        });
    }

    let removed = catalog.delete::<Author>(&target).await?;
    tracing::info!(entity = "author", id = %target, removed, "author deleted");
    Ok(Page::redirect(list_url::<Author>()))
}

fn delete_page(author: &Stored<Author>, check: integrity::DeleteCheck) -> Page {
    Page::render(
        "author_delete",
        json!({
            "title": "Delete Author",
            "author": view::author(author),
            "author_books": check.blockers,
        }),
    )
}

pub async fn update_get(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let author = catalog
        .get::<Author>(id)
        .await?
        .ok_or_else(|| not_found("Author", id))?;

    Ok(Page::render(
        "author_form",
        json!({
            "title": "Update Author",
            "author": view::author(&author),
        }),
    ))
}

pub async fn update_post(catalog: &Catalog, id: &str, form: &FormData) -> Result<Page, AppError> {
    let author = match validation::author(form) {
        Ok(author) => author,
        Err(rejected) => {
            return Ok(Page::render(
                "author_form",
                form_context(
                    "Update Author",
                    "author",
                    rejected.values,
                    Some(id),
                    &rejected.errors,
                ),
            ));
        }
    };

    let author = catalog
        .replace(id, author)
        .await?
        .ok_or_else(|| not_found("Author", id))?;
    tracing::info!(entity = "author", id = %author.id, "author updated");
    Ok(Page::redirect(author.url()))
}
