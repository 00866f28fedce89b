use std::collections::HashMap;

use atlas_db::{Direction, Filter, Query};
use atlas_http::error::AppError;
use serde_json::{json, Map, Value};

use super::{deletion_target, form_context, not_found};
use crate::modules::catalog::gateway::Catalog;
use crate::modules::catalog::models::{list_url, Author, Book, BookInstance, Genre, Stored};
use crate::modules::catalog::validation::{self, FieldError, FormData};
use crate::modules::catalog::view::{self, Page};

fn copies_of(id: &str) -> Query {
    Query::new().filter(Filter::eq("book", id))
}

pub async fn list(catalog: &Catalog) -> Result<Page, AppError> {
    let by_title = Query::new().sort_by("title", Direction::Ascending);
    let all = Query::new();
    let (books, authors) = tokio::try_join!(
        catalog.list::<Book>(&by_title),
        catalog.list::<Author>(&all),
    )?;
    let authors: HashMap<&str, &Stored<Author>> =
        authors.iter().map(|a| (a.id.as_str(), a)).collect();

    let book_list: Vec<Value> = books
        .iter()
        .map(|book| view::book(book, authors.get(book.record.author.as_str()).copied(), &[]))
        .collect();

    Ok(Page::render(
        "book_list",
        json!({
            "title": "Book List",
            "book_list": book_list,
        }),
    ))
}

pub async fn detail(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let copies = copies_of(id);
    let (book, copies) = tokio::try_join!(
        catalog.get::<Book>(id),
        catalog.list::<BookInstance>(&copies),
    )?;
    let book = book.ok_or_else(|| not_found("Book", id))?;

    let by_name = Query::new().sort_by("name", Direction::Ascending);
    let (author, genres) = tokio::try_join!(
        catalog.get::<Author>(&book.record.author),
        catalog.list::<Genre>(&by_name),
    )?;

    Ok(Page::render(
        "book_detail",
        json!({
            "title": book.record.title,
            "book": view::book(&book, author.as_ref(), &genres),
            "book_instances": copies
                .iter()
                .map(|copy| view::book_instance(copy, Some(&book)))
                .collect::<Vec<_>>(),
        }),
    ))
}

/// Author and genre select entries, marking the current selection.
async fn candidates(
    catalog: &Catalog,
    author: &str,
    genres: &[String],
) -> Result<(Vec<Value>, Vec<Value>), AppError> {
    let by_family_name = Query::new().sort_by("family_name", Direction::Ascending);
    let by_name = Query::new().sort_by("name", Direction::Ascending);
    let (authors, all_genres) = tokio::try_join!(
        catalog.list::<Author>(&by_family_name),
        catalog.list::<Genre>(&by_name),
    )?;

    let selected_author = [author.to_string()];
    let authors = view::choices(
        authors.iter().map(|a| (a.id.as_str(), a.record.name())),
        &selected_author,
    );
    let genres = view::choices(
        all_genres
            .iter()
            .map(|g| (g.id.as_str(), g.record.name.clone())),
        genres,
    );
    Ok((authors, genres))
}

async fn form_page(
    catalog: &Catalog,
    title: &str,
    values: Map<String, Value>,
    id: Option<&str>,
    errors: &[FieldError],
) -> Result<Page, AppError> {
    let author = values
        .get("author")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let genres: Vec<String> = values
        .get("genre")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let (authors, genre_choices) = candidates(catalog, &author, &genres).await?;

    let mut context = form_context(title, "book", values, id, errors);
    if let Value::Object(map) = &mut context {
        map.insert("authors".to_string(), Value::Array(authors));
        map.insert("genres".to_string(), Value::Array(genre_choices));
    }
    Ok(Page::render("book_form", context))
}

pub async fn create_get(catalog: &Catalog) -> Result<Page, AppError> {
    form_page(catalog, "Create Book", Map::new(), None, &[]).await
}

pub async fn create_post(catalog: &Catalog, form: &FormData) -> Result<Page, AppError> {
    let book = match validation::book(form) {
        Ok(book) => book,
        Err(rejected) => {
            return form_page(catalog, "Create Book", rejected.values, None, &rejected.errors)
                .await;
        }
    };

    let book = catalog.create(book).await?;
    tracing::info!(entity = "book", id = %book.id, "book created");
    Ok(Page::redirect(book.url()))
}

pub async fn delete_get(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let copies = copies_of(id);
    let (book, copies) = tokio::try_join!(
        catalog.get::<Book>(id),
        catalog.list::<BookInstance>(&copies),
    )?;

    let Some(book) = book else {
        return Ok(Page::redirect(list_url::<Book>()));
    };

    Ok(Page::render(
        "book_delete",
        json!({
            "title": "Delete Book",
            "book": view::book(&book, None, &[]),
            "book_instances": copies
                .iter()
                .map(|copy| view::book_instance(copy, Some(&book)))
                .collect::<Vec<_>>(),
        }),
    ))
}

/// Book deletion is unguarded; copies referencing it are left in place.
pub async fn delete_post(catalog: &Catalog, path_id: &str, form: &FormData) -> Result<Page, AppError> {
    let target = deletion_target("book", path_id, form, "bookid")?;

    let removed = catalog.delete::<Book>(&target).await?;
    tracing::info!(entity = "book", id = %target, removed, "book deleted");
    Ok(Page::redirect(list_url::<Book>()))
}

pub async fn update_get(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let book = catalog
        .get::<Book>(id)
        .await?
        .ok_or_else(|| not_found("Book", id))?;

    let values = match view::book(&book, None, &[]) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    form_page(catalog, "Update Book", values, Some(id), &[]).await
}

pub async fn update_post(catalog: &Catalog, id: &str, form: &FormData) -> Result<Page, AppError> {
    let book = match validation::book(form) {
        Ok(book) => book,
        Err(rejected) => {
            return form_page(
                catalog,
                "Update Book",
                rejected.values,
                Some(id),
                &rejected.errors,
            )
            .await;
        }
    };

    let book = catalog
        .replace(id, book)
        .await?
        .ok_or_else(|| not_found("Book", id))?;
    tracing::info!(entity = "book", id = %book.id, "book updated");
    Ok(Page::redirect(book.url()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::catalog::models::BookStatus;
    use crate::modules::catalog::testing::{
        catalog, form, seed_author, seed_book, seed_genre, seed_instance,
    };

    async fn book_count(catalog: &Catalog) -> usize {
        catalog.count::<Book>(&Query::new()).await.unwrap()
    }

    fn selected_ids(entries: &Value) -> Vec<String> {
        entries
            .as_array()
            .unwrap()
            .iter()
            .filter(|e| e["selected"] == true)
            .map(|e| e["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn create_keeps_every_selected_genre() {
        let catalog = catalog().await;
        let author = seed_author(&catalog, "Jane", "Austen").await;
        let romance = seed_genre(&catalog, "Romance").await;
        let satire = seed_genre(&catalog, "Satire").await;

        let page = create_post(
            &catalog,
            &form(&[
                ("title", "Emma"),
                ("author", author.id.as_str()),
                ("summary", "A matchmaker"),
                ("isbn", "9780141439587"),
                ("genre", romance.id.as_str()),
                ("genre", satire.id.as_str()),
            ]),
        )
        .await
        .unwrap();

        let url = page.redirect_target().unwrap();
        let id = url.rsplit('/').next().unwrap();
        let stored = catalog.get::<Book>(id).await.unwrap().unwrap();
        assert_eq!(stored.record.genre, vec![romance.id.clone(), satire.id.clone()]);

        let detail = detail(&catalog, id).await.unwrap();
        let book = &detail.context().unwrap()["book"];
        assert_eq!(book["author_name"], "Austen, Jane");
        assert_eq!(book["genres"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_create_reselects_author_and_genres() {
        let catalog = catalog().await;
        let author = seed_author(&catalog, "Jane", "Austen").await;
        seed_author(&catalog, "Emily", "Bronte").await;
        let romance = seed_genre(&catalog, "Romance").await;
        seed_genre(&catalog, "Satire").await;

        let page = create_post(
            &catalog,
            &form(&[
                ("title", "Emma"),
                ("author", author.id.as_str()),
                ("summary", ""),
                ("isbn", "9780141439587"),
                ("genre", romance.id.as_str()),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(page.template(), Some("book_form"));
        let context = page.context().unwrap();
        assert_eq!(selected_ids(&context["authors"]), vec![author.id.clone()]);
        assert_eq!(selected_ids(&context["genres"]), vec![romance.id.clone()]);
        assert_eq!(context["errors"][0]["field"], "summary");
        assert_eq!(book_count(&catalog).await, 0);
    }

    #[tokio::test]
    async fn create_form_sorts_candidates() {
        let catalog = catalog().await;
        seed_author(&catalog, "Emily", "Bronte").await;
        seed_author(&catalog, "Jane", "Austen").await;
        seed_genre(&catalog, "Satire").await;
        seed_genre(&catalog, "Romance").await;

        let page = create_get(&catalog).await.unwrap();
        let context = page.context().unwrap();
        assert_eq!(context["title"], "Create Book");
        assert_eq!(context["authors"][0]["label"], "Austen, Jane");
        assert_eq!(context["genres"][0]["label"], "Romance");
        assert!(selected_ids(&context["authors"]).is_empty());
    }

    #[tokio::test]
    async fn list_sorts_by_title_and_names_authors() {
        let catalog = catalog().await;
        let author = seed_author(&catalog, "Jane", "Austen").await;
        seed_book(&catalog, "Persuasion", &author.id, &[]).await;
        seed_book(&catalog, "Emma", &author.id, &[]).await;

        let page = list(&catalog).await.unwrap();
        let books = page.context().unwrap()["book_list"].as_array().unwrap().clone();
        assert_eq!(books[0]["title"], "Emma");
        assert_eq!(books[1]["title"], "Persuasion");
        assert_eq!(books[0]["author_name"], "Austen, Jane");
    }

    #[tokio::test]
    async fn detail_lists_copies() {
        let catalog = catalog().await;
        let author = seed_author(&catalog, "Jane", "Austen").await;
        let book = seed_book(&catalog, "Emma", &author.id, &[]).await;
        seed_instance(&catalog, &book.id, BookStatus::Available).await;

        let page = detail(&catalog, &book.id).await.unwrap();
        let copies = page.context().unwrap()["book_instances"].as_array().unwrap().clone();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0]["status"], "Available");
    }

    #[tokio::test]
    async fn missing_book_is_not_found() {
        let catalog = catalog().await;
        assert!(matches!(
            detail(&catalog, "nope").await.unwrap_err(),
            AppError::NotFound { .. }
        ));
        assert!(matches!(
            update_get(&catalog, "nope").await.unwrap_err(),
            AppError::NotFound { .. }
        ));
        let page = delete_get(&catalog, "nope").await.unwrap();
        assert_eq!(page.redirect_target(), Some("/catalog/books"));
    }

    #[tokio::test]
    async fn delete_is_unguarded() {
        let catalog = catalog().await;
        let author = seed_author(&catalog, "Jane", "Austen").await;
        let book = seed_book(&catalog, "Emma", &author.id, &[]).await;
        seed_instance(&catalog, &book.id, BookStatus::Loaned).await;

        let confirm = delete_get(&catalog, &book.id).await.unwrap();
        assert_eq!(
            confirm.context().unwrap()["book_instances"]
                .as_array()
                .unwrap()
                .len(),
            1
        );

        let page = delete_post(&catalog, &book.id, &form(&[("bookid", book.id.as_str())]))
            .await
            .unwrap();
        assert_eq!(page.redirect_target(), Some("/catalog/books"));
        assert_eq!(book_count(&catalog).await, 0);
    }

    #[tokio::test]
    async fn update_form_preselects_current_references() {
        let catalog = catalog().await;
        let author = seed_author(&catalog, "Jane", "Austen").await;
        let romance = seed_genre(&catalog, "Romance").await;
        let book = seed_book(&catalog, "Emma", &author.id, &[&romance.id]).await;

        let page = update_get(&catalog, &book.id).await.unwrap();
        let context = page.context().unwrap();
        assert_eq!(context["book"]["id"], book.id.as_str());
        assert_eq!(selected_ids(&context["authors"]), vec![author.id.clone()]);
        assert_eq!(selected_ids(&context["genres"]), vec![romance.id.clone()]);
    }

    #[tokio::test]
    async fn update_replaces_fields_in_place() {
        let catalog = catalog().await;
        let author = seed_author(&catalog, "Jane", "Austen").await;
        let romance = seed_genre(&catalog, "Romance").await;
        let book = seed_book(&catalog, "Emma", &author.id, &[&romance.id]).await;

        let page = update_post(
            &catalog,
            &book.id,
            &form(&[
                ("title", "Emma"),
                ("author", author.id.as_str()),
                ("summary", "Revised"),
                ("isbn", "9780141439587"),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(page.redirect_target(), Some(book.url().as_str()));
        let stored = catalog.get::<Book>(&book.id).await.unwrap().unwrap();
        assert_eq!(stored.record.summary, "Revised");
        assert!(stored.record.genre.is_empty());
        assert_eq!(book_count(&catalog).await, 1);
    }
}
