use atlas_db::{Direction, Filter, Query};
use atlas_http::error::AppError;
use serde_json::{json, Map, Value};

use super::{deletion_target, form_context, not_found};
use crate::modules::catalog::gateway::Catalog;
use crate::modules::catalog::integrity::{self, BookRef, Guarded};
use crate::modules::catalog::models::{list_url, Book, BookSummary, Genre, Stored};
use crate::modules::catalog::validation::{self, FieldError, FormData};
use crate::modules::catalog::view::{self, Page};

const DUPLICATE_NAME: &str = "Genre with this name already exists";

pub async fn list(catalog: &Catalog) -> Result<Page, AppError> {
    let query = Query::new().sort_by("name", Direction::Ascending);
    let genres = catalog.list::<Genre>(&query).await?;

    Ok(Page::render(
        "genre_list",
        json!({
            "title": "Genre List",
            "genre_list": genres.iter().map(view::genre).collect::<Vec<_>>(),
        }),
    ))
}

pub async fn detail(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let tagged = integrity::dependents_query(Guarded::Genre, id);
    let (genre, books) = tokio::try_join!(
        catalog.get::<Genre>(id),
        catalog.project::<Book, BookSummary>(&tagged),
    )?;
    let genre = genre.ok_or_else(|| not_found("Genre", id))?;
    let books: Vec<_> = books.into_iter().map(BookRef::from).collect();

    Ok(Page::render(
        "genre_detail",
        json!({
            "title": "Genre Detail",
            "genre": view::genre(&genre),
            "genre_books": books,
        }),
    ))
}

pub fn create_get() -> Page {
    Page::render("genre_form", json!({ "title": "Create Genre" }))
}

/// Names match case-insensitively against the stored genres.
async fn find_by_name(catalog: &Catalog, name: &str) -> Result<Option<Stored<Genre>>, AppError> {
    let query = Query::new().filter(Filter::eq_ignore_case("name", name));
    Ok(catalog.find_one::<Genre>(&query).await?)
}

pub async fn create_post(catalog: &Catalog, form: &FormData) -> Result<Page, AppError> {
    let genre = match validation::genre(form) {
        Ok(genre) => genre,
        Err(rejected) => {
            return Ok(Page::render(
                "genre_form",
                form_context(
                    "Create Genre",
                    "genre",
                    rejected.values,
                    None,
                    &rejected.errors,
                ),
            ));
        }
    };

    if let Some(existing) = find_by_name(catalog, &genre.name).await? {
        tracing::info!(entity = "genre", id = %existing.id, name = %genre.name, "genre already exists");
        return Ok(Page::redirect(existing.url()));
    }

    let genre = catalog.create(genre).await?;
    tracing::info!(entity = "genre", id = %genre.id, "genre created");
    Ok(Page::redirect(genre.url()))
}

pub async fn delete_get(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let (genre, check) = tokio::try_join!(
        catalog.get::<Genre>(id),
        integrity::can_delete(catalog, Guarded::Genre, id),
    )?;

    let Some(genre) = genre else {
        return Ok(Page::redirect(list_url::<Genre>()));
    };

    Ok(delete_page(&genre, check))
}

pub async fn delete_post(catalog: &Catalog, path_id: &str, form: &FormData) -> Result<Page, AppError> {
    let target = deletion_target("genre", path_id, form, "genreid")?;

    let (genre, check) = tokio::try_join!(
        catalog.get::<Genre>(&target),
        integrity::can_delete(catalog, Guarded::Genre, &target),
    )?;

    if !check.allowed() {
        tracing::warn!(
            entity = "genre",
            id = %target,
            blockers = check.blockers.len(),
            "genre delete refused"
        );
        return Ok(match genre {
            Some(genre) => delete_page(&genre, check),
            None => Page::redirect(list_url::<Genre>()),
        });
    }

    let removed = catalog.delete::<Genre>(&target).await?;
    tracing::info!(entity = "genre", id = %target, removed, "genre deleted");
    Ok(Page::redirect(list_url::<Genre>()))
}

fn delete_page(genre: &Stored<Genre>, check: integrity::DeleteCheck) -> Page {
    Page::render(
        "genre_delete",
        json!({
            "title": "Delete Genre",
            "genre": view::genre(genre),
            "genre_books": check.blockers,
        }),
    )
}

pub async fn update_get(catalog: &Catalog, id: &str) -> Result<Page, AppError> {
    let genre = catalog
        .get::<Genre>(id)
        .await?
        .ok_or_else(|| not_found("Genre", id))?;

    Ok(Page::render(
        "genre_form",
        json!({
            "title": "Update Genre",
            "genre": view::genre(&genre),
        }),
    ))
}

pub async fn update_post(catalog: &Catalog, id: &str, form: &FormData) -> Result<Page, AppError> {
    let genre = match validation::genre(form) {
        Ok(genre) => genre,
        Err(rejected) => {
            return Ok(Page::render(
                "genre_form",
                form_context(
                    "Update Genre",
                    "genre",
                    rejected.values,
                    Some(id),
                    &rejected.errors,
                ),
            ));
        }
    };

    // Renaming onto another genre's name would break name uniqueness.
    if let Some(existing) = find_by_name(catalog, &genre.name).await? {
        if existing.id != id {
            let mut values = Map::new();
            values.insert("name".to_string(), Value::String(genre.name.clone()));
            let errors = [FieldError {
                field: "name",
                message: DUPLICATE_NAME.to_string(),
                value: genre.name,
            }];
            return Ok(Page::render(
                "genre_form",
                form_context("Update Genre", "genre", values, Some(id), &errors),
            ));
        }
    }

    let genre = catalog
        .replace(id, genre)
        .await?
        .ok_or_else(|| not_found("Genre", id))?;
    tracing::info!(entity = "genre", id = %genre.id, "genre updated");
    Ok(Page::redirect(genre.url()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::catalog::testing::{catalog, form, seed_author, seed_book, seed_genre};

    async fn genre_count(catalog: &Catalog) -> usize {
        catalog.count::<Genre>(&Query::new()).await.unwrap()
    }

    #[tokio::test]
    async fn create_redirects_to_new_genre() {
        let catalog = catalog().await;
        let page = create_post(&catalog, &form(&[("name", "Fantasy")]))
            .await
            .unwrap();

        let url = page.redirect_target().unwrap();
        assert!(url.starts_with("/catalog/genre/"));
        assert_eq!(genre_count(&catalog).await, 1);
    }

    #[tokio::test]
    async fn duplicate_names_collapse_case_insensitively() {
        let catalog = catalog().await;
        let first = create_post(&catalog, &form(&[("name", "fiction")]))
            .await
            .unwrap();
        let second = create_post(&catalog, &form(&[("name", "Fiction")]))
            .await
            .unwrap();

        assert_eq!(first.redirect_target(), second.redirect_target());
        assert_eq!(genre_count(&catalog).await, 1);
        let stored = catalog.list::<Genre>(&Query::new()).await.unwrap();
        assert_eq!(stored[0].record.name, "fiction");
    }

    #[tokio::test]
    async fn sharp_s_and_double_s_are_the_same_genre() {
        let catalog = catalog().await;
        let first = create_post(&catalog, &form(&[("name", "Strasse")]))
            .await
            .unwrap();
        let second = create_post(&catalog, &form(&[("name", "STRAßE")]))
            .await
            .unwrap();

        assert_eq!(first.redirect_target(), second.redirect_target());
        assert_eq!(genre_count(&catalog).await, 1);
    }

    #[tokio::test]
    async fn escaped_name_over_limit_is_not_stored() {
        let catalog = catalog().await;
        let page = create_post(&catalog, &form(&[("name", &"&".repeat(100))]))
            .await
            .unwrap();

        assert_eq!(page.template(), Some("genre_form"));
        assert_eq!(page.context().unwrap()["errors"][0]["field"], "name");
        assert_eq!(genre_count(&catalog).await, 0);
    }

    #[tokio::test]
    async fn short_name_is_rejected() {
        let catalog = catalog().await;
        let page = create_post(&catalog, &form(&[("name", "  ab ")]))
            .await
            .unwrap();

        assert_eq!(page.template(), Some("genre_form"));
        let context = page.context().unwrap();
        assert_eq!(context["genre"]["name"], "ab");
        assert_eq!(
            context["errors"][0]["message"],
            "Genre name must contain between 3 and 100 characters"
        );
        assert_eq!(genre_count(&catalog).await, 0);
    }

    #[tokio::test]
    async fn detail_lists_member_books() {
        let catalog = catalog().await;
        let author = seed_author(&catalog, "Jane", "Austen").await;
        let romance = seed_genre(&catalog, "Romance").await;
        let satire = seed_genre(&catalog, "Satire").await;
        let emma = seed_book(&catalog, "Emma", &author.id, &[&romance.id]).await;
        seed_book(&catalog, "Lady Susan", &author.id, &[&satire.id]).await;

        let page = detail(&catalog, &romance.id).await.unwrap();
        let context = page.context().unwrap();
        assert_eq!(context["genre"]["name"], "Romance");
        let books = context["genre_books"].as_array().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0]["id"], emma.id.as_str());
    }

    #[tokio::test]
    async fn list_is_sorted_by_name() {
        let catalog = catalog().await;
        seed_genre(&catalog, "Satire").await;
        seed_genre(&catalog, "Horror").await;

        let page = list(&catalog).await.unwrap();
        let names: Vec<_> = page.context().unwrap()["genre_list"]
            .as_array()
            .unwrap()
            .iter()
            .map(|g| g["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Horror", "Satire"]);
    }

    #[tokio::test]
    async fn delete_refused_while_books_use_genre() {
        let catalog = catalog().await;
        let author = seed_author(&catalog, "Jane", "Austen").await;
        let genre = seed_genre(&catalog, "Romance").await;
        seed_book(&catalog, "Emma", &author.id, &[&genre.id]).await;

        let page = delete_post(&catalog, &genre.id, &form(&[("genreid", genre.id.as_str())]))
            .await
            .unwrap();

        assert_eq!(page.template(), Some("genre_delete"));
        assert_eq!(page.context().unwrap()["genre_books"].as_array().unwrap().len(), 1);
        assert_eq!(genre_count(&catalog).await, 1);
    }

    #[tokio::test]
    async fn unused_genre_is_deleted() {
        let catalog = catalog().await;
        let genre = seed_genre(&catalog, "Horror").await;

        let page = delete_post(&catalog, &genre.id, &form(&[("genreid", genre.id.as_str())]))
            .await
            .unwrap();

        assert_eq!(page.redirect_target(), Some("/catalog/genres"));
        assert_eq!(genre_count(&catalog).await, 0);
    }

    #[tokio::test]
    async fn delete_get_of_missing_genre_redirects_to_list() {
        let catalog = catalog().await;
        let page = delete_get(&catalog, "nope").await.unwrap();
        assert_eq!(page.redirect_target(), Some("/catalog/genres"));
    }

    #[tokio::test]
    async fn rename_onto_existing_name_is_rejected() {
        let catalog = catalog().await;
        seed_genre(&catalog, "Romance").await;
        let horror = seed_genre(&catalog, "Horror").await;

        let page = update_post(&catalog, &horror.id, &form(&[("name", "ROMANCE")]))
            .await
            .unwrap();

        let context = page.context().unwrap();
        assert_eq!(context["errors"][0]["field"], "name");
        assert_eq!(context["genre"]["id"], horror.id.as_str());
        let stored = catalog.get::<Genre>(&horror.id).await.unwrap().unwrap();
        assert_eq!(stored.record.name, "Horror");
    }

    #[tokio::test]
    async fn renaming_case_of_own_name_is_allowed() {
        let catalog = catalog().await;
        let genre = seed_genre(&catalog, "horror").await;

        let page = update_post(&catalog, &genre.id, &form(&[("name", "Horror")]))
            .await
            .unwrap();

        assert_eq!(page.redirect_target(), Some(genre.url().as_str()));
        let stored = catalog.get::<Genre>(&genre.id).await.unwrap().unwrap();
        assert_eq!(stored.record.name, "Horror");
    }
}
