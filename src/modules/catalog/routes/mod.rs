//! HTTP surface of the catalog: thin axum handlers over the workflows.

use std::sync::Arc;

use atlas_http::error::AppError;
use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Form, Router,
};

use super::gateway::Catalog;
use super::validation::FormData;
use super::view::{self, Page, Renderer};
use super::workflow::{self, author, book, book_instance, genre};

/// Shared state handed to every catalog handler.
#[derive(Clone)]
pub struct CatalogState {
    pub catalog: Catalog,
    pub renderer: Arc<dyn Renderer>,
}

impl CatalogState {
    fn respond(&self, page: Page) -> Response {
        view::respond(self.renderer.as_ref(), page)
    }
}

/// One entry of the routing table, relative to the catalog mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
}

const fn route(method: &'static str, path: &'static str, summary: &'static str) -> RouteInfo {
    RouteInfo {
        method,
        path,
        summary,
    }
}

/// Every catalog route. `create` paths precede the `{id}` paths of the same
/// entity.
pub const ROUTES: &[RouteInfo] = &[
    route("GET", "/", "List books"),
    route("GET", "/summary", "Catalog record counts"),
    route("GET", "/books", "List books"),
    route("GET", "/book/create", "Book create form"),
    route("POST", "/book/create", "Create a book"),
    route("GET", "/book/{id}", "Book detail"),
    route("GET", "/book/{id}/update", "Book update form"),
    route("POST", "/book/{id}/update", "Update a book"),
    route("GET", "/book/{id}/delete", "Book delete confirmation"),
    route("POST", "/book/{id}/delete", "Delete a book"),
    route("GET", "/authors", "List authors"),
    route("GET", "/author/create", "Author create form"),
    route("POST", "/author/create", "Create an author"),
    route("GET", "/author/{id}", "Author detail"),
    route("GET", "/author/{id}/update", "Author update form"),
    route("POST", "/author/{id}/update", "Update an author"),
    route("GET", "/author/{id}/delete", "Author delete confirmation"),
    route("POST", "/author/{id}/delete", "Delete an author unless books reference it"),
    route("GET", "/genres", "List genres"),
    route("GET", "/genre/create", "Genre create form"),
    route("POST", "/genre/create", "Create a genre or reuse one with the same name"),
    route("GET", "/genre/{id}", "Genre detail"),
    route("GET", "/genre/{id}/update", "Genre update form"),
    route("POST", "/genre/{id}/update", "Update a genre"),
    route("GET", "/genre/{id}/delete", "Genre delete confirmation"),
    route("POST", "/genre/{id}/delete", "Delete a genre unless books reference it"),
    route("GET", "/bookinstances", "List book copies"),
    route("GET", "/bookinstance/create", "Book copy create form"),
    route("POST", "/bookinstance/create", "Create a book copy"),
    route("GET", "/bookinstance/{id}", "Book copy detail"),
    route("GET", "/bookinstance/{id}/update", "Book copy update form"),
    route("POST", "/bookinstance/{id}/update", "Update a book copy"),
    route("GET", "/bookinstance/{id}/delete", "Book copy delete confirmation"),
    route("POST", "/bookinstance/{id}/delete", "Delete a book copy"),
];

type Submitted = Form<Vec<(String, String)>>;
type Reply = Result<Response, AppError>;

pub fn router(state: CatalogState) -> Router {
    Router::new()
        .route("/", get(book_list))
        .route("/summary", get(summary))
        .route("/books", get(book_list))
        .route("/book/create", get(book_create_get).post(book_create_post))
        .route("/book/{id}", get(book_detail))
        .route("/book/{id}/update", get(book_update_get).post(book_update_post))
        .route("/book/{id}/delete", get(book_delete_get).post(book_delete_post))
        .route("/authors", get(author_list))
        .route("/author/create", get(author_create_get).post(author_create_post))
        .route("/author/{id}", get(author_detail))
        .route("/author/{id}/update", get(author_update_get).post(author_update_post))
        .route("/author/{id}/delete", get(author_delete_get).post(author_delete_post))
        .route("/genres", get(genre_list))
        .route("/genre/create", get(genre_create_get).post(genre_create_post))
        .route("/genre/{id}", get(genre_detail))
        .route("/genre/{id}/update", get(genre_update_get).post(genre_update_post))
        .route("/genre/{id}/delete", get(genre_delete_get).post(genre_delete_post))
        .route("/bookinstances", get(copy_list))
        .route("/bookinstance/create", get(copy_create_get).post(copy_create_post))
        .route("/bookinstance/{id}", get(copy_detail))
        .route("/bookinstance/{id}/update", get(copy_update_get).post(copy_update_post))
        .route("/bookinstance/{id}/delete", get(copy_delete_get).post(copy_delete_post))
        .with_state(state)
}

async fn summary(State(s): State<CatalogState>) -> Reply {
    Ok(s.respond(workflow::summary(&s.catalog).await?))
}

// Books

async fn book_list(State(s): State<CatalogState>) -> Reply {
    Ok(s.respond(book::list(&s.catalog).await?))
}

async fn book_detail(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(book::detail(&s.catalog, &id).await?))
}

async fn book_create_get(State(s): State<CatalogState>) -> Reply {
    Ok(s.respond(book::create_get(&s.catalog).await?))
}

async fn book_create_post(State(s): State<CatalogState>, Form(pairs): Submitted) -> Reply {
    Ok(s.respond(book::create_post(&s.catalog, &FormData::new(pairs)).await?))
}

async fn book_update_get(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(book::update_get(&s.catalog, &id).await?))
}

async fn book_update_post(
    State(s): State<CatalogState>,
    Path(id): Path<String>,
    Form(pairs): Submitted,
) -> Reply {
    Ok(s.respond(book::update_post(&s.catalog, &id, &FormData::new(pairs)).await?))
}

async fn book_delete_get(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(book::delete_get(&s.catalog, &id).await?))
}

async fn book_delete_post(
    State(s): State<CatalogState>,
    Path(id): Path<String>,
    Form(pairs): Submitted,
) -> Reply {
    Ok(s.respond(book::delete_post(&s.catalog, &id, &FormData::new(pairs)).await?))
}

// Authors

async fn author_list(State(s): State<CatalogState>) -> Reply {
    Ok(s.respond(author::list(&s.catalog).await?))
}

async fn author_detail(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(author::detail(&s.catalog, &id).await?))
}

async fn author_create_get(State(s): State<CatalogState>) -> Response {
    s.respond(author::create_get())
}

async fn author_create_post(State(s): State<CatalogState>, Form(pairs): Submitted) -> Reply {
    Ok(s.respond(author::create_post(&s.catalog, &FormData::new(pairs)).await?))
}

async fn author_update_get(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(author::update_get(&s.catalog, &id).await?))
}

async fn author_update_post(
    State(s): State<CatalogState>,
    Path(id): Path<String>,
    Form(pairs): Submitted,
) -> Reply {
    Ok(s.respond(author::update_post(&s.catalog, &id, &FormData::new(pairs)).await?))
}

async fn author_delete_get(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(author::delete_get(&s.catalog, &id).await?))
}

async fn author_delete_post(
    State(s): State<CatalogState>,
    Path(id): Path<String>,
    Form(pairs): Submitted,
) -> Reply {
    Ok(s.respond(author::delete_post(&s.catalog, &id, &FormData::new(pairs)).await?))
}

// Genres

async fn genre_list(State(s): State<CatalogState>) -> Reply {
    Ok(s.respond(genre::list(&s.catalog).await?))
}

async fn genre_detail(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(genre::detail(&s.catalog, &id).await?))
}

async fn genre_create_get(State(s): State<CatalogState>) -> Response {
    s.respond(genre::create_get())
}

async fn genre_create_post(State(s): State<CatalogState>, Form(pairs): Submitted) -> Reply {
    Ok(s.respond(genre::create_post(&s.catalog, &FormData::new(pairs)).await?))
}

async fn genre_update_get(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(genre::update_get(&s.catalog, &id).await?))
}

async fn genre_update_post(
    State(s): State<CatalogState>,
    Path(id): Path<String>,
    Form(pairs): Submitted,
) -> Reply {
    Ok(s.respond(genre::update_post(&s.catalog, &id, &FormData::new(pairs)).await?))
}

async fn genre_delete_get(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(genre::delete_get(&s.catalog, &id).await?))
}

async fn genre_delete_post(
    State(s): State<CatalogState>,
    Path(id): Path<String>,
    Form(pairs): Submitted,
) -> Reply {
    Ok(s.respond(genre::delete_post(&s.catalog, &id, &FormData::new(pairs)).await?))
}

// Book copies

async fn copy_list(State(s): State<CatalogState>) -> Reply {
    Ok(s.respond(book_instance::list(&s.catalog).await?))
}

async fn copy_detail(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(book_instance::detail(&s.catalog, &id).await?))
}

async fn copy_create_get(State(s): State<CatalogState>) -> Reply {
    Ok(s.respond(book_instance::create_get(&s.catalog).await?))
}

async fn copy_create_post(State(s): State<CatalogState>, Form(pairs): Submitted) -> Reply {
    Ok(s.respond(book_instance::create_post(&s.catalog, &FormData::new(pairs)).await?))
}

async fn copy_update_get(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(book_instance::update_get(&s.catalog, &id).await?))
}

async fn copy_update_post(
    State(s): State<CatalogState>,
    Path(id): Path<String>,
    Form(pairs): Submitted,
) -> Reply {
    Ok(s.respond(book_instance::update_post(&s.catalog, &id, &FormData::new(pairs)).await?))
}

async fn copy_delete_get(State(s): State<CatalogState>, Path(id): Path<String>) -> Reply {
    Ok(s.respond(book_instance::delete_get(&s.catalog, &id).await?))
}

async fn copy_delete_post(
    State(s): State<CatalogState>,
    Path(id): Path<String>,
    Form(pairs): Submitted,
) -> Reply {
    Ok(s.respond(book_instance::delete_post(&s.catalog, &id, &FormData::new(pairs)).await?))
}
