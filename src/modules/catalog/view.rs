//! Page values produced by the workflows and the renderer that turns them
//! into responses.

use axum::{
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::{json, Value};

use super::models::{Author, Book, BookInstance, Genre, Stored};

/// Outcome of a catalog workflow step.
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Render {
        template: &'static str,
        context: Value,
    },
    Redirect(String),
}

impl Page {
    pub fn render(template: &'static str, context: Value) -> Self {
        Self::Render { template, context }
    }

    pub fn redirect(url: impl Into<String>) -> Self {
        Self::Redirect(url.into())
    }

    pub fn template(&self) -> Option<&'static str> {
        match self {
            Page::Render { template, .. } => Some(*template),
            Page::Redirect(_) => None,
        }
    }

    pub fn context(&self) -> Option<&Value> {
        match self {
            Page::Render { context, .. } => Some(context),
            Page::Redirect(_) => None,
        }
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Page::Redirect(url) => Some(url.as_str()),
            Page::Render { .. } => None,
        }
    }
}

/// Turns a template name and its payload into a response. Rendering has no
/// side effects on catalog data.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: Value) -> Response;
}

/// Serves the page payload as JSON: `{"template": ..., "context": ...}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: Value) -> Response {
        Json(json!({ "template": template, "context": context })).into_response()
    }
}

pub fn respond(renderer: &dyn Renderer, page: Page) -> Response {
    match page {
        Page::Render { template, context } => renderer.render(template, context),
        Page::Redirect(url) => Redirect::to(&url).into_response(),
    }
}

pub fn author(author: &Stored<Author>) -> Value {
    let record = &author.record;
    json!({
        "id": author.id,
        "url": author.url(),
        "first_name": record.first_name,
        "family_name": record.family_name,
        "date_of_birth": record.date_of_birth,
        "date_of_death": record.date_of_death,
        "name": record.name(),
        "lifespan": record.lifespan(),
        "date_of_birth_formatted": record.date_of_birth_formatted(),
        "date_of_death_formatted": record.date_of_death_formatted(),
    })
}

pub fn genre(genre: &Stored<Genre>) -> Value {
    json!({
        "id": genre.id,
        "url": genre.url(),
        "name": genre.record.name,
    })
}

/// Book with its references resolved where available.
pub fn book(book: &Stored<Book>, author: Option<&Stored<Author>>, genres: &[Stored<Genre>]) -> Value {
    let record = &book.record;
    let genres: Vec<Value> = genres
        .iter()
        .filter(|g| record.genre.contains(&g.id))
        .map(self::genre)
        .collect();

    json!({
        "id": book.id,
        "url": book.url(),
        "title": record.title,
        "author": record.author,
        "author_name": author.map(|a| a.record.name()),
        "author_url": author.map(Stored::url),
        "summary": record.summary,
        "isbn": record.isbn,
        "genre": record.genre,
        "genres": genres,
    })
}

pub fn book_instance(instance: &Stored<BookInstance>, book: Option<&Stored<Book>>) -> Value {
    let record = &instance.record;
    json!({
        "id": instance.id,
        "url": instance.url(),
        "book": record.book,
        "book_title": book.map(|b| b.record.title.clone()),
        "book_url": book.map(Stored::url),
        "imprint": record.imprint,
        "status": record.status,
        "due_back": record.due_back,
        "due_back_formatted": record.due_back_formatted(),
    })
}

/// Select-list entries `{id, label, selected}`.
pub fn choices<'a, I>(items: I, selected: &[String]) -> Vec<Value>
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    items
        .into_iter()
        .map(|(id, label)| {
            json!({
                "id": id,
                "label": label,
                "selected": selected.iter().any(|s| s == id),
            })
        })
        .collect()
}
