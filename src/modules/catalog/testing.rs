//! Fixtures shared by the catalog tests.

use atlas_db::Database;

use super::gateway::Catalog;
use super::models::{Author, Book, BookInstance, BookStatus, Genre, Record, Stored};
use super::validation::FormData;

pub async fn catalog() -> Catalog {
    let db = Database::in_memory().await.unwrap();
    db.declare_collections([
        Author::COLLECTION,
        Book::COLLECTION,
        Genre::COLLECTION,
        BookInstance::COLLECTION,
    ])
    .await
    .unwrap();
    Catalog::new(db)
}

pub fn form(pairs: &[(&str, &str)]) -> FormData {
    pairs.iter().copied().collect()
}

pub async fn seed_author(catalog: &Catalog, first: &str, family: &str) -> Stored<Author> {
    catalog
        .create(Author {
            first_name: first.to_string(),
            family_name: family.to_string(),
            date_of_birth: None,
            date_of_death: None,
        })
        .await
        .unwrap()
}

pub async fn seed_genre(catalog: &Catalog, name: &str) -> Stored<Genre> {
    catalog
        .create(Genre {
            name: name.to_string(),
        })
        .await
        .unwrap()
}

pub async fn seed_book(
    catalog: &Catalog,
    title: &str,
    author_id: &str,
    genre_ids: &[&str],
) -> Stored<Book> {
    catalog
        .create(Book {
            title: title.to_string(),
            author: author_id.to_string(),
            summary: format!("Summary of {title}"),
            isbn: "9780000000000".to_string(),
            genre: genre_ids.iter().map(|id| id.to_string()).collect(),
        })
        .await
        .unwrap()
}

pub async fn seed_instance(
    catalog: &Catalog,
    book_id: &str,
    status: BookStatus,
) -> Stored<BookInstance> {
    catalog
        .create(BookInstance {
            book: book_id.to_string(),
            imprint: "First edition".to_string(),
            status,
            due_back: None,
        })
        .await
        .unwrap()
}
