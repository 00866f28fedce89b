//! Field-level validation and sanitization of submitted forms.
//!
//! Text values are trimmed and HTML-escaped first, then checked through
//! `validator` derives on per-entity input structs. Every rule runs, so one
//! failing field never hides errors on another.

use serde::Serialize;
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use validator::{Validate, ValidationError};

use super::models::{Author, Book, BookInstance, BookStatus, Genre};

/// Decoded `application/x-www-form-urlencoded` body. Repeated keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value submitted for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all(&self, field: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == field)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
    pub value: String,
}

/// A submission that failed validation: the normalized values to re-render
/// the form with, and every error found.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub values: Map<String, Value>,
    pub errors: Vec<FieldError>,
}

impl Rejected {
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(Value::as_str)
    }

    pub fn has_error_on(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }
}

fn alphanumeric(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ValidationError::new("alphanumeric"))
    }
}

#[derive(Debug, Validate)]
struct AuthorInput {
    #[validate(
        length(min = 1, max = 100, message = "First name must be specified and at most 100 characters."),
        custom(function = "alphanumeric", message = "First name has non-alphanumeric characters.")
    )]
    first_name: String,
    #[validate(
        length(min = 1, max = 100, message = "Family name must be specified and at most 100 characters."),
        custom(function = "alphanumeric", message = "Family name has non-alphanumeric characters.")
    )]
    family_name: String,
}

#[derive(Debug, Validate)]
struct GenreInput {
    #[validate(length(min = 3, max = 100, message = "Genre name must contain between 3 and 100 characters"))]
    name: String,
}

#[derive(Debug, Validate)]
struct BookInput {
    #[validate(length(min = 1, message = "Title must not be empty."))]
    title: String,
    #[validate(length(min = 1, message = "Author must not be empty."))]
    author: String,
    #[validate(length(min = 1, message = "Summary must not be empty."))]
    summary: String,
    #[validate(length(min = 1, message = "ISBN must not be empty."))]
    isbn: String,
}

#[derive(Debug, Validate)]
struct BookInstanceInput {
    #[validate(length(min = 1, message = "Book must be specified"))]
    book: String,
    #[validate(length(min = 1, message = "Imprint must be specified"))]
    imprint: String,
    #[validate(length(min = 1, message = "Status must be specified"))]
    status: String,
}

/// Accumulates normalized values and errors across the fields of one form.
/// Text is checked in its escaped form, the form it is stored in.
struct Submission<'a> {
    form: &'a FormData,
    values: Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Submission<'a> {
    fn new(form: &'a FormData) -> Self {
        Self {
            form,
            values: Map::new(),
            errors: Vec::new(),
        }
    }

    /// Trimmed and escaped value of `field`.
    fn text(&mut self, field: &'static str) -> String {
        let escaped = escape(self.form.get(field).unwrap_or_default().trim());
        self.values
            .insert(field.to_string(), Value::String(escaped.clone()));
        escaped
    }

    /// Optional ISO-8601 date. Blank input is treated as absent.
    fn date(&mut self, field: &'static str, message: &'static str) -> Option<Date> {
        let form = self.form;
        let trimmed = form.get(field).unwrap_or_default().trim();
        if trimmed.is_empty() {
            self.values.insert(field.to_string(), Value::Null);
            return None;
        }

        let escaped = escape(trimmed);
        self.values
            .insert(field.to_string(), Value::String(escaped.clone()));
        let date = parse_iso_date(trimmed);
        if date.is_none() {
            self.reject(field, message.to_string(), escaped);
        }
        date
    }

    /// Every non-blank value submitted for `field`, escaped.
    fn list(&mut self, field: &'static str) -> Vec<String> {
        let values: Vec<String> = self
            .form
            .get_all(field)
            .into_iter()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(escape)
            .collect();

        self.values.insert(
            field.to_string(),
            Value::Array(values.iter().cloned().map(Value::String).collect()),
        );
        values
    }

    /// Run the derived rules of `input`, reporting errors in `fields` order.
    fn check(&mut self, input: &impl Validate, fields: &[&'static str]) {
        let Err(report) = input.validate() else {
            return;
        };
        let by_field = report.field_errors();
        for &field in fields {
            let Some(failures) = by_field.get(field) else {
                continue;
            };
            for failure in failures.iter() {
                let message = failure
                    .message
                    .as_deref()
                    .unwrap_or(failure.code.as_ref())
                    .to_string();
                let value = self
                    .values
                    .get(field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                self.reject(field, message, value);
            }
        }
    }

    fn reject(&mut self, field: &'static str, message: String, value: String) {
        self.errors.push(FieldError {
            field,
            message,
            value,
        });
    }

    fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn into_rejected(self) -> Rejected {
        Rejected {
            values: self.values,
            errors: self.errors,
        }
    }

    fn finish<T>(self, record: T) -> Result<T, Rejected> {
        if self.is_clean() {
            Ok(record)
        } else {
            Err(self.into_rejected())
        }
    }
}

pub fn author(form: &FormData) -> Result<Author, Rejected> {
    let mut v = Submission::new(form);
    let input = AuthorInput {
        first_name: v.text("first_name"),
        family_name: v.text("family_name"),
    };
    v.check(&input, &["first_name", "family_name"]);
    let date_of_birth = v.date("date_of_birth", "Invalid date of birth");
    let date_of_death = v.date("date_of_death", "Invalid date of death");

    v.finish(Author {
        first_name: input.first_name,
        family_name: input.family_name,
        date_of_birth,
        date_of_death,
    })
}

pub fn genre(form: &FormData) -> Result<Genre, Rejected> {
    let mut v = Submission::new(form);
    let input = GenreInput {
        name: v.text("name"),
    };
    v.check(&input, &["name"]);
    v.finish(Genre { name: input.name })
}

pub fn book(form: &FormData) -> Result<Book, Rejected> {
    let mut v = Submission::new(form);
    let input = BookInput {
        title: v.text("title"),
        author: v.text("author"),
        summary: v.text("summary"),
        isbn: v.text("isbn"),
    };
    v.check(&input, &["title", "author", "summary", "isbn"]);
    let genre = v.list("genre");

    v.finish(Book {
        title: input.title,
        author: input.author,
        summary: input.summary,
        isbn: input.isbn,
        genre,
    })
}

pub fn book_instance(form: &FormData) -> Result<BookInstance, Rejected> {
    let mut v = Submission::new(form);
    let input = BookInstanceInput {
        book: v.text("book"),
        imprint: v.text("imprint"),
        status: v.text("status"),
    };
    v.check(&input, &["book", "imprint", "status"]);

    let status = match input.status.parse::<BookStatus>() {
        Ok(status) => Some(status),
        Err(unknown) => {
            // Blank status is already reported by the length rule.
            if !input.status.is_empty() {
                v.reject("status", unknown.to_string(), input.status.clone());
            }
            None
        }
    };
    let due_back = v.date("due_back", "Invalid date");

    match status {
        Some(status) if v.is_clean() => Ok(BookInstance {
            book: input.book,
            imprint: input.imprint,
            status,
            due_back,
        }),
        _ => Err(v.into_rejected()),
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its calendar date is kept).
pub fn parse_iso_date(value: &str) -> Option<Date> {
    let calendar = format_description!("[year]-[month]-[day]");
    Date::parse(value, &calendar)
        .ok()
        .or_else(|| OffsetDateTime::parse(value, &Rfc3339).ok().map(|dt| dt.date()))
}

/// HTML-escape the characters a form sanitizer replaces.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn form(pairs: &[(&str, &str)]) -> FormData {
        pairs.iter().copied().collect()
    }

    #[test]
    fn author_fields_are_trimmed() {
        let author = author(&form(&[
            ("first_name", "  Jane "),
            ("family_name", "Austen"),
            ("date_of_birth", "1775-12-16"),
            ("date_of_death", ""),
        ]))
        .unwrap();

        assert_eq!(author.first_name, "Jane");
        assert_eq!(author.date_of_birth, Some(date!(1775 - 12 - 16)));
        assert_eq!(author.date_of_death, None);
    }

    #[test]
    fn empty_first_name_is_reported_without_hiding_other_fields() {
        let rejected = author(&form(&[
            ("first_name", "   "),
            ("family_name", "O'Brien"),
            ("date_of_birth", "not-a-date"),
        ]))
        .unwrap_err();

        assert!(rejected.has_error_on("first_name"));
        assert!(rejected.has_error_on("family_name"));
        assert!(rejected.has_error_on("date_of_birth"));
        assert_eq!(rejected.value("first_name"), Some(""));
        assert_eq!(rejected.value("family_name"), Some("O&#x27;Brien"));

        let messages: Vec<_> = rejected
            .errors
            .iter()
            .filter(|e| e.field == "first_name")
            .map(|e| e.message.as_str())
            .collect();
        assert!(messages.contains(&"First name must be specified and at most 100 characters."));
    }

    #[test]
    fn non_alphanumeric_names_are_rejected() {
        let rejected = author(&form(&[("first_name", "J4ne"), ("family_name", "Aus ten")]))
            .unwrap_err();
        assert!(!rejected.has_error_on("first_name"));
        assert_eq!(
            rejected.errors[0].message,
            "Family name has non-alphanumeric characters."
        );
    }

    #[test]
    fn overlong_names_are_rejected() {
        let long = "a".repeat(101);
        let rejected =
            author(&form(&[("first_name", &long), ("family_name", "Austen")])).unwrap_err();
        assert!(rejected
            .errors
            .iter()
            .any(|e| e.message == "First name must be specified and at most 100 characters."));
    }

    #[test]
    fn name_length_is_measured_after_escaping() {
        let ampersands = "&".repeat(100);
        let rejected = genre(&form(&[("name", &ampersands)])).unwrap_err();
        assert_eq!(rejected.errors.len(), 1);
        assert_eq!(rejected.errors[0].field, "name");
        assert_eq!(rejected.errors[0].value.chars().count(), 500);

        let quotes = "'".repeat(20);
        let rejected = genre(&form(&[("name", &quotes)])).unwrap_err();
        assert_eq!(
            rejected.errors[0].message,
            "Genre name must contain between 3 and 100 characters"
        );

        assert!(genre(&form(&[("name", &"a".repeat(100))])).is_ok());
        assert!(genre(&form(&[("name", &"&".repeat(20))])).is_ok());
    }

    #[test]
    fn author_name_length_is_measured_after_escaping() {
        let rejected = author(&form(&[
            ("first_name", &"<".repeat(30)),
            ("family_name", "Austen"),
        ]))
        .unwrap_err();
        let messages: Vec<_> = rejected.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages.contains(&"First name must be specified and at most 100 characters."));
        assert!(messages.contains(&"First name has non-alphanumeric characters."));
        assert_eq!(rejected.value("first_name"), Some("&lt;".repeat(30).as_str()));
    }

    #[test]
    fn genre_name_needs_three_characters() {
        assert!(genre(&form(&[("name", " ab ")])).is_err());
        assert_eq!(genre(&form(&[("name", " Sci-Fi ")])).unwrap().name, "Sci-Fi");
    }

    #[test]
    fn genre_name_is_escaped() {
        let genre = genre(&form(&[("name", "Horror & <Gore>")])).unwrap();
        assert_eq!(genre.name, "Horror &amp; &lt;Gore&gt;");
    }

    #[test]
    fn book_keeps_every_selected_genre() {
        let book = book(&form(&[
            ("title", "Emma"),
            ("author", "a1"),
            ("summary", "Matchmaking"),
            ("isbn", "9780141439587"),
            ("genre", "g1"),
            ("genre", "g2"),
            ("genre", ""),
        ]))
        .unwrap();
        assert_eq!(book.genre, vec!["g1", "g2"]);
    }

    #[test]
    fn book_requires_all_text_fields() {
        let rejected = book(&form(&[("title", "Emma")])).unwrap_err();
        let fields: Vec<_> = rejected.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["author", "summary", "isbn"]);
    }

    #[test]
    fn instance_status_must_be_known_label() {
        let ok = book_instance(&form(&[
            ("book", "b1"),
            ("imprint", "Penguin 2003"),
            ("status", "Loaned"),
            ("due_back", "2026-11-01"),
        ]))
        .unwrap();
        assert_eq!(ok.status, BookStatus::Loaned);
        assert_eq!(ok.due_back, Some(date!(2026 - 11 - 01)));

        let rejected = book_instance(&form(&[
            ("book", "b1"),
            ("imprint", "Penguin"),
            ("status", "Lost"),
        ]))
        .unwrap_err();
        assert!(rejected.has_error_on("status"));
        assert_eq!(rejected.errors.len(), 1);
        assert_eq!(
            rejected.errors[0].message,
            "Unknown status 'Lost'. Choose one of Available, Maintenance, Loaned or Reserved."
        );
        assert_eq!(rejected.value("status"), Some("Lost"));
    }

    #[test]
    fn blank_status_is_reported_once() {
        let rejected = book_instance(&form(&[("book", "b1"), ("imprint", "Penguin")])).unwrap_err();
        let messages: Vec<_> = rejected.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["Status must be specified"]);
    }

    #[test]
    fn iso_timestamps_are_accepted_as_dates() {
        assert_eq!(
            parse_iso_date("2024-02-29T10:00:00Z"),
            Some(date!(2024 - 02 - 29))
        );
        assert_eq!(parse_iso_date("2023-02-29"), None);
        assert_eq!(parse_iso_date("29/02/2024"), None);
    }

    #[test]
    fn form_data_keeps_repeated_keys() {
        let data = form(&[("genre", "a"), ("title", "t"), ("genre", "b")]);
        assert_eq!(data.get("genre"), Some("a"));
        assert_eq!(data.get_all("genre"), vec!["a", "b"]);
        assert_eq!(data.get("missing"), None);
    }
}
