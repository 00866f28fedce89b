use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

/// Path prefix every catalog URL lives under.
pub const CATALOG_PATH: &str = "/catalog";

/// A record type persisted in its own collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection the records live in
    const COLLECTION: &'static str;
    /// URL segment used for the record's pages, e.g. `author`
    const SEGMENT: &'static str;
}

/// Canonical detail URL for a record of type `T`.
pub fn url_for<T: Record>(id: &str) -> String {
    format!("{}/{}/{}", CATALOG_PATH, T::SEGMENT, id)
}

/// List URL for records of type `T`, e.g. `/catalog/authors`.
pub fn list_url<T: Record>() -> String {
    format!("{}/{}s", CATALOG_PATH, T::SEGMENT)
}

/// A record together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub id: String,
    #[serde(flatten)]
    pub record: T,
}

impl<T: Record> Stored<T> {
    pub fn url(&self) -> String {
        url_for::<T>(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub first_name: String,
    pub family_name: String,
    #[serde(default)]
    pub date_of_birth: Option<Date>,
    #[serde(default)]
    pub date_of_death: Option<Date>,
}

impl Record for Author {
    const COLLECTION: &'static str = "authors";
    const SEGMENT: &'static str = "author";
}

impl Author {
    /// Display name, `family_name, first_name`.
    pub fn name(&self) -> String {
        format!("{}, {}", self.family_name, self.first_name)
    }

    /// Difference between death and birth years; calendar days are ignored.
    pub fn lifespan(&self) -> String {
        match (self.date_of_birth, self.date_of_death) {
            (Some(born), Some(died)) => (died.year() - born.year()).to_string(),
            _ => "No information".to_string(),
        }
    }

    pub fn date_of_birth_formatted(&self) -> String {
        format_medium(self.date_of_birth)
    }

    pub fn date_of_death_formatted(&self) -> String {
        format_medium(self.date_of_death)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    /// Author id
    pub author: String,
    pub summary: String,
    pub isbn: String,
    /// Genre ids
    #[serde(default)]
    pub genre: Vec<String>,
}

impl Record for Book {
    const COLLECTION: &'static str = "books";
    const SEGMENT: &'static str = "book";
}

/// Book projection used by blocker lists and dependent listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
}

impl Record for Genre {
    const COLLECTION: &'static str = "genres";
    const SEGMENT: &'static str = "genre";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BookStatus {
    Available,
    #[default]
    Maintenance,
    Loaned,
    Reserved,
}

impl BookStatus {
    pub const LABELS: &'static [&'static str] = &["Available", "Maintenance", "Loaned", "Reserved"];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::Maintenance => "Maintenance",
            BookStatus::Loaned => "Loaned",
            BookStatus::Reserved => "Reserved",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status '{0}'. Choose one of Available, Maintenance, Loaned or Reserved.")]
pub struct UnknownStatus(pub String);

impl FromStr for BookStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(BookStatus::Available),
            "Maintenance" => Ok(BookStatus::Maintenance),
            "Loaned" => Ok(BookStatus::Loaned),
            "Reserved" => Ok(BookStatus::Reserved),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInstance {
    /// Book id
    pub book: String,
    pub imprint: String,
    #[serde(default)]
    pub status: BookStatus,
    #[serde(default)]
    pub due_back: Option<Date>,
}

impl Record for BookInstance {
    const COLLECTION: &'static str = "bookinstances";
    const SEGMENT: &'static str = "bookinstance";
}

impl BookInstance {
    pub fn due_back_formatted(&self) -> String {
        format_medium(self.due_back)
    }
}

/// Medium date such as `Jan 5, 1990`; empty when absent.
pub fn format_medium(date: Option<Date>) -> String {
    let format = format_description!("[month repr:short] [day padding:none], [year]");
    date.and_then(|d| d.format(&format).ok())
        .unwrap_or_default()
}
