use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::error::{BookError, BookResult};

/// A persisted book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// Storage-assigned identifier
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Publication year
    pub year: Option<i64>,
    /// Unique across all books when present
    pub isbn: Option<String>,
    /// Set once at creation, serialized as RFC 3339
    pub created_at: Option<DateTime<Utc>>,
}

/// A validated book ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub year: Option<i64>,
    pub isbn: Option<String>,
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            year: None,
            isbn: None,
        }
    }

    pub fn with_year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = normalize_isbn(Some(isbn.into()));
        self
    }
}

/// Request model for creating a new book.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBook {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub isbn: Option<String>,
}

impl CreateBook {
    /// Check required fields and normalize the optional ones.
    pub fn validate(self) -> BookResult<NewBook> {
        let (Some(title), Some(author)) = (non_blank(self.title), non_blank(self.author)) else {
            return Err(BookError::MissingTitleOrAuthor);
        };

        Ok(NewBook {
            title,
            author,
            year: self.year,
            isbn: normalize_isbn(self.isbn),
        })
    }
}

/// Request model for a partial update.
///
/// The outer `Option` tracks whether a key was present in the body; the inner
/// one carries an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBook {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub year: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub isbn: Option<Option<String>>,
}

impl UpdateBook {
    /// Check that supplied fields keep the book valid.
    pub fn validate(self) -> BookResult<BookChanges> {
        let title = match self.title {
            None => None,
            Some(value) => Some(non_blank(value).ok_or(BookError::MissingTitleOrAuthor)?),
        };
        let author = match self.author {
            None => None,
            Some(value) => Some(non_blank(value).ok_or(BookError::MissingTitleOrAuthor)?),
        };

        Ok(BookChanges {
            title,
            author,
            year: self.year,
            isbn: self.isbn.map(normalize_isbn),
        })
    }
}

/// Validated field changes; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<Option<i64>>,
    pub isbn: Option<Option<String>>,
}

impl BookChanges {
    /// The ISBN this change assigns, if any.
    pub fn new_isbn(&self) -> Option<&str> {
        self.isbn.as_ref().and_then(|isbn| isbn.as_deref())
    }

    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(year) = self.year {
            book.year = year;
        }
        if let Some(isbn) = self.isbn {
            book.isbn = isbn;
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Blank ISBNs mean "no ISBN"; they must not collide on the unique index.
fn normalize_isbn(isbn: Option<String>) -> Option<String> {
    non_blank(isbn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book {
            id: 1,
            title: "Clean Code".to_string(),
            author: "Robert C. Martin".to_string(),
            year: Some(2008),
            isbn: Some("978-0132350884".to_string()),
            created_at: None,
        }
    }

    #[test]
    fn create_requires_title_and_author() {
        let missing_author = CreateBook {
            title: Some("T".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            missing_author.validate(),
            Err(BookError::MissingTitleOrAuthor)
        ));

        let empty_title = CreateBook {
            title: Some(String::new()),
            author: Some("A".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            empty_title.validate(),
            Err(BookError::MissingTitleOrAuthor)
        ));
    }

    #[test]
    fn create_drops_blank_isbn() {
        let request: CreateBook =
            serde_json::from_str(r#"{"title": "T", "author": "A", "isbn": ""}"#).unwrap();
        let book = request.validate().unwrap();
        assert_eq!(book, NewBook::new("T", "A"));
    }

    #[test]
    fn update_distinguishes_absent_from_null() {
        let request: UpdateBook = serde_json::from_str(r#"{"year": null}"#).unwrap();
        let changes = request.validate().unwrap();
        assert_eq!(changes.year, Some(None));
        assert_eq!(changes.isbn, None);
        assert_eq!(changes.title, None);
    }

    #[test]
    fn update_rejects_empty_author() {
        let request: UpdateBook = serde_json::from_str(r#"{"author": ""}"#).unwrap();
        assert!(matches!(
            request.validate(),
            Err(BookError::MissingTitleOrAuthor)
        ));
    }

    #[test]
    fn apply_only_touches_supplied_fields() {
        let mut stored = book();
        let request: UpdateBook = serde_json::from_str(r#"{"author": "X"}"#).unwrap();
        request.validate().unwrap().apply(&mut stored);

        assert_eq!(stored.author, "X");
        assert_eq!(stored.title, "Clean Code");
        assert_eq!(stored.year, Some(2008));
        assert_eq!(stored.isbn.as_deref(), Some("978-0132350884"));
    }

    #[test]
    fn serializes_missing_timestamp_as_null() {
        let value = serde_json::to_value(book()).unwrap();
        assert_eq!(value["created_at"], serde_json::Value::Null);
        assert_eq!(value["year"], 2008);
    }
}
