//! Book repository contract and its SQLite implementation.
//!
//! Write paths take already-validated input (`NewBook`, `BookChanges`); the
//! unique ISBN index is the last line of defence and surfaces as
//! `BookError::DuplicateIsbn`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shelf_db::DbPool;
use sqlx::{QueryBuilder, Sqlite};

use super::error::{BookError, BookResult};
use super::models::{Book, BookChanges, NewBook};
use super::query::{BookPage, ListQuery, SearchFilter};

const BOOK_SELECT_SQL: &str = "SELECT id, title, author, year, isbn, created_at FROM book";

pub type SharedBookRepository = Arc<dyn BookRepository>;

/// Data access for books.
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn list(&self, query: &ListQuery) -> BookResult<BookPage>;
    async fn get(&self, id: i64) -> BookResult<Option<Book>>;
    async fn create(&self, book: &NewBook) -> BookResult<Book>;
    /// Returns `None` when no book has this id.
    async fn update(&self, id: i64, changes: BookChanges) -> BookResult<Option<Book>>;
    /// Returns `false` when no book has this id.
    async fn delete(&self, id: i64) -> BookResult<bool>;
    async fn search(&self, filter: &SearchFilter) -> BookResult<Vec<Book>>;
    /// Whether a book other than `except` already uses `isbn`.
    async fn isbn_taken(&self, isbn: &str, except: Option<i64>) -> BookResult<bool>;
    async fn count(&self) -> BookResult<i64>;
}

/// SQLite-backed book repository.
#[derive(Clone)]
pub struct SqliteBookRepository {
    pool: DbPool,
}

impl SqliteBookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn list(&self, query: &ListQuery) -> BookResult<BookPage> {
        let total = self.count().await?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(BOOK_SELECT_SQL);
        if let Some(field) = query.sort {
            builder
                .push(" ORDER BY ")
                .push(field.column())
                .push(" ")
                .push(query.order.keyword());
        }
        builder
            .push(" LIMIT ")
            .push_bind(query.limit())
            .push(" OFFSET ")
            .push_bind(query.offset());

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;

        Ok(BookPage {
            books,
            total,
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn get(&self, id: i64) -> BookResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("{BOOK_SELECT_SQL} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn create(&self, book: &NewBook) -> BookResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            "INSERT INTO book (title, author, year, isbn, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id, title, author, year, isbn, created_at",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year)
        .bind(&book.isbn)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unique_isbn_violation)?;

        tracing::debug!(book_id = created.id, "book inserted");
        Ok(created)
    }

    async fn update(&self, id: i64, changes: BookChanges) -> BookResult<Option<Book>> {
        let Some(mut book) = self.get(id).await? else {
            return Ok(None);
        };
        changes.apply(&mut book);

        sqlx::query("UPDATE book SET title = ?, author = ?, year = ?, isbn = ? WHERE id = ?")
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.year)
            .bind(&book.isbn)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unique_isbn_violation)?;

        tracing::debug!(book_id = id, "book updated");
        Ok(Some(book))
    }

    async fn delete(&self, id: i64) -> BookResult<bool> {
        let result = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, filter: &SearchFilter) -> BookResult<Vec<Book>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(BOOK_SELECT_SQL);
        builder.push(" WHERE 1 = 1");

        // SQLite LIKE is case-insensitive for ASCII.
        if let Some(title) = &filter.title {
            builder.push(" AND title LIKE ").push_bind(contains(title));
        }
        if let Some(author) = &filter.author {
            builder.push(" AND author LIKE ").push_bind(contains(author));
        }
        if let Some(year) = filter.year {
            builder.push(" AND year = ").push_bind(year);
        }
        builder.push(" ORDER BY id");

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn isbn_taken(&self, isbn: &str, except: Option<i64>) -> BookResult<bool> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM book WHERE isbn = ?")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(existing.is_some_and(|id| Some(id) != except))
    }

    async fn count(&self) -> BookResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn contains(fragment: &str) -> String {
    format!("%{fragment}%")
}

fn unique_isbn_violation(err: sqlx::Error) -> BookError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => BookError::DuplicateIsbn,
        _ => BookError::Storage(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::query::{ListParams, SortField, SortOrder};
    use crate::modules::books::{sample_books, MIGRATIONS};

    async fn repository() -> SqliteBookRepository {
        let pool = shelf_db::connect("sqlite::memory:", 1).await.unwrap();
        for migration in MIGRATIONS {
            sqlx::raw_sql(migration.up).execute(&pool).await.unwrap();
        }
        SqliteBookRepository::new(pool)
    }

    async fn seeded() -> SqliteBookRepository {
        let repo = repository().await;
        for book in sample_books() {
            repo.create(&book).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let repo = repository().await;
        let new_book = NewBook::new("T", "A").with_year(1999).with_isbn("123");

        let created = repo.create(&new_book).await.unwrap();
        let loaded = repo.get(created.id).await.unwrap().unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.title, "T");
        assert_eq!(loaded.author, "A");
        assert_eq!(loaded.year, Some(1999));
        assert_eq!(loaded.isbn.as_deref(), Some("123"));
        assert!(loaded.created_at.is_some());
    }

    #[tokio::test]
    async fn duplicate_isbn_is_rejected_by_index() {
        let repo = repository().await;
        repo.create(&NewBook::new("One", "A").with_isbn("dup"))
            .await
            .unwrap();

        let err = repo
            .create(&NewBook::new("Two", "B").with_isbn("dup"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookError::DuplicateIsbn));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn books_without_isbn_do_not_collide() {
        let repo = repository().await;
        repo.create(&NewBook::new("One", "A")).await.unwrap();
        repo.create(&NewBook::new("Two", "B")).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn list_paginates() {
        let repo = seeded().await;
        let query = ListQuery::from_params(&ListParams {
            page: Some("2".to_string()),
            per_page: Some("2".to_string()),
            ..Default::default()
        });

        let page = repo.list(&query).await.unwrap();

        assert_eq!(page.books.len(), 1);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.books[0].title, "Clean Code");
    }

    #[tokio::test]
    async fn list_past_last_page_is_empty() {
        let repo = seeded().await;
        let query = ListQuery {
            page: 9,
            ..ListQuery::default()
        };
        let page = repo.list(&query).await.unwrap();
        assert!(page.books.is_empty());
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn list_sorts_by_year_descending() {
        let repo = seeded().await;
        let query = ListQuery {
            sort: Some(SortField::Year),
            order: SortOrder::Desc,
            ..ListQuery::default()
        };

        let years: Vec<_> = repo
            .list(&query)
            .await
            .unwrap()
            .books
            .into_iter()
            .map(|book| book.year)
            .collect();
        assert_eq!(years, vec![Some(2019), Some(2018), Some(2008)]);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_conjunctive() {
        let repo = seeded().await;

        let by_title = repo
            .search(&SearchFilter {
                title: Some("python".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Python Crash Course");

        let none = repo
            .search(&SearchFilter {
                title: Some("python".to_string()),
                year: Some(2008),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());

        let all = repo.search(&SearchFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn update_applies_partial_changes() {
        let repo = seeded().await;
        let changes = BookChanges {
            author: Some("X".to_string()),
            ..Default::default()
        };

        let updated = repo.update(1, changes).await.unwrap().unwrap();
        let loaded = repo.get(1).await.unwrap().unwrap();

        assert_eq!(updated, loaded);
        assert_eq!(loaded.author, "X");
        assert_eq!(loaded.title, "Python Crash Course");
        assert_eq!(loaded.year, Some(2019));
    }

    #[tokio::test]
    async fn update_and_delete_missing_book() {
        let repo = repository().await;
        assert!(repo
            .update(42, BookChanges::default())
            .await
            .unwrap()
            .is_none());
        assert!(!repo.delete(42).await.unwrap());
    }

    #[tokio::test]
    async fn isbn_taken_ignores_the_book_itself() {
        let repo = seeded().await;
        assert!(repo.isbn_taken("978-0132350884", None).await.unwrap());
        assert!(!repo.isbn_taken("978-0132350884", Some(3)).await.unwrap());
        assert!(repo.isbn_taken("978-0132350884", Some(1)).await.unwrap());
        assert!(!repo.isbn_taken("000", None).await.unwrap());
    }
}
