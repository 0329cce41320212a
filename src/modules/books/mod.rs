pub mod error;
pub mod models;
pub mod query;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use shelf_db::DbPool;
use shelf_kernel::{InitCtx, Migration, Module};

use models::NewBook;
use repository::{SharedBookRepository, SqliteBookRepository};

pub(crate) const MIGRATIONS: &[Migration] = &[Migration {
    id: "001_init",
    up: r#"
        CREATE TABLE IF NOT EXISTS book (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            title      TEXT NOT NULL CHECK (title <> ''),
            author     TEXT NOT NULL CHECK (author <> ''),
            year       INTEGER,
            isbn       TEXT,
            created_at TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS book_isbn_unique ON book (isbn);
        "#,
}];

/// Books shipped with a fresh database.
pub fn sample_books() -> Vec<NewBook> {
    vec![
        NewBook::new("Python Crash Course", "Eric Matthes")
            .with_year(2019)
            .with_isbn("978-1593279288"),
        NewBook::new("Flask Web Development", "Miguel Grinberg")
            .with_year(2018)
            .with_isbn("978-1491991732"),
        NewBook::new("Clean Code", "Robert C. Martin")
            .with_year(2008)
            .with_isbn("978-0132350884"),
    ]
}

/// Books module: CRUD, search and pagination over the `book` table
pub struct BooksModule {
    repository: SharedBookRepository,
}

impl BooksModule {
    pub fn new(repository: SharedBookRepository) -> Self {
        Self { repository }
    }

    /// Insert the sample books when the table is empty. Returns how many
    /// were inserted.
    pub async fn seed_if_empty(&self) -> anyhow::Result<usize> {
        if self.repository.count().await? > 0 {
            return Ok(0);
        }

        let books = sample_books();
        for book in &books {
            self.repository.create(book).await?;
        }
        tracing::info!(module = self.name(), count = books.len(), "sample books added");
        Ok(books.len())
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.repository.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        MIGRATIONS.to_vec()
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.settings.database.seed {
            self.seed_if_empty().await?;
        }
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": { "schema": schema }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book_ref = serde_json::json!({ "$ref": "#/components/schemas/Book" });
    let book_envelope = serde_json::json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "message": { "type": "string" },
            "book": book_ref
        },
        "required": ["success", "book"]
    });
    let book_list = serde_json::json!({
        "type": "array",
        "items": book_ref
    });
    let id_param = serde_json::json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer" }
    });
    let query_param = |name: &str, kind: &str, description: &str| {
        serde_json::json!({
            "name": name,
            "in": "query",
            "required": false,
            "description": description,
            "schema": { "type": kind }
        })
    };
    let book_body = |schema: &str| {
        serde_json::json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": format!("#/components/schemas/{schema}") }
                }
            }
        })
    };

    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        query_param("sort", "string", "Field to sort by (default id)"),
                        query_param("order", "string", "asc or desc (default asc)"),
                        query_param("page", "integer", "Page number (default 1)"),
                        query_param("per_page", "integer", "Page size (default 10)")
                    ],
                    "responses": {
                        "200": json_response("One page of books", serde_json::json!({
                            "type": "object",
                            "properties": {
                                "success": { "type": "boolean" },
                                "count": { "type": "integer" },
                                "total_books": { "type": "integer" },
                                "total_pages": { "type": "integer" },
                                "current_page": { "type": "integer" },
                                "sort": { "type": "string" },
                                "order": { "type": "string" },
                                "books": book_list
                            }
                        }))
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": book_body("CreateBook"),
                    "responses": {
                        "201": json_response("Book created", book_envelope.clone()),
                        "400": error_response("Invalid payload or duplicate ISBN")
                    }
                }
            },
            "/search": {
                "get": {
                    "summary": "Search books",
                    "tags": ["Books"],
                    "parameters": [
                        query_param("q", "string", "Partial title match"),
                        query_param("author", "string", "Partial author match"),
                        query_param("year", "integer", "Exact publication year")
                    ],
                    "responses": {
                        "200": json_response("Matching books", serde_json::json!({
                            "type": "object",
                            "properties": {
                                "success": { "type": "boolean" },
                                "count": { "type": "integer" },
                                "books": book_list
                            }
                        })),
                        "400": error_response("Year is not an integer")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": json_response("The book", book_envelope.clone()),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Update a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "requestBody": book_body("UpdateBook"),
                    "responses": {
                        "200": json_response("Book updated", book_envelope.clone()),
                        "400": error_response("Invalid payload or duplicate ISBN"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": json_response("Book deleted", serde_json::json!({
                            "type": "object",
                            "properties": {
                                "success": { "type": "boolean" },
                                "message": { "type": "string" }
                            }
                        })),
                        "404": error_response("Book not found")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "text/plain": { "schema": { "type": "string" } }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "year": { "type": ["integer", "null"] },
                        "isbn": { "type": ["string", "null"] },
                        "created_at": { "type": ["string", "null"], "format": "date-time" }
                    },
                    "required": ["id", "title", "author"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "year": { "type": "integer" },
                        "isbn": { "type": "string" }
                    },
                    "required": ["title", "author"]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "year": { "type": ["integer", "null"] },
                        "isbn": { "type": ["string", "null"] }
                    }
                }
            }
        }
    })
}

/// Create a new instance of the books module backed by `db`
pub fn create_module(db: DbPool) -> Arc<BooksModule> {
    Arc::new(BooksModule::new(Arc::new(SqliteBookRepository::new(db))))
}
