//! HTTP handlers for the Books module.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use shelf_http::AppError;

use super::error::BookError;
use super::models::{Book, CreateBook, UpdateBook};
use super::query::{ListParams, ListQuery, SearchFilter, SearchParams, DEFAULT_ORDER, DEFAULT_SORT};
use super::repository::SharedBookRepository;

type ApiResult<T> = Result<T, AppError>;

/// Build the module router; mounted under `/api/books`.
pub fn router(repository: SharedBookRepository) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/search", get(search_books))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(repository)
}

#[derive(Debug, Serialize)]
struct ListResponse {
    success: bool,
    count: usize,
    total_books: i64,
    total_pages: i64,
    current_page: u32,
    sort: String,
    order: String,
    books: Vec<Book>,
}

#[derive(Debug, Serialize)]
struct BookResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    book: Book,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    success: bool,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    success: bool,
    count: usize,
    books: Vec<Book>,
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

/// `GET /api/books`
async fn list_books(
    State(repository): State<SharedBookRepository>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListResponse>> {
    let query = ListQuery::from_params(&params);
    let page = repository.list(&query).await?;

    Ok(Json(ListResponse {
        success: true,
        count: page.books.len(),
        total_books: page.total,
        total_pages: page.total_pages(),
        current_page: page.page,
        sort: params.sort.unwrap_or_else(|| DEFAULT_SORT.to_string()),
        order: params.order.unwrap_or_else(|| DEFAULT_ORDER.to_string()),
        books: page.books,
    }))
}

/// `GET /api/books/{id}`
async fn get_book(
    State(repository): State<SharedBookRepository>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<BookResponse>> {
    let id = book_id(id)?;
    let book = repository.get(id).await?.ok_or(BookError::NotFound)?;

    Ok(Json(BookResponse {
        success: true,
        message: None,
        book,
    }))
}

/// `POST /api/books`
async fn create_book(
    State(repository): State<SharedBookRepository>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BookResponse>)> {
    let new_book = parse_body::<CreateBook>(payload)?.validate()?;

    if let Some(isbn) = new_book.isbn.as_deref() {
        if repository.isbn_taken(isbn, None).await? {
            return Err(BookError::DuplicateIsbn.into());
        }
    }

    let book = repository.create(&new_book).await?;
    tracing::info!(book_id = book.id, "book created");

    Ok((
        StatusCode::CREATED,
        Json(BookResponse {
            success: true,
            message: Some("Book created successfully"),
            book,
        }),
    ))
}

/// `PUT /api/books/{id}`
async fn update_book(
    State(repository): State<SharedBookRepository>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<Json<BookResponse>> {
    let id = book_id(id)?;
    if repository.get(id).await?.is_none() {
        return Err(BookError::NotFound.into());
    }

    let changes = parse_body::<UpdateBook>(payload)?.validate()?;
    if let Some(isbn) = changes.new_isbn() {
        if repository.isbn_taken(isbn, Some(id)).await? {
            return Err(BookError::DuplicateIsbn.into());
        }
    }

    let book = repository
        .update(id, changes)
        .await?
        .ok_or(BookError::NotFound)?;
    tracing::info!(book_id = book.id, "book updated");

    Ok(Json(BookResponse {
        success: true,
        message: Some("Book updated successfully"),
        book,
    }))
}

/// `DELETE /api/books/{id}`
async fn delete_book(
    State(repository): State<SharedBookRepository>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let id = book_id(id)?;
    if !repository.delete(id).await? {
        return Err(BookError::NotFound.into());
    }
    tracing::info!(book_id = id, "book deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "Book deleted successfully",
    }))
}

/// `GET /api/books/search`
async fn search_books(
    State(repository): State<SharedBookRepository>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let filter = SearchFilter::from_params(params)?;
    let books = repository.search(&filter).await?;

    Ok(Json(SearchResponse {
        success: true,
        count: books.len(),
        books,
    }))
}

/// Ids that are not integers cannot name a book.
fn book_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, BookError> {
    id.map(|Path(id)| id).map_err(|_| BookError::NotFound)
}

/// Missing, unparseable or empty bodies are all "no data"; a body with
/// mistyped fields is rejected with the decoder's message.
fn parse_body<T: DeserializeOwned>(
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<T, BookError> {
    let Ok(Json(value)) = payload else {
        return Err(BookError::NoData);
    };
    match &value {
        serde_json::Value::Object(fields) if !fields.is_empty() => {}
        _ => return Err(BookError::NoData),
    }
    serde_json::from_value(value).map_err(|err| BookError::InvalidPayload(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: serde_json::Value) -> Result<Json<serde_json::Value>, JsonRejection> {
        Ok(Json(value))
    }

    #[test]
    fn empty_object_is_no_data() {
        let result = parse_body::<CreateBook>(body(serde_json::json!({})));
        assert!(matches!(result, Err(BookError::NoData)));

        let result = parse_body::<CreateBook>(body(serde_json::json!([1, 2])));
        assert!(matches!(result, Err(BookError::NoData)));
    }

    #[test]
    fn mistyped_field_is_invalid_payload() {
        let result = parse_body::<CreateBook>(body(serde_json::json!({"title": 5})));
        assert!(matches!(result, Err(BookError::InvalidPayload(_))));
    }
}
