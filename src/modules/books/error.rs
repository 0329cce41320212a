use shelf_http::AppError;
use thiserror::Error;

pub type BookResult<T> = Result<T, BookError>;

/// Failures raised by the books module.
#[derive(Debug, Error)]
pub enum BookError {
    #[error("No data provided")]
    NoData,

    #[error("Invalid book payload: {0}")]
    InvalidPayload(String),

    #[error("Title and author are required")]
    MissingTitleOrAuthor,

    #[error("ISBN already exists")]
    DuplicateIsbn,

    #[error("Year must be an integer")]
    InvalidYear,

    #[error("Book not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        let message = err.to_string();
        match err {
            BookError::NotFound => AppError::not_found(message),
            BookError::Storage(source) => {
                AppError::Internal(anyhow::Error::new(source).context("book storage failure"))
            }
            _ => AppError::validation(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn maps_to_http_statuses() {
        assert_eq!(
            AppError::from(BookError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(BookError::DuplicateIsbn).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(BookError::Storage(sqlx::Error::PoolClosed)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_match_api_contract() {
        assert_eq!(BookError::NoData.to_string(), "No data provided");
        assert_eq!(
            BookError::MissingTitleOrAuthor.to_string(),
            "Title and author are required"
        );
        assert_eq!(BookError::DuplicateIsbn.to_string(), "ISBN already exists");
    }
}
