//! Static pages served outside the `/api` namespace.

use axum::{response::Html, routing::get, Router};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Root router with the book inventory page at `/`.
pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
