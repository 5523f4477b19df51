//! Liveness check.
//!
//! `GET /health` answers 200 with the literal body `OK` labelled
//! `application/json`. The body is intentionally not JSON-encoded; existing
//! health checkers depend on the exact bytes.

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use crate::http::routes::Route;

pub const HEALTH_PATH: &str = "/health";

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        "OK",
    )
}

pub(crate) fn route() -> Route {
    Route::get(HEALTH_PATH, health_check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn literal_ok_with_json_content_type() {
        let res = health_check().await.into_response();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(to_bytes(res.into_body(), 64).await.unwrap(), "OK");
    }
}
