//! Panic recovery.
//!
//! A panic anywhere inside the chain is turned into a 500 response; the
//! connection task and the listener keep running.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::lifecycle::hooks::panic_message;
use crate::observability::metrics;

pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic_message(payload.as_ref());
    tracing::error!(panic = %message, "Request handler panicked");
    metrics::record_panic();

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_payload_yields_500() {
        let res = handle_panic(Box::new(String::from("boom")));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
