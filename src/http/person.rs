//! `POST /person` sample endpoint.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::http::routes::Route;

pub const PERSON_PATH: &str = "/person";

#[derive(Debug, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub age: i64,
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

/// Echo the submitted age. The name is required and must not be blank.
pub async fn create_person(payload: Result<Json<Person>, JsonRejection>) -> Response {
    let Json(person) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected person payload");
            return bad_request(rejection.body_text());
        }
    };

    if person.name.trim().is_empty() {
        return bad_request("name is required");
    }

    Json(json!({ "age": person.age })).into_response()
}

pub fn route() -> Route {
    Route::post(PERSON_PATH, create_person)
}
