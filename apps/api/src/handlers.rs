use axum::Json;
use axum::http::header::{HeaderName, LOCATION};
use axum::http::StatusCode;

pub mod channels;
pub mod group_roles;
pub mod groups;
pub mod health;
pub mod internal;

/// `201 Created` with a `Location` header pointing at the new resource.
type Created<T> = (StatusCode, [(HeaderName, String); 1], Json<T>);

fn created<T>(location: String, body: T) -> Created<T> {
    (StatusCode::CREATED, [(LOCATION, location)], Json(body))
}
