//! The `{ "ok": true, ... }` response envelope every endpoint returns on
//! success (spec.md §6.1); failures go through [`crate::error::AppError`]'s
//! own `IntoResponse` impl instead.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Wraps a successful handler result for serialization. Named `Envelope`
/// rather than `Ok` so it never shadows `Result::Ok` at a handler's
/// return site.
pub struct Envelope<T>(pub T);

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let mut body = json!({ "ok": true });
        if let Value::Object(ref mut map) = body {
            match serde_json::to_value(self.0) {
                Ok(Value::Object(fields)) => map.extend(fields),
                Ok(value) => {
                    map.insert("data".to_string(), value);
                }
                Err(_) => {}
            }
        }
        Json(body).into_response()
    }
}
