//! Response coercion: turning whatever a handler returned into a
//! [`Response`].

use rivet_core::{Response, Value};
use serde_json::{Map, Number, Value as Json};

/// Content type attached to list and map bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Coerce a dispatch result into a response.
///
/// - a `Response` passes through unchanged
/// - `Null` and `false` produce an empty body
/// - other scalars produce their text
/// - lists and maps are encoded as JSON
/// - objects produce an empty body
pub fn into_response(value: Value) -> Response {
    match value {
        Value::Response(response) => response,
        Value::Null | Value::Bool(false) => Response::new(""),
        Value::Object(object) => {
            tracing::debug!(
                object = %object.type_ref(),
                "handler returned an object, body left empty"
            );
            Response::new("")
        }
        list @ Value::List(_) | list @ Value::Map(_) => {
            Response::new(to_json(list).to_string()).with_header("content-type", JSON_CONTENT_TYPE)
        }
        scalar => Response::new(scalar.scalar_text().unwrap_or_default()),
    }
}

fn to_json(value: Value) -> Json {
    match value {
        Value::Null | Value::Object(_) => Json::Null,
        Value::Bool(b) => Json::Bool(b),
        Value::Int(i) => Json::Number(i.into()),
        Value::Float(f) => Number::from_f64(f).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s),
        Value::List(items) => Json::Array(items.into_iter().map(to_json).collect()),
        Value::Map(map) => Json::Object(
            map.into_iter()
                .map(|(k, v)| (k, to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Response(response) => Json::String(response.body().to_string()),
    }
}
