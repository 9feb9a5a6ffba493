use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::{Json, Router, routing::post};
use serde_json::{Map, Value, json};

use crate::error::ApiFailure;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/tools/{name}", post(call_tool))
}

/// Call a tool with a JSON object of named arguments.
pub async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let tool = state
        .registry
        .get(&name)
        .ok_or_else(|| ApiFailure::unknown_tool(&name))?;

    let arguments = match body {
        Ok(Json(Value::Object(map))) => map,
        Ok(Json(Value::Null)) => Map::new(),
        Ok(Json(_)) => return Err(ApiFailure::bad_body("body must be a JSON object")),
        Err(rejection) => return Err(ApiFailure::bad_body(rejection.body_text())),
    };

    let outcome = tool.call(&arguments).await?;
    Ok(Json(json!({ "ok": true, "result": outcome.into_value() })))
}
