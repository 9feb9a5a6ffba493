use std::collections::HashMap;
use std::time::Instant;

use axum::Form;
use axum::extract::{Path, State};
use axum::response::Html;
use axum::{Router, routing::get};

use crate::error::UiError;
use crate::form;
use crate::render::{self, ResultView};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/tools/{name}", get(show_tool).post(run_tool))
}

/// First tool's tab, or a notice when nothing is registered.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    match state.registry.tools().first() {
        Some(tool) => Html(render::tool_page(
            &state.registry,
            tool,
            &HashMap::new(),
            None,
        )),
        None => Html(render::empty_page()),
    }
}

pub async fn show_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Html<String>, UiError> {
    let tool = state.tool(&name)?;
    Ok(Html(render::tool_page(
        &state.registry,
        &tool,
        &HashMap::new(),
        None,
    )))
}

/// Run the tool with the submitted form and show the same tab with its
/// result. Parse, argument and remote failures all end up in the result
/// area.
pub async fn run_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Html<String>, UiError> {
    let tool = state.tool(&name)?;
    let started = Instant::now();

    let result = match form::gather(&tool, &fields) {
        Ok(values) => match tool.call_positional(values).await {
            Ok(outcome) => ResultView::success(outcome.render()),
            Err(err) => ResultView::failure(err.to_string()),
        },
        Err(message) => ResultView::failure(message),
    };
    tracing::info!(
        tool = %name,
        ok = !result.is_error,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "form run finished"
    );

    Ok(Html(render::tool_page(
        &state.registry,
        &tool,
        &fields,
        Some(&result),
    )))
}
