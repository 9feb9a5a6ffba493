//! Browser form UI: one tab per registered tool.

mod error;
pub mod form;
mod middleware;
pub mod render;
mod routes;
mod state;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use fmtools_mcp_runtime::ToolRegistry;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub use error::{ApiFailure, UiError};
pub use routes::health::HealthResponse;
pub use state::AppState;

pub const DEFAULT_UI_ADDR: &str = "127.0.0.1:7860";

pub fn router(registry: Arc<ToolRegistry>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::tools::router())
        .merge(routes::api::router())
        .layer(axum::middleware::from_fn(middleware::security_headers::apply))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(AppState::new(registry))
}

/// Bind the UI address. Separate from [`serve`] so a busy port is reported
/// before the protocol server starts.
pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Form UI listening on http://{}", listener.local_addr()?);
    Ok(listener)
}

/// Serve the UI on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    registry: Arc<ToolRegistry>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Form UI stopped");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeInvoker, registry};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<FakeInvoker>) {
        let invoker = Arc::new(FakeInvoker::default());
        (router(Arc::new(registry(invoker.clone()))), invoker)
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request should build")
    }

    fn post_form(uri: &str, form: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .expect("request should build")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    #[tokio::test]
    async fn index_shows_every_tool_with_the_first_selected() {
        let (app, _) = app();
        let response = app.oneshot(get("/")).await.expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("x-frame-options")
                .expect("x-frame-options header should exist"),
            "DENY"
        );

        let page = body_text(response).await;
        assert!(page.contains(r#"<a class="tab active" href="/tools/Ping">Ping</a>"#));
        assert!(page.contains(r#"href="/tools/FindInvoice""#));
        assert!(page.contains(r#"href="/tools/Archive%20Invoice""#));
        assert!(page.contains("Run Ping"));
    }

    #[tokio::test]
    async fn tool_names_with_spaces_resolve() {
        let (app, _) = app();
        let response = app
            .oneshot(get("/tools/Archive%20Invoice"))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Run Archive Invoice"));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_404_page() {
        let (app, _) = app();
        let response = app.oneshot(get("/tools/Nope")).await.expect("request should succeed");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn submitting_a_form_runs_the_tool_with_only_filled_fields() {
        let (app, invoker) = app();
        let response = app
            .oneshot(post_form("/tools/FindInvoice", "id=5&note="))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains(r#"<pre class="result">"#));
        assert!(page.contains("received"));

        let calls = invoker.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "FindInvoice");
        assert_eq!(
            Value::Object(calls[0].1.clone()),
            json!({ "id": 5, "archived": false })
        );
    }

    #[tokio::test]
    async fn missing_required_field_is_shown_not_sent() {
        let (app, invoker) = app();
        let response = app
            .oneshot(post_form("/tools/FindInvoice", "note=hello"))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains(r#"<pre class="result error">"#));
        assert!(page.contains("missing required argument: id"));
        assert!(page.contains(r#"name="note" value="hello""#));
        assert!(invoker.recorded().is_empty());
    }

    #[tokio::test]
    async fn remote_failures_are_shown_as_result_text() {
        let (app, _) = app();
        let response = app.oneshot(post_form("/tools/Explode", "")).await.expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("script &#x27;Explode&#x27; failed with status 500: boom"));
    }

    #[tokio::test]
    async fn text_results_are_shown_verbatim() {
        let (app, _) = app();
        let response = app.oneshot(post_form("/tools/Ping", "")).await.expect("request should succeed");
        assert!(body_text(response).await.contains(r#"<pre class="result">pong</pre>"#));
    }

    #[tokio::test]
    async fn json_api_calls_tools_by_name() {
        let (app, invoker) = app();
        let response = app
            .oneshot(post_json("/api/tools/FindInvoice", json!({ "id": 9 })))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).expect("body should be JSON");
        assert_eq!(body["ok"], true);
        assert_eq!(body["result"]["received"], json!({ "id": 9 }));
        assert_eq!(invoker.recorded().len(), 1);
    }

    #[tokio::test]
    async fn json_api_reports_failures_with_status_and_payload() {
        let (app, _) = app();
        let response = app
            .clone()
            .oneshot(post_json("/api/tools/FindInvoice", json!({})))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_str(&body_text(response).await).expect("body should be JSON");
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["error"], "invalid_arguments");

        let response = app
            .clone()
            .oneshot(post_json("/api/tools/Explode", json!({})))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = app
            .clone()
            .oneshot(post_json("/api/tools/Nope", json!({})))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(post_json("/api/tools/Ping", json!([1])))
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_tool_count() {
        let (app, _) = app();
        let response = app.oneshot(get("/health")).await.expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).expect("body should be JSON");
        assert_eq!(body["status"], "ok");
        assert_eq!(body["tools"], 4);
    }

    #[tokio::test]
    async fn empty_registry_shows_a_notice() {
        let app = router(Arc::new(ToolRegistry::new()));
        let response = app.oneshot(get("/")).await.expect("request should succeed");
        assert!(body_text(response).await.contains("No tools are registered"));
    }
}
