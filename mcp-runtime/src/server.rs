use std::sync::Arc;
use std::time::Instant;

use fmtools_core::{Error, ScriptOutcome};
use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncRead, AsyncWrite, BufReader};
use tracing::Instrument;
use uuid::Uuid;

use crate::framing::{read_frame, write_frame};
use crate::registry::ToolRegistry;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "fmtools-mcp";

const INSTRUCTIONS: &str = "Each tool runs the FileMaker script of the same name. \
Arguments are sent to the script as a JSON object; results come back as JSON when \
the script returns JSON and as plain text otherwise.";

/// JSON-RPC 2.0 MCP server over a byte stream, exposing every registered
/// tool.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    session_id: String,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            session_id: format!("stdio-{}", Uuid::now_v7()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Serve on stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> Result<(), String> {
        self.serve(io::stdin(), io::stdout()).await
    }

    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<(), String>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let span = tracing::info_span!("mcp", session = %self.session_id);
        self.serve_loop(reader, writer).instrument(span).await
    }

    async fn serve_loop<R, W>(&self, reader: R, mut writer: W) -> Result<(), String>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(tools = self.registry.len(), "MCP server listening");
        let mut reader = BufReader::new(reader);

        loop {
            let frame = read_frame(&mut reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some(frame) = frame else {
                break;
            };

            let response = match frame.payload {
                Ok(incoming) => self.handle_incoming_message(incoming).await,
                Err(message) => Some(error_response(Value::Null, RpcError::parse_error(message))),
            };
            if let Some(response) = response {
                write_frame(&mut writer, &response, frame.framing)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }

        tracing::info!("MCP input closed");
        Ok(())
    }

    /// Handle one decoded message or batch. Returns `None` when nothing
    /// needs to be sent back (notifications only).
    pub async fn handle_incoming_message(&self, incoming: Value) -> Option<Value> {
        let batch = match incoming {
            Value::Array(batch) => batch,
            single => return self.handle_single_message(single).await,
        };

        if batch.is_empty() {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Batch request must not be empty"),
            ));
        }
        let mut responses = Vec::new();
        for item in batch {
            if let Some(response) = self.handle_single_message(item).await {
                responses.push(response);
            }
        }
        (!responses.is_empty()).then_some(Value::Array(responses))
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A client response; this server never sends requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        match obj.get("id").cloned() {
            Some(id) => Some(match self.handle_request(method, params).await {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            }),
            None => {
                tracing::debug!(method, "notification");
                None
            }
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": INSTRUCTIONS
        })
    }

    fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .tools()
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| RpcError::invalid_params(format!("Unknown tool: {name}")))?;

        let started = Instant::now();
        let result = tool.call(&args).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(match result {
            Ok(outcome) => {
                tracing::info!(tool = name, elapsed_ms, "tool call succeeded");
                build_tool_call_response(&outcome)
            }
            Err(err) => {
                tracing::warn!(tool = name, elapsed_ms, error = %err, "tool call failed");
                build_tool_error_response(&err)
            }
        })
    }
}

fn build_tool_call_response(outcome: &ScriptOutcome) -> Value {
    let mut response = json!({
        "content": [{ "type": "text", "text": outcome.render() }],
        "isError": false
    });
    if let Some(value) = outcome.as_structured().filter(|v| v.is_object()) {
        response["structuredContent"] = value.clone();
    }
    response
}

fn build_tool_error_response(err: &Error) -> Value {
    let payload = serde_json::to_value(err.to_payload()).unwrap_or_else(|_| json!({}));
    json!({
        "isError": true,
        "content": [{ "type": "text", "text": to_pretty_json(&payload) }],
        "structuredContent": payload
    })
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: Some(json!({ "method": method })),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
