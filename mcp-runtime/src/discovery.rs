use fmtools_core::{Error, Result, ScriptOutcome, ToolDescriptor};
use serde_json::Value;

use crate::invoker::ScriptInvoker;

/// Run the discovery script and parse its `tools` list.
///
/// The script must answer with a JSON object. A missing `tools` key means
/// no tools; anything else that does not fit is a discovery error.
pub async fn fetch_tools(invoker: &dyn ScriptInvoker, script: &str) -> Result<Vec<ToolDescriptor>> {
    let outcome = invoker
        .invoke(script, None)
        .await
        .map_err(|e| Error::discovery(format!("'{script}' could not be run: {e}")))?;

    let value = match outcome {
        ScriptOutcome::Structured(value) => value,
        ScriptOutcome::Raw(text) => {
            return Err(Error::discovery(format!(
                "'{script}' returned text instead of JSON: {}",
                preview(&text)
            )));
        }
    };

    let Value::Object(object) = value else {
        return Err(Error::discovery(format!(
            "'{script}' must return a JSON object, got {}",
            kind(&value)
        )));
    };

    let tools = match object.get("tools") {
        None | Some(Value::Null) => {
            tracing::warn!(script, "discovery result has no 'tools' key");
            return Ok(Vec::new());
        }
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(Error::discovery(format!(
                "'tools' must be an array, got {}",
                kind(other)
            )));
        }
    };

    let descriptors: Vec<ToolDescriptor> = tools.iter().map(ToolDescriptor::from_value).collect();
    let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    tracing::info!(script, count = descriptors.len(), names = ?names, "discovered tools");
    Ok(descriptors)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    match text.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Map, json};
    use std::sync::{Arc, Mutex};

    use crate::synth::ToolSynthesizer;

    /// Replies with canned outcomes per script name and records every call.
    #[derive(Default)]
    pub(crate) struct FakeInvoker {
        replies: Vec<(String, Result<ScriptOutcome>)>,
        pub(crate) calls: Mutex<Vec<(String, Option<Map<String, Value>>)>>,
    }

    impl FakeInvoker {
        pub(crate) fn reply(mut self, script: &str, outcome: Result<ScriptOutcome>) -> Self {
            self.replies.push((script.to_string(), outcome));
            self
        }

        pub(crate) fn recorded(&self) -> Vec<(String, Option<Map<String, Value>>)> {
            self.calls
                .lock()
                .expect("call log lock should not be poisoned")
                .clone()
        }
    }

    #[async_trait]
    impl ScriptInvoker for FakeInvoker {
        async fn invoke(
            &self,
            script: &str,
            params: Option<&Map<String, Value>>,
        ) -> Result<ScriptOutcome> {
            self.calls
                .lock()
                .expect("call log lock should not be poisoned")
                .push((script.to_string(), params.cloned()));
            match self.replies.iter().find(|(name, _)| name == script) {
                Some((_, Ok(outcome))) => Ok(outcome.clone()),
                Some((_, Err(e))) => Err(Error::Invocation {
                    script: script.to_string(),
                    status: Some(500),
                    body: e.to_string(),
                }),
                None => Ok(ScriptOutcome::Structured(json!({ "echo": script }))),
            }
        }
    }

    fn tool_list(value: Value) -> FakeInvoker {
        FakeInvoker::default().reply("GetToolList", Ok(ScriptOutcome::Structured(value)))
    }

    #[tokio::test]
    async fn parses_the_tools_array() {
        let invoker = tool_list(json!({
            "tools": [{
                "type": "function",
                "function": { "name": "Ping", "description": "health check", "parameters": {} }
            }]
        }));
        let tools = fetch_tools(&invoker, "GetToolList")
            .await
            .expect("discovery should succeed");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "Ping");
        assert_eq!(tools[0].description, "health check");
        assert!(tools[0].parameters.properties.is_empty());
        assert_eq!(invoker.recorded(), vec![("GetToolList".to_string(), None)]);
    }

    #[tokio::test]
    async fn zero_parameter_tool_becomes_a_zero_argument_callable() {
        let invoker = Arc::new(tool_list(json!({
            "tools": [{
                "function": {
                    "name": "Ping",
                    "parameters": { "properties": {}, "required": [] }
                }
            }]
        })));
        let descriptors = fetch_tools(invoker.as_ref(), "GetToolList")
            .await
            .expect("discovery should succeed");
        assert_eq!(descriptors.len(), 1);

        let tool = ToolSynthesizer::new(invoker.clone()).synthesize(&descriptors[0]);
        assert_eq!(tool.name(), "Ping");
        assert!(tool.slots().is_empty());
        assert_eq!(tool.input_schema()["required"], json!([]));
    }

    #[tokio::test]
    async fn missing_tools_key_is_empty() {
        let invoker = tool_list(json!({ "version": 2 }));
        assert!(fetch_tools(&invoker, "GetToolList").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn text_result_is_a_discovery_error() {
        let invoker = FakeInvoker::default().reply(
            "GetToolList",
            Ok(ScriptOutcome::Raw("Script not found".into())),
        );
        let err = fetch_tools(&invoker, "GetToolList").await.unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
        assert!(err.to_string().contains("Script not found"));
    }

    #[tokio::test]
    async fn wrong_shapes_are_discovery_errors() {
        for value in [json!([1, 2]), json!({ "tools": "Ping" }), json!(7)] {
            let invoker = tool_list(value);
            assert!(matches!(
                fetch_tools(&invoker, "GetToolList").await,
                Err(Error::Discovery(_))
            ));
        }
    }

    #[tokio::test]
    async fn invocation_failure_becomes_discovery_error() {
        let invoker = FakeInvoker::default().reply("GetToolList", Err(Error::discovery("down")));
        assert!(matches!(
            fetch_tools(&invoker, "GetToolList").await,
            Err(Error::Discovery(_))
        ));
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(200);
        assert_eq!(preview(&long).len(), 83);
        assert_eq!(preview("short"), "short");
    }
}
