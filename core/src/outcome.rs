use std::fmt;

use serde_json::Value;

/// Decoded result of a script call.
///
/// Scripts may answer with a JSON payload or with plain text. Both are
/// valid results and callers match on the variant instead of guessing.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    /// The result was JSON (or the remote returned no embedded result and
    /// this is the response envelope itself).
    Structured(Value),
    /// The embedded result was not JSON; kept byte-for-byte.
    Raw(String),
}

impl ScriptOutcome {
    /// Decode an embedded `scriptResult` string: JSON when it parses,
    /// otherwise the original text unchanged.
    pub fn decode(script_result: &str) -> Self {
        match serde_json::from_str::<Value>(script_result) {
            Ok(value) => ScriptOutcome::Structured(value),
            Err(_) => ScriptOutcome::Raw(script_result.to_string()),
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            ScriptOutcome::Structured(value) => Some(value),
            ScriptOutcome::Raw(_) => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ScriptOutcome::Structured(value) => value,
            ScriptOutcome::Raw(text) => Value::String(text),
        }
    }

    /// Text shown to humans and sent as MCP text content.
    pub fn render(&self) -> String {
        match self {
            ScriptOutcome::Structured(Value::String(text)) => text.clone(),
            ScriptOutcome::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ScriptOutcome::Raw(text) => text.clone(),
        }
    }
}

impl fmt::Display for ScriptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_result_decodes_to_structured_value() {
        let outcome = ScriptOutcome::decode(r#"{"status":"ok","rows":[1,2]}"#);
        assert_eq!(
            outcome,
            ScriptOutcome::Structured(json!({ "status": "ok", "rows": [1, 2] }))
        );
    }

    #[test]
    fn plain_text_result_is_kept_unchanged() {
        let text = "Invoice 42 archived.\n";
        assert_eq!(
            ScriptOutcome::decode(text),
            ScriptOutcome::Raw(text.to_string())
        );
        assert_eq!(ScriptOutcome::decode("").render(), "");
    }

    #[test]
    fn json_scalars_are_structured() {
        assert_eq!(ScriptOutcome::decode("17"), ScriptOutcome::Structured(json!(17)));
        assert_eq!(
            ScriptOutcome::decode("\"quoted\""),
            ScriptOutcome::Structured(json!("quoted"))
        );
    }

    #[test]
    fn render_prefers_plain_text_for_strings() {
        assert_eq!(ScriptOutcome::Structured(json!("done")).render(), "done");
        assert_eq!(ScriptOutcome::Raw("done".into()).to_string(), "done");
        assert_eq!(
            ScriptOutcome::Structured(json!({ "a": 1 })).render(),
            "{\n  \"a\": 1\n}"
        );
    }
}
