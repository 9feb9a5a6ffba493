use std::collections::HashMap;

use fmtools_core::ParamType;
use fmtools_mcp_runtime::{ParamSlot, SynthesizedTool};
use serde_json::{Number, Value};

/// Input control used for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    Text,
    Number,
    Integer,
    Checkbox,
    /// Multi-line box for object/array parameters; the content is parsed as
    /// JSON when possible.
    Json,
}

impl Widget {
    pub fn for_type(param_type: &ParamType) -> Self {
        match param_type {
            ParamType::String | ParamType::Unknown(_) => Widget::Text,
            ParamType::Number => Widget::Number,
            ParamType::Integer => Widget::Integer,
            ParamType::Boolean => Widget::Checkbox,
            ParamType::Object | ParamType::Array => Widget::Json,
        }
    }
}

/// Label shown next to an input: `name (description)`, or just the name.
pub fn label(slot: &ParamSlot) -> String {
    if slot.spec.description.is_empty() {
        slot.name.clone()
    } else {
        format!("{} ({})", slot.name, slot.spec.description)
    }
}

/// Turn submitted form fields into positional values in slot order.
///
/// Blank text means "not supplied". Checkboxes are always supplied, as
/// `true` when ticked and `false` otherwise.
pub fn gather(
    tool: &SynthesizedTool,
    fields: &HashMap<String, String>,
) -> Result<Vec<Option<Value>>, String> {
    tool.slots()
        .iter()
        .map(|slot| read_slot(slot, fields.get(&slot.name).map(String::as_str)))
        .collect()
}

fn read_slot(slot: &ParamSlot, raw: Option<&str>) -> Result<Option<Value>, String> {
    let widget = Widget::for_type(slot.param_type());
    if widget == Widget::Checkbox {
        let ticked = raw.is_some_and(|v| matches!(v, "true" | "on" | "1"));
        return Ok(Some(Value::Bool(ticked)));
    }

    let Some(text) = raw.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let trimmed = text.trim();

    let value = match widget {
        Widget::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{}' must be a whole number, got '{trimmed}'", slot.name))?,
        Widget::Number => parse_number(trimmed)
            .ok_or_else(|| format!("'{}' must be a number, got '{trimmed}'", slot.name))?,
        Widget::Json => {
            serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(text.to_string()))
        }
        Widget::Text | Widget::Checkbox => Value::String(text.to_string()),
    };
    Ok(Some(value))
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(whole) = text.parse::<i64>() {
        return Some(Value::from(whole));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
