use serde::Serialize;
use serde_json::{Map, Value};

/// Declared type of a tool parameter.
///
/// Types are advisory metadata for the protocol server and the form UI.
/// Values are never coerced against them; the remote script decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    /// A type name this crate does not recognise, kept verbatim.
    Unknown(String),
}

impl ParamType {
    /// Parse a schema `type` value. A missing type means `string`.
    pub fn from_schema(raw: Option<&Value>) -> Self {
        match raw {
            None | Some(Value::Null) => ParamType::String,
            Some(Value::String(name)) => Self::from_name(name),
            Some(other) => ParamType::Unknown(other.to_string()),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "string" => ParamType::String,
            "number" => ParamType::Number,
            "integer" => ParamType::Integer,
            "boolean" => ParamType::Boolean,
            "object" => ParamType::Object,
            "array" => ParamType::Array,
            other => ParamType::Unknown(other.to_string()),
        }
    }

    /// JSON-schema type name, or `None` for untyped parameters.
    pub fn schema_name(&self) -> Option<&'static str> {
        match self {
            ParamType::String => Some("string"),
            ParamType::Number => Some("number"),
            ParamType::Integer => Some("integer"),
            ParamType::Boolean => Some("boolean"),
            ParamType::Object => Some("object"),
            ParamType::Array => Some("array"),
            ParamType::Unknown(_) => None,
        }
    }

    /// Host-side representation, as shown to humans.
    pub fn host_type(&self) -> &'static str {
        match self {
            ParamType::String => "text",
            ParamType::Number => "floating-point",
            ParamType::Integer => "whole-number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "key-value map",
            ParamType::Array => "ordered list",
            ParamType::Unknown(_) => "untyped",
        }
    }
}

/// Schema for a single parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub param_type: ParamType,
    pub description: String,
}

impl ParamSpec {
    fn from_value(value: &Value) -> Self {
        Self {
            param_type: ParamType::from_schema(value.get("type")),
            description: read_string(value, "description"),
        }
    }

    /// JSON-schema fragment advertised for this parameter.
    pub fn to_schema(&self) -> Value {
        let mut schema = Map::new();
        if let Some(name) = self.param_type.schema_name() {
            schema.insert("type".to_string(), Value::String(name.to_string()));
        }
        if !self.description.is_empty() {
            schema.insert(
                "description".to_string(),
                Value::String(self.description.clone()),
            );
        }
        Value::Object(schema)
    }
}

/// Parameter block of a descriptor. Property order is the order the remote
/// listed them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    pub required: Vec<String>,
    pub properties: Vec<(String, ParamSpec)>,
}

impl ParameterSchema {
    fn from_value(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };

        let properties = value
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, spec)| (name.clone(), ParamSpec::from_value(spec)))
                    .collect()
            })
            .unwrap_or_default();

        let mut required: Vec<String> = Vec::new();
        for name in value
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            if !required.iter().any(|existing| existing == name) {
                required.push(name.to_string());
            }
        }

        Self {
            required,
            properties,
        }
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    pub fn property(&self, name: &str) -> Option<&ParamSpec> {
        self.properties
            .iter()
            .find(|(prop, _)| prop == name)
            .map(|(_, spec)| spec)
    }
}

/// Metadata for one remotely executable script, as listed by the discovery
/// script. Immutable once fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolDescriptor {
    /// Parse one entry of the discovery `tools` list.
    ///
    /// Accepts both the function-calling shape (`{"function": {...}}`) and a
    /// flat `{name, description, parameters}` object. Missing fields default
    /// to empty values; this never fails.
    pub fn from_value(value: &Value) -> Self {
        let body = match value.get("function") {
            Some(function) if function.is_object() => function,
            _ => value,
        };
        Self {
            name: read_string(body, "name"),
            description: read_string(body, "description"),
            parameters: ParameterSchema::from_value(body.get("parameters")),
        }
    }
}

/// Compact summary used in logs and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct DescriptorSummary {
    pub name: String,
    pub parameters: Vec<String>,
    pub required: Vec<String>,
}

impl From<&ToolDescriptor> for DescriptorSummary {
    fn from(descriptor: &ToolDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            parameters: descriptor
                .parameters
                .properties
                .iter()
                .map(|(name, _)| name.clone())
                .collect(),
            required: descriptor.parameters.required.clone(),
        }
    }
}

fn read_string(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
