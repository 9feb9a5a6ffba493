use std::fmt;
use std::sync::Arc;

use fmtools_core::{Error, ParamSpec, ParamType, Result, ScriptOutcome, ToolDescriptor};
use serde_json::{Map, Value, json};

use crate::invoker::ScriptInvoker;

/// One parameter of a synthesized tool, in signature order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSlot {
    pub name: String,
    pub spec: ParamSpec,
    pub required: bool,
}

impl ParamSlot {
    pub fn param_type(&self) -> &ParamType {
        &self.spec.param_type
    }
}

/// A callable built from a [`ToolDescriptor`].
///
/// Slots list required parameters first, then optional ones, each group in
/// the order the remote declared them. Calling the tool packs the supplied
/// arguments into a name/value map and runs the same-named remote script.
#[derive(Clone)]
pub struct SynthesizedTool {
    name: String,
    description: String,
    slots: Vec<ParamSlot>,
    invoker: Arc<dyn ScriptInvoker>,
}

impl fmt::Debug for SynthesizedTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesizedTool")
            .field("name", &self.name)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl SynthesizedTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    pub fn required(&self) -> impl Iterator<Item = &ParamSlot> {
        self.slots.iter().filter(|s| s.required)
    }

    pub fn slot(&self, name: &str) -> Option<&ParamSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// JSON-schema object advertised as the tool's input schema.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .slots
            .iter()
            .map(|slot| (slot.name.clone(), slot.spec.to_schema()))
            .collect();
        let required: Vec<&str> = self.required().map(|s| s.name.as_str()).collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate named arguments and build the map sent to the script.
    ///
    /// Required parameters must be present and non-null. Optional ones that
    /// are absent or null are left out. Unknown names are rejected. The
    /// result follows slot order.
    pub fn pack_arguments(&self, arguments: &Map<String, Value>) -> Result<Map<String, Value>> {
        if let Some(unknown) = arguments.keys().find(|k| self.slot(k).is_none()) {
            return Err(Error::argument(
                &self.name,
                format!("unexpected argument '{unknown}'"),
            ));
        }

        let missing: Vec<&str> = self
            .required()
            .filter(|slot| matches!(arguments.get(&slot.name), None | Some(Value::Null)))
            .map(|slot| slot.name.as_str())
            .collect();
        if !missing.is_empty() {
            let noun = if missing.len() == 1 {
                "argument"
            } else {
                "arguments"
            };
            return Err(Error::argument(
                &self.name,
                format!("missing required {noun}: {}", missing.join(", ")),
            ));
        }

        let mut packed = Map::new();
        for slot in &self.slots {
            match arguments.get(&slot.name) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    packed.insert(slot.name.clone(), value.clone());
                }
            }
        }
        Ok(packed)
    }

    /// Call the tool with named arguments.
    pub async fn call(&self, arguments: &Map<String, Value>) -> Result<ScriptOutcome> {
        let packed = self.pack_arguments(arguments)?;
        self.invoker.invoke(&self.name, Some(&packed)).await
    }

    /// Call the tool with arguments in slot order. `None` leaves a slot
    /// unset.
    pub async fn call_positional(&self, values: Vec<Option<Value>>) -> Result<ScriptOutcome> {
        if values.len() > self.slots.len() {
            return Err(Error::argument(
                &self.name,
                format!(
                    "takes at most {} arguments, got {}",
                    self.slots.len(),
                    values.len()
                ),
            ));
        }
        let arguments: Map<String, Value> = self
            .slots
            .iter()
            .zip(values)
            .filter_map(|(slot, value)| value.map(|v| (slot.name.clone(), v)))
            .collect();
        self.call(&arguments).await
    }
}

/// Turns descriptors into [`SynthesizedTool`]s bound to one invoker.
#[derive(Clone)]
pub struct ToolSynthesizer {
    invoker: Arc<dyn ScriptInvoker>,
}

impl ToolSynthesizer {
    pub fn new(invoker: Arc<dyn ScriptInvoker>) -> Self {
        Self { invoker }
    }

    pub fn synthesize(&self, descriptor: &ToolDescriptor) -> SynthesizedTool {
        let schema = &descriptor.parameters;
        for name in schema
            .required
            .iter()
            .filter(|name| schema.property(name).is_none())
        {
            tracing::debug!(
                tool = %descriptor.name,
                parameter = %name,
                "required name has no property, ignoring"
            );
        }
        let slot = |(name, spec): &(String, ParamSpec)| ParamSlot {
            name: name.clone(),
            spec: spec.clone(),
            required: schema.is_required(name),
        };
        let slots = schema
            .properties
            .iter()
            .filter(|(name, _)| schema.is_required(name))
            .map(slot)
            .chain(
                schema
                    .properties
                    .iter()
                    .filter(|(name, _)| !schema.is_required(name))
                    .map(slot),
            )
            .collect();

        SynthesizedTool {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            slots,
            invoker: self.invoker.clone(),
        }
    }
}
