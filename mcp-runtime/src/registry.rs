use std::collections::HashMap;
use std::sync::Arc;

use fmtools_core::{Error, Result, ToolDescriptor};
use serde::Serialize;

use crate::synth::{SynthesizedTool, ToolSynthesizer};

/// Tools exposed to the protocol server and the form UI.
///
/// Built once at startup and shared read-only afterwards. Listing order is
/// the order names were first registered.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<SynthesizedTool>>,
    index: HashMap<String, usize>,
}

/// One descriptor that did not make it into the registry.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationFailure {
    /// Position in the discovery list
    pub index: usize,
    pub name: String,
    pub reason: String,
}

/// Per-tool result of [`ToolRegistry::register_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationReport {
    /// Distinct names, in first-registration order
    pub registered: Vec<String>,
    /// Names whose earlier definition was overwritten by a later descriptor
    pub replaced: Vec<String>,
    pub failed: Vec<RegistrationFailure>,
}

impl RegistrationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn log(&self) {
        for failure in &self.failed {
            tracing::warn!(
                index = failure.index,
                tool = %failure.name,
                reason = %failure.reason,
                "tool skipped"
            );
        }
        tracing::info!(
            registered = self.registered.len(),
            replaced = self.replaced.len(),
            failed = self.failed.len(),
            "tool registration finished"
        );
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A second tool with the same name replaces the first but
    /// keeps its listing position.
    pub fn register(&mut self, tool: SynthesizedTool) -> Result<()> {
        validate_name(tool.name())?;
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&position) => {
                tracing::warn!(tool = %name, "duplicate tool name, replacing earlier definition");
                self.tools[position] = Arc::new(tool);
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(Arc::new(tool));
            }
        }
        Ok(())
    }

    /// Synthesize and register every descriptor. One bad descriptor never
    /// stops the others.
    pub fn register_all(
        &mut self,
        descriptors: &[ToolDescriptor],
        synthesizer: &ToolSynthesizer,
    ) -> RegistrationReport {
        let mut report = RegistrationReport::default();
        for (index, descriptor) in descriptors.iter().enumerate() {
            let seen = self.index.contains_key(&descriptor.name);
            let result = validate_name(&descriptor.name)
                .and_then(|()| self.register(synthesizer.synthesize(descriptor)));
            match result {
                Ok(()) if seen => {
                    if !report.replaced.contains(&descriptor.name) {
                        report.replaced.push(descriptor.name.clone());
                    }
                }
                Ok(()) => report.registered.push(descriptor.name.clone()),
                Err(e) => {
                    let reason = match e {
                        Error::Registration { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    report.failed.push(RegistrationFailure {
                        index,
                        name: descriptor.name.clone(),
                        reason,
                    });
                }
            }
        }
        report
    }

    pub fn get(&self, name: &str) -> Option<Arc<SynthesizedTool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn tools(&self) -> &[Arc<SynthesizedTool>] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::registration(name, "descriptor has no name"));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::registration(
            name,
            "name contains control characters",
        ));
    }
    Ok(())
}
