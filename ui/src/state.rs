use std::sync::Arc;

use fmtools_mcp_runtime::{SynthesizedTool, ToolRegistry};

use crate::error::UiError;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn tool(&self, name: &str) -> Result<Arc<SynthesizedTool>, UiError> {
        self.registry
            .get(name)
            .ok_or_else(|| UiError::UnknownTool(name.to_string()))
    }
}
