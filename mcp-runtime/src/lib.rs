mod data_api;
pub mod discovery;
pub mod framing;
pub mod invoker;
pub mod registry;
pub mod server;
pub mod session;
pub mod synth;

use std::sync::Arc;

use fmtools_core::{FileMakerConfig, Result, ToolDescriptor};

pub use data_api::DataApi;
pub use discovery::fetch_tools;
pub use invoker::{FileMakerInvoker, ScriptInvoker, decode_envelope};
pub use registry::{RegistrationFailure, RegistrationReport, ToolRegistry};
pub use server::{MCP_PROTOCOL_VERSION, MCP_SERVER_NAME, McpServer, to_pretty_json};
pub use session::{Session, SessionManager};
pub use synth::{ParamSlot, SynthesizedTool, ToolSynthesizer};

/// Everything a front end needs after startup.
pub struct Runtime {
    pub invoker: Arc<dyn ScriptInvoker>,
    pub sessions: Arc<SessionManager>,
    pub descriptors: Vec<ToolDescriptor>,
    pub registry: Arc<ToolRegistry>,
    pub report: RegistrationReport,
}

impl Runtime {
    /// Release the remote session. Call once on the way out.
    pub async fn shutdown(&self) {
        self.sessions.close().await;
    }
}

/// Authenticate, fetch the tool list and register every tool.
///
/// Authentication and discovery failures are fatal. Individual tools that
/// cannot be registered are recorded in the report and skipped.
pub async fn bootstrap(config: &FileMakerConfig) -> Result<Runtime> {
    let filemaker = FileMakerInvoker::new(config)?;
    let sessions = filemaker.sessions().clone();
    sessions.current().await?;

    let invoker: Arc<dyn ScriptInvoker> = Arc::new(filemaker);
    let (descriptors, registry, report) = discover(invoker.clone(), &config.tool_list_script).await?;

    Ok(Runtime {
        invoker,
        sessions,
        descriptors,
        registry: Arc::new(registry),
        report,
    })
}

/// Discovery and registration against any invoker.
pub async fn discover(
    invoker: Arc<dyn ScriptInvoker>,
    tool_list_script: &str,
) -> Result<(Vec<ToolDescriptor>, ToolRegistry, RegistrationReport)> {
    let descriptors = fetch_tools(invoker.as_ref(), tool_list_script).await?;
    let synthesizer = ToolSynthesizer::new(invoker);
    let mut registry = ToolRegistry::new();
    let report = registry.register_all(&descriptors, &synthesizer);
    report.log();
    Ok((descriptors, registry, report))
}
