use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogFormat;

const DEFAULT_FILTER: &str =
    "fmtools_mcp=info,fmtools_mcp_runtime=info,fmtools_ui=info,tower_http=info";

/// Install the global subscriber. Always writes to stderr: stdout belongs
/// to the protocol stream.
pub fn init(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
