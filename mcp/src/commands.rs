use fmtools_core::descriptor::DescriptorSummary;
use fmtools_core::{Error, FileMakerConfig, RawConnectionSettings};
use fmtools_mcp_runtime::{MCP_SERVER_NAME, McpServer, Runtime, bootstrap, to_pretty_json};
use serde_json::{Map, Value, json};
use tokio::sync::watch;

use crate::cli::{CallArgs, Cli, Command, ServeArgs};

/// Run the selected command and return the process exit code.
pub async fn run(cli: Cli) -> i32 {
    let config = match RawConnectionSettings::from(cli.connection).resolve() {
        Ok(config) => config,
        Err(err) => return report_error(&err),
    };
    tracing::debug!(?config, "configuration loaded");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, cli.serve).await,
        Command::Diagnose => diagnose(&config).await,
        Command::Call(args) => call(&config, args).await,
    }
}

fn report_error(err: &Error) -> i32 {
    let payload = serde_json::to_value(err.to_payload()).unwrap_or_else(|_| json!({}));
    eprintln!("{}", to_pretty_json(&payload));
    1
}

async fn start(config: &FileMakerConfig) -> Result<Runtime, i32> {
    bootstrap(config).await.map_err(|err| report_error(&err))
}

async fn serve(config: &FileMakerConfig, args: ServeArgs) -> i32 {
    let runtime = match start(config).await {
        Ok(runtime) => runtime,
        Err(code) => return code,
    };

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let ui = if args.no_ui {
        None
    } else {
        match fmtools_ui::bind(args.ui_addr).await {
            Ok(listener) => {
                let registry = runtime.registry.clone();
                let shutdown = async move {
                    let _ = stop_rx.changed().await;
                };
                Some(tokio::spawn(fmtools_ui::serve(listener, registry, shutdown)))
            }
            Err(err) => {
                tracing::error!(addr = %args.ui_addr, "form UI disabled, bind failed: {err}");
                None
            }
        }
    };

    let server = McpServer::new(runtime.registry.clone());
    let result = tokio::select! {
        result = server.serve_stdio() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            Ok(())
        }
    };

    let _ = stop_tx.send(true);
    if let Some(handle) = ui {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!("form UI failed: {err}"),
            Err(err) => tracing::warn!("form UI task panicked: {err}"),
        }
    }
    runtime.shutdown().await;

    match result {
        Ok(()) => 0,
        Err(message) => {
            let payload = json!({
                "error": "mcp_server_error",
                "message": message,
            });
            eprintln!("{}", to_pretty_json(&payload));
            1
        }
    }
}

async fn diagnose(config: &FileMakerConfig) -> i32 {
    let runtime = match start(config).await {
        Ok(runtime) => runtime,
        Err(code) => return code,
    };

    let report = diagnostic_report(&runtime);
    println!("{}", to_pretty_json(&report));
    runtime.shutdown().await;

    if runtime.report.is_complete() { 0 } else { 2 }
}

fn diagnostic_report(runtime: &Runtime) -> Value {
    let tools: Vec<DescriptorSummary> = runtime
        .descriptors
        .iter()
        .map(DescriptorSummary::from)
        .collect();
    json!({
        "status": if runtime.report.is_complete() { "ready" } else { "degraded" },
        "server": MCP_SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "auth": "ok",
        "tool_count": runtime.registry.len(),
        "tools": tools,
        "registration": runtime.report,
    })
}

/// Parse `--args` into a named-argument map.
fn parse_call_arguments(tool: &str, raw: &str) -> Result<Map<String, Value>, Error> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::argument(tool, "--args must be a JSON object")),
        Err(e) => Err(Error::argument(tool, format!("--args is not valid JSON: {e}"))),
    }
}

async fn call(config: &FileMakerConfig, args: CallArgs) -> i32 {
    let arguments = match parse_call_arguments(&args.tool, &args.args) {
        Ok(arguments) => arguments,
        Err(err) => return report_error(&err),
    };
    let runtime = match start(config).await {
        Ok(runtime) => runtime,
        Err(code) => return code,
    };

    let result = match runtime.registry.get(&args.tool) {
        Some(tool) => tool.call(&arguments).await,
        None => Err(Error::argument(
            &args.tool,
            format!(
                "no such tool; registered: {}",
                runtime.registry.names().join(", ")
            ),
        )),
    };
    runtime.shutdown().await;

    match result {
        Ok(outcome) => {
            println!("{}", outcome.render());
            0
        }
        Err(err) => report_error(&err),
    }
}
