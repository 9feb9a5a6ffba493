use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fmtools_core::RawConnectionSettings;
use fmtools_ui::DEFAULT_UI_ADDR;

#[derive(Parser, Debug)]
#[command(
    name = "fmtools-mcp",
    version,
    about = "Expose FileMaker scripts as MCP tools over stdio, with an optional form UI"
)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub serve: ServeArgs,

    /// Log output format (logs always go to stderr)
    #[arg(long, env = "FMTOOLS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the MCP server over stdio (and the form UI unless disabled)
    Serve,
    /// Authenticate, discover tools and print a JSON report
    Diagnose,
    /// Call one tool and print its result
    Call(CallArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// FileMaker Server host, optionally with a port
    #[arg(long = "fm-host", env = "FM_HOST", global = true)]
    pub host: Option<String>,
    /// Hosted database (file) name
    #[arg(long = "fm-database", env = "FM_DATABASE", global = true)]
    pub database: Option<String>,
    /// Layout that provides the script context
    #[arg(long = "fm-layout", env = "FM_LAYOUT", global = true)]
    pub layout: Option<String>,
    #[arg(long = "fm-username", env = "FM_USERNAME", global = true)]
    pub username: Option<String>,
    #[arg(long = "fm-password", env = "FM_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,
    /// `https` (default) or `http`
    #[arg(long = "fm-scheme", env = "FM_SCHEME", global = true)]
    pub scheme: Option<String>,
    /// Timeout for every remote call, in seconds (default 30)
    #[arg(long = "fm-timeout-secs", env = "FM_TIMEOUT_SECS", global = true)]
    pub timeout_secs: Option<u64>,
    /// Script that lists the tools (default GetToolList)
    #[arg(long = "fm-tool-list-script", env = "FM_TOOL_LIST_SCRIPT", global = true)]
    pub tool_list_script: Option<String>,
}

impl From<ConnectionArgs> for RawConnectionSettings {
    fn from(args: ConnectionArgs) -> Self {
        RawConnectionSettings {
            host: args.host,
            database: args.database,
            layout: args.layout,
            username: args.username,
            password: args.password,
            scheme: args.scheme,
            timeout_secs: args.timeout_secs,
            tool_list_script: args.tool_list_script,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address for the form UI
    #[arg(long, env = "FMTOOLS_UI_ADDR", default_value = DEFAULT_UI_ADDR, global = true)]
    pub ui_addr: SocketAddr,
    /// Run only the MCP server
    #[arg(long, env = "FMTOOLS_NO_UI", global = true)]
    pub no_ui: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CallArgs {
    /// Tool (script) name
    pub tool: String,
    /// Arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}
