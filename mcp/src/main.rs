use clap::Parser;

mod cli;
mod commands;
mod logging;

use cli::Cli;

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init(cli.log_format);

    let code = commands::run(cli).await;
    std::process::exit(code);
}
