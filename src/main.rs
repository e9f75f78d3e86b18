//! Nostalgia - client for a self-hosted media library
//!
//! # Usage
//!
//! ```bash
//! nostalgia download cavaleiros ep01.mp4 --show-name "Cavaleiros do Zodiaco"
//! nostalgia favorites list --json
//! nostalgia serve
//! ```

use clap::Parser;

use nostalgia::cli::{Cli, Command, ExitCode, Output};
use nostalgia::commands;
use nostalgia::config::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}

/// Log to stderr; RUST_LOG overrides the level picked from the flags
fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    match cli.command {
        Command::Download(cmd) => commands::download_cmd(cmd, config, &output).await,
        Command::History(cmd) => commands::history_cmd(cmd, config, &output).await,
        Command::Favorites(cmd) => commands::favorites_cmd(cmd, config, &output).await,
        Command::Watchlist(cmd) => commands::watchlist_cmd(cmd, config, &output).await,
        Command::Serve(cmd) => commands::serve_cmd(cmd, config, &output).await,
        Command::Theme(cmd) => commands::theme_cmd(cmd, config, &output).await,
        Command::Health(cmd) => commands::health_cmd(cmd, config, &output).await,
    }
}
