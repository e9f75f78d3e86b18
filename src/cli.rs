//! CLI - Command Line Interface for Nostalgia
//!
//! Every client action is scriptable. All output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Download two episodes of a show
//! nostalgia download cavaleiros ep01.mp4 ep02.mp4 --show-name "Cavaleiros do Zodiaco"
//!
//! # Record and read playback progress
//! nostalgia history set cdz-01 600 1200
//! nostalgia history get cdz-01 --json
//!
//! # Run the watchlist server
//! nostalgia serve --listen 0.0.0.0:5173
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// At least one download failed
    DownloadFailed = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Nostalgia - media library client
#[derive(Parser, Debug)]
#[command(
    name = "nostalgia",
    version,
    author = "Gorka & Hermes",
    about = "Client for a self-hosted media library",
    long_about = "Download episodes for offline viewing, track watch progress, \
                  manage favorites and the server watchlist.",
    after_help = "EXAMPLES:\n\
                  nostalgia download cavaleiros ep01.mp4     Download an episode\n\
                  nostalgia history get cdz-01               Show saved progress\n\
                  nostalgia favorites list --json            List favorites\n\
                  nostalgia serve                            Run the watchlist server"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download episodes for offline viewing
    #[command(visible_alias = "dl")]
    Download(DownloadCmd),

    /// Read or record playback progress
    #[command(subcommand, visible_alias = "h")]
    History(HistoryCmd),

    /// Manage favorite shows
    #[command(subcommand, visible_alias = "fav")]
    Favorites(FavoritesCmd),

    /// Manage the server watchlist
    #[command(subcommand, visible_alias = "wl")]
    Watchlist(WatchlistCmd),

    /// Serve the watchlist resource over HTTP
    Serve(ServeCmd),

    /// Show or change the theme
    Theme(ThemeCmd),

    /// Check whether the media server is reachable
    Health(HealthCmd),
}

// =============================================================================
// Download Command
// =============================================================================

/// Download one or more episodes of a show
#[derive(Args, Debug)]
pub struct DownloadCmd {
    /// Show folder on the media server
    #[arg(required = true)]
    pub folder: String,

    /// Episode file names inside the folder
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<String>,

    /// Display name of the show (defaults to the folder)
    #[arg(long, short = 'n')]
    pub show_name: Option<String>,

    /// Show code
    #[arg(long)]
    pub code: Option<String>,

    /// Episode title (single-file downloads only)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Poster used as the task thumbnail
    #[arg(long, short = 'p')]
    pub poster: Option<String>,
}

// =============================================================================
// History Commands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum HistoryCmd {
    /// Show saved progress (all entries when no code is given)
    Get(HistoryGetCmd),
    /// Record playback position for an episode
    Set(HistorySetCmd),
}

#[derive(Args, Debug)]
pub struct HistoryGetCmd {
    /// Episode or movie code
    pub code: Option<String>,
}

#[derive(Args, Debug)]
pub struct HistorySetCmd {
    /// Episode or movie code
    #[arg(required = true)]
    pub code: String,

    /// Current position in seconds
    #[arg(required = true)]
    pub current_time: f64,

    /// Total length in seconds
    #[arg(required = true)]
    pub duration: f64,
}

// =============================================================================
// Favorites Commands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum FavoritesCmd {
    /// List favorites
    #[command(visible_alias = "ls")]
    List,
    /// Add a favorite
    Add(FavoriteAddCmd),
    /// Remove a favorite by code
    #[command(visible_alias = "rm")]
    Remove(FavoriteRemoveCmd),
}

#[derive(Args, Debug)]
pub struct FavoriteAddCmd {
    #[arg(required = true)]
    pub code: String,

    #[arg(required = true)]
    pub name: String,

    /// Poster URL or path
    #[arg(long, short = 'p', default_value = "")]
    pub poster: String,
}

#[derive(Args, Debug)]
pub struct FavoriteRemoveCmd {
    #[arg(required = true)]
    pub code: String,
}

// =============================================================================
// Watchlist Commands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum WatchlistCmd {
    /// List the server watchlist
    #[command(visible_alias = "ls")]
    List,
    /// Add an entry
    Add(WatchlistAddCmd),
    /// Remove an entry by id
    #[command(visible_alias = "rm")]
    Remove(WatchlistRemoveCmd),
}

#[derive(Args, Debug)]
pub struct WatchlistAddCmd {
    #[arg(required = true)]
    pub id: String,

    #[arg(required = true)]
    pub title: String,

    #[arg(required = true)]
    pub path: String,
}

#[derive(Args, Debug)]
pub struct WatchlistRemoveCmd {
    #[arg(required = true)]
    pub id: String,
}

// =============================================================================
// Serve / Theme / Health
// =============================================================================

/// Run the watchlist HTTP server
#[derive(Args, Debug)]
pub struct ServeCmd {
    /// Address to bind (overrides listen_addr from config)
    #[arg(long, short = 'l')]
    pub listen: Option<String>,

    /// Watchlist CSV file (overrides watchlist_file from config)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,
}

/// Show the current theme, or set it when a name is given
#[derive(Args, Debug)]
pub struct ThemeCmd {
    /// default, nostalgia or matrix
    pub name: Option<String>,
}

/// Probe the media server
#[derive(Args, Debug)]
pub struct HealthCmd {
    /// Server URL (overrides config and NOSTALGIA_SERVER_URL)
    #[arg(long, short = 's')]
    pub server: Option<String>,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Status OK response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusOk {
    pub status: &'static str,
}

impl Default for StatusOk {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_download_command() {
        let cli = Cli::parse_from([
            "nostalgia",
            "download",
            "cavaleiros",
            "ep01.mp4",
            "ep02.mp4",
            "-n",
            "Cavaleiros do Zodiaco",
        ]);
        if let Command::Download(cmd) = cli.command {
            assert_eq!(cmd.folder, "cavaleiros");
            assert_eq!(cmd.files, vec!["ep01.mp4", "ep02.mp4"]);
            assert_eq!(cmd.show_name.as_deref(), Some("Cavaleiros do Zodiaco"));
        } else {
            panic!("Expected Download command");
        }
    }

    #[test]
    fn test_download_requires_a_file() {
        assert!(Cli::try_parse_from(["nostalgia", "download", "cavaleiros"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["nostalgia", "--json", "--quiet", "favorites", "list"]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Favorites(FavoritesCmd::List)));
    }

    #[test]
    fn test_history_set() {
        let cli = Cli::parse_from(["nostalgia", "history", "set", "cdz-01", "600", "1200.5"]);
        if let Command::History(HistoryCmd::Set(cmd)) = cli.command {
            assert_eq!(cmd.code, "cdz-01");
            assert_eq!(cmd.current_time, 600.0);
            assert_eq!(cmd.duration, 1200.5);
        } else {
            panic!("Expected History Set command");
        }
    }

    #[test]
    fn test_theme_optional_name() {
        let cli = Cli::parse_from(["nostalgia", "theme"]);
        assert!(matches!(cli.command, Command::Theme(ThemeCmd { name: None })));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::Error), 1);
        assert_eq!(i32::from(ExitCode::InvalidArgs), 2);
        assert_eq!(i32::from(ExitCode::NetworkError), 3);
        assert_eq!(i32::from(ExitCode::DownloadFailed), 4);
    }
}
