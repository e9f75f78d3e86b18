//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the session stores and services.
//! Each handler takes CLI args, config and Output, returns ExitCode.

use futures_util::future::join_all;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::{ApiClient, ApiError, Health};
use crate::app::Session;
use crate::cli::{
    DownloadCmd, ExitCode, FavoritesCmd, HealthCmd, HistoryCmd, Output, ServeCmd, StatusOk,
    ThemeCmd, WatchlistCmd,
};
use crate::config::Config;
use crate::models::{Episode, FavoriteItem, ShowDetails, Theme, WatchlistItem};
use crate::watchlist::{server, WatchlistFile, WatchlistService};

/// Open a session or report why it could not be opened
async fn open_session(config: Config, output: &Output) -> Result<Session, ExitCode> {
    Session::initialize(config)
        .await
        .map_err(|e| output.error(format!("Failed to start session: {:#}", e), ExitCode::Error))
}

fn print_or_fail<T: Serialize>(output: &Output, data: T) -> ExitCode {
    match output.print(data) {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}

fn api_exit_code(e: &ApiError) -> ExitCode {
    match e {
        ApiError::MissingServerUrl => ExitCode::InvalidArgs,
        _ => ExitCode::NetworkError,
    }
}

// =============================================================================
// Download Command
// =============================================================================

/// Per-episode download result
#[derive(Debug, Serialize)]
struct DownloadReport {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn download_cmd(cmd: DownloadCmd, config: Config, output: &Output) -> ExitCode {
    let server_url = match config.require_server_url() {
        Ok(url) => url,
        Err(e) => return output.error(e.to_string(), ExitCode::InvalidArgs),
    };
    if cmd.title.is_some() && cmd.files.len() > 1 {
        return output.error(
            "--title can only be used when downloading a single file",
            ExitCode::InvalidArgs,
        );
    }

    let session = match open_session(config, output).await {
        Ok(session) => session,
        Err(code) => return code,
    };

    let show = ShowDetails {
        code: cmd.code.clone().unwrap_or_else(|| cmd.folder.clone()),
        name: cmd.show_name.clone().unwrap_or_else(|| cmd.folder.clone()),
        folder: cmd.folder.clone(),
        poster: cmd.poster.clone(),
    };
    let episodes: Vec<Episode> = cmd
        .files
        .iter()
        .map(|file| Episode {
            file: file.clone(),
            path: format!("{}/{}", cmd.folder, file),
            title: cmd.title.clone(),
            synopsis: None,
            thumbnail: None,
        })
        .collect();

    output.info(format!(
        "Downloading {} episode(s) of {} to {:?}",
        episodes.len(),
        show.name,
        session.orchestrator.app_dir().root()
    ));

    // Downloads run concurrently; each has its own task id and subscription
    let results = join_all(
        episodes
            .iter()
            .map(|episode| session.orchestrator.start_download(&server_url, &show, episode)),
    )
    .await;

    let mut failed = 0;
    let reports: Vec<DownloadReport> = episodes
        .iter()
        .zip(results)
        .map(|(episode, result)| match result {
            Ok(id) => {
                output.info(format!("  ✓ {}", episode.label()));
                DownloadReport {
                    file: episode.file.clone(),
                    id: Some(id),
                    status: "completed".to_string(),
                    error: None,
                }
            }
            Err(e) => {
                failed += 1;
                output.info(format!("  ✗ {}: {}", episode.label(), e));
                DownloadReport {
                    file: episode.file.clone(),
                    id: Some(e.id().to_string()),
                    status: "error".to_string(),
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    let code = print_or_fail(output, &reports);
    session.shutdown();

    if code != ExitCode::Success {
        code
    } else if failed > 0 {
        output.error(
            format!("{} of {} downloads failed", failed, reports.len()),
            ExitCode::DownloadFailed,
        )
    } else {
        ExitCode::Success
    }
}

// =============================================================================
// History Commands
// =============================================================================

pub async fn history_cmd(cmd: HistoryCmd, config: Config, output: &Output) -> ExitCode {
    if let HistoryCmd::Set(set) = &cmd {
        if set.code.trim().is_empty() {
            return output.error("Code must not be empty", ExitCode::InvalidArgs);
        }
        if !set.duration.is_finite() || set.duration <= 0.0 {
            return output.error("Duration must be greater than zero", ExitCode::InvalidArgs);
        }
        if !set.current_time.is_finite() || set.current_time < 0.0 {
            return output.error("Current time must be a non-negative number", ExitCode::InvalidArgs);
        }
    }

    let session = match open_session(config, output).await {
        Ok(session) => session,
        Err(code) => return code,
    };

    let code = match cmd {
        HistoryCmd::Get(get) => match get.code {
            Some(code) => match session.watch_history.get_progress(&code) {
                Some(entry) => print_or_fail(output, &entry),
                None => output.error(format!("No progress saved for {}", code), ExitCode::Error),
            },
            None => {
                let mut entries: Vec<_> = session.watch_history.all().into_values().collect();
                entries.sort_by(|a, b| b.watched_at.cmp(&a.watched_at));
                print_or_fail(output, &entries)
            }
        },
        HistoryCmd::Set(set) => {
            session
                .watch_history
                .update_progress(&set.code, set.current_time, set.duration);
            match session.watch_history.get_progress(&set.code) {
                Some(entry) => print_or_fail(output, &entry),
                None => output.error("Progress was not recorded", ExitCode::Error),
            }
        }
    };

    session.shutdown();
    code
}

// =============================================================================
// Favorites Commands
// =============================================================================

/// Result of a favorites change
#[derive(Debug, Serialize)]
struct FavoriteChange {
    code: String,
    message: String,
    favorites: Vec<FavoriteItem>,
}

pub async fn favorites_cmd(cmd: FavoritesCmd, config: Config, output: &Output) -> ExitCode {
    let session = match open_session(config, output).await {
        Ok(session) => session,
        Err(code) => return code,
    };
    let favorites = &session.favorites;

    let code = match cmd {
        FavoritesCmd::List => print_or_fail(output, favorites.items()),
        FavoritesCmd::Add(add) => {
            let item = FavoriteItem {
                code: add.code,
                name: add.name,
                poster: add.poster,
            };
            let outcome = favorites.add(item.clone());
            print_or_fail(
                output,
                FavoriteChange {
                    message: outcome.notice(&item),
                    code: item.code,
                    favorites: favorites.items(),
                },
            )
        }
        FavoritesCmd::Remove(remove) => {
            let existed = favorites.contains(&remove.code);
            favorites.remove(&remove.code);
            let message = if existed {
                "Removed from favorites"
            } else {
                "Not in favorites"
            };
            print_or_fail(
                output,
                FavoriteChange {
                    code: remove.code,
                    message: message.to_string(),
                    favorites: favorites.items(),
                },
            )
        }
    };

    session.shutdown();
    code
}

// =============================================================================
// Watchlist Commands (remote)
// =============================================================================

pub async fn watchlist_cmd(cmd: WatchlistCmd, config: Config, output: &Output) -> ExitCode {
    let client = match ApiClient::new(config.server_url().as_deref()) {
        Ok(client) => client,
        Err(e) => return output.error(e.to_string(), api_exit_code(&e)),
    };

    match cmd {
        WatchlistCmd::List => match client.watchlist().await {
            Ok(items) => print_or_fail(output, &items),
            Err(e) => output.error(format!("Watchlist fetch failed: {}", e), api_exit_code(&e)),
        },
        WatchlistCmd::Add(add) => {
            let item = WatchlistItem {
                id: add.id,
                title: add.title,
                path: add.path,
            };
            match client.add_to_watchlist(&item).await {
                Ok(()) => print_or_fail(output, &item),
                Err(e) => output.error(format!("Could not add to watchlist: {}", e), api_exit_code(&e)),
            }
        }
        WatchlistCmd::Remove(remove) => match client.remove_from_watchlist(&remove.id).await {
            Ok(()) => print_or_fail(output, StatusOk::default()),
            Err(e) => output.error(
                format!("Could not remove from watchlist: {}", e),
                api_exit_code(&e),
            ),
        },
    }
}

// =============================================================================
// Serve Command
// =============================================================================

pub async fn serve_cmd(cmd: ServeCmd, config: Config, output: &Output) -> ExitCode {
    let listen = cmd.listen.unwrap_or_else(|| config.listen_addr.clone());
    let addr: SocketAddr = match listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            return output.error(
                format!("Invalid listen address {:?}: {}", listen, e),
                ExitCode::InvalidArgs,
            )
        }
    };

    let file = match cmd.file {
        Some(path) => WatchlistFile::new(path),
        None => config.watchlist_file(),
    };
    output.info(format!("Serving {:?} on http://{}/api/watchlist", file.path(), addr));

    let service = Arc::new(WatchlistService::new(file));
    match server::serve(addr, service).await {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Watchlist server failed: {}", e), ExitCode::Error),
    }
}

// =============================================================================
// Theme Command
// =============================================================================

#[derive(Debug, Serialize)]
struct ThemeStatus {
    theme: Theme,
}

pub async fn theme_cmd(cmd: ThemeCmd, config: Config, output: &Output) -> ExitCode {
    let theme = match cmd.name.as_deref().map(Theme::from_name) {
        Some(Some(theme)) => Some(theme),
        Some(None) => {
            return output.error(
                "Unknown theme (expected default, nostalgia or matrix)",
                ExitCode::InvalidArgs,
            )
        }
        None => None,
    };

    let session = match open_session(config, output).await {
        Ok(session) => session,
        Err(code) => return code,
    };
    if let Some(theme) = theme {
        session.preferences.theme.set(theme);
        output.info(format!("Theme set to {}", theme));
    }

    let code = print_or_fail(
        output,
        ThemeStatus {
            theme: session.preferences.theme.get(),
        },
    );
    session.shutdown();
    code
}

// =============================================================================
// Health Command
// =============================================================================

#[derive(Debug, Serialize)]
struct HealthStatus {
    server: String,
    status: Health,
}

pub async fn health_cmd(cmd: HealthCmd, config: Config, output: &Output) -> ExitCode {
    let server = cmd.server.or_else(|| config.server_url());
    let client = match ApiClient::new(server.as_deref()) {
        Ok(client) => client,
        Err(e) => return output.error(e.to_string(), api_exit_code(&e)),
    };

    let status = client.health_check().await;
    let report = HealthStatus {
        server: client.base_url().to_string(),
        status,
    };
    match status {
        Health::Online => print_or_fail(output, &report),
        Health::Offline => {
            let _ = output.print(&report);
            ExitCode::NetworkError
        }
    }
}
