//! CLI and session tests
//!
//! Argument parsing, JSON output shape, session wiring and the command
//! handlers against a temporary data directory.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use nostalgia::cli::{
        Cli, Command, ExitCode as CliExitCode, FavoritesCmd, HistoryCmd, WatchlistCmd,
    };
    use std::path::PathBuf;

    #[test]
    fn test_download_with_metadata() {
        let cli = Cli::parse_from([
            "nostalgia",
            "download",
            "cavaleiros",
            "ep01.mp4",
            "--show-name",
            "Cavaleiros do Zodiaco",
            "--title",
            "A lenda",
            "--poster",
            "/posters/cdz.jpg",
            "--code",
            "cdz",
        ]);
        match cli.command {
            Command::Download(cmd) => {
                assert_eq!(cmd.folder, "cavaleiros");
                assert_eq!(cmd.files, vec!["ep01.mp4"]);
                assert_eq!(cmd.title.as_deref(), Some("A lenda"));
                assert_eq!(cmd.poster.as_deref(), Some("/posters/cdz.jpg"));
                assert_eq!(cmd.code.as_deref(), Some("cdz"));
            }
            _ => panic!("Expected Download command"),
        }
    }

    #[test]
    fn test_history_get_optional_code() {
        let cli = Cli::parse_from(["nostalgia", "history", "get"]);
        match cli.command {
            Command::History(HistoryCmd::Get(cmd)) => assert!(cmd.code.is_none()),
            _ => panic!("Expected History Get command"),
        }
    }

    #[test]
    fn test_favorites_add_default_poster() {
        let cli = Cli::parse_from(["nostalgia", "favorites", "add", "cdz", "Cavaleiros"]);
        match cli.command {
            Command::Favorites(FavoritesCmd::Add(cmd)) => {
                assert_eq!(cmd.code, "cdz");
                assert_eq!(cmd.name, "Cavaleiros");
                assert_eq!(cmd.poster, "");
            }
            _ => panic!("Expected Favorites Add command"),
        }
    }

    #[test]
    fn test_watchlist_add_requires_path() {
        assert!(Cli::try_parse_from(["nostalgia", "watchlist", "add", "a", "A"]).is_err());
        let cli = Cli::parse_from(["nostalgia", "watchlist", "add", "a", "A", "/media/a"]);
        assert!(matches!(cli.command, Command::Watchlist(WatchlistCmd::Add(_))));
    }

    #[test]
    fn test_command_aliases() {
        let cli = Cli::parse_from(["nostalgia", "dl", "folder", "file.mp4"]);
        assert!(matches!(cli.command, Command::Download(_)));

        let cli = Cli::parse_from(["nostalgia", "fav", "ls"]);
        assert!(matches!(cli.command, Command::Favorites(FavoritesCmd::List)));

        let cli = Cli::parse_from(["nostalgia", "wl", "rm", "a"]);
        assert!(matches!(cli.command, Command::Watchlist(WatchlistCmd::Remove(_))));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["nostalgia", "theme", "matrix", "-j", "-c", "/tmp/n.toml"]);
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/n.toml")));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["nostalgia"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(CliExitCode::Success), 0);
        assert_eq!(i32::from(CliExitCode::DownloadFailed), 4);
    }
}

// =============================================================================
// JSON Output Tests
// =============================================================================

mod json_output {
    use nostalgia::cli::{ExitCode, JsonOutput, StatusOk};

    #[test]
    fn test_json_output_success() {
        let output = JsonOutput::success(vec!["a", "b"]);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json, serde_json::json!({ "data": ["a", "b"] }));
    }

    #[test]
    fn test_json_output_error() {
        let output = JsonOutput::<()>::error_msg("boom", ExitCode::NetworkError);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "boom", "exit_code": 3 }));
    }

    #[test]
    fn test_status_ok_format() {
        let json = serde_json::to_string(&StatusOk::default()).unwrap();
        assert_eq!(json, r#"{"status":"ok"}"#);
    }
}

// =============================================================================
// Session Tests
// =============================================================================

mod session {
    use async_trait::async_trait;
    use std::sync::Arc;

    use nostalgia::config::Config;
    use nostalgia::download::{FileTransfer, HttpTransfer, ProgressHub};
    use nostalgia::notifications::{
        Channel, ConsoleNotifier, Notification, NotificationError, NotificationService,
        PermissionState,
    };
    use nostalgia::storage::{KeyValueStorage, MemoryStorage};
    use nostalgia::Session;

    /// Notification service that fails every call
    struct BrokenNotifier;

    #[async_trait]
    impl NotificationService for BrokenNotifier {
        async fn list_channels(&self) -> Result<Vec<Channel>, NotificationError> {
            Err(NotificationError::Unavailable("no bus".into()))
        }
        async fn create_channel(&self, _channel: Channel) -> Result<(), NotificationError> {
            Err(NotificationError::Unavailable("no bus".into()))
        }
        async fn request_permission(&self) -> Result<PermissionState, NotificationError> {
            Err(NotificationError::PermissionDenied)
        }
        async fn schedule(&self, _n: Vec<Notification>) -> Result<(), NotificationError> {
            Err(NotificationError::Unavailable("no bus".into()))
        }
    }

    fn services() -> (Arc<dyn KeyValueStorage>, Arc<dyn FileTransfer>) {
        (
            Arc::new(MemoryStorage::new()),
            Arc::new(HttpTransfer::new(ProgressHub::new())),
        )
    }

    #[test]
    fn test_session_creates_notification_channel() {
        let notifier = Arc::new(ConsoleNotifier::new());
        let (storage, transfer) = services();

        let session = tokio_test::block_on(Session::with_services(
            Config::default(),
            storage,
            transfer,
            notifier.clone(),
        ))
        .unwrap();

        let channels = tokio_test::block_on(notifier.list_channels()).unwrap();
        assert_eq!(channels.len(), 1);
        assert!(session.notifications.is_some());
        assert!(session.downloads.tasks().is_empty());
        assert!(session.auth.user().is_none());
        session.shutdown();
    }

    #[test]
    fn test_session_without_notifications() {
        let notifier = Arc::new(ConsoleNotifier::new());
        let (storage, transfer) = services();
        let config = Config {
            notifications: false,
            ..Config::default()
        };

        let session = tokio_test::block_on(Session::with_services(
            config,
            storage,
            transfer,
            notifier.clone(),
        ))
        .unwrap();

        assert!(session.notifications.is_none());
        assert!(tokio_test::block_on(notifier.list_channels()).unwrap().is_empty());
    }

    #[test]
    fn test_broken_notifier_does_not_block_session() {
        let (storage, transfer) = services();
        let session = tokio_test::block_on(Session::with_services(
            Config::default(),
            storage.clone(),
            transfer,
            Arc::new(BrokenNotifier),
        ))
        .unwrap();

        let bridge = session.notifications.clone().unwrap();
        tokio_test::block_on(bridge.show_progress(1, "Ep", 10));
        tokio_test::block_on(bridge.show_complete(1, "Ep", false));

        session.favorites.add(nostalgia::FavoriteItem {
            code: "a".into(),
            name: "A".into(),
            poster: String::new(),
        });
        assert!(storage.get("user_favorites").is_some());
    }
}

// =============================================================================
// Command Handler Tests
// =============================================================================

mod handlers {
    use nostalgia::cli::{
        DownloadCmd, ExitCode, FavoriteAddCmd, FavoritesCmd, HistoryCmd, HistorySetCmd, Output,
        ThemeCmd,
    };
    use nostalgia::commands;
    use nostalgia::config::Config;
    use nostalgia::models::Theme;
    use nostalgia::storage::{FileStorage, KeyValueStorage};

    fn output() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    fn config(dir: &tempfile::TempDir) -> Config {
        Config {
            data_dir: Some(dir.path().to_path_buf()),
            notifications: false,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_favorites_add_persists() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = FavoritesCmd::Add(FavoriteAddCmd {
            code: "cdz".into(),
            name: "Cavaleiros".into(),
            poster: String::new(),
        });

        let code = commands::favorites_cmd(cmd, config(&dir), &output()).await;
        assert_eq!(code, ExitCode::Success);

        let storage = FileStorage::open(config(&dir).storage_path());
        let raw = storage.get("user_favorites").unwrap();
        assert!(raw.contains("\"cdz\""));
    }

    #[tokio::test]
    async fn test_history_set_validates_duration() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = HistoryCmd::Set(HistorySetCmd {
            code: "ep1".into(),
            current_time: 10.0,
            duration: 0.0,
        });

        let code = commands::history_cmd(cmd, config(&dir), &output()).await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_history_set_rejects_non_finite_time() {
        let dir = tempfile::tempdir().unwrap();
        for (current_time, duration) in [(f64::NAN, 100.0), (10.0, f64::INFINITY)] {
            let cmd = HistoryCmd::Set(HistorySetCmd {
                code: "ep1".into(),
                current_time,
                duration,
            });
            let code = commands::history_cmd(cmd, config(&dir), &output()).await;
            assert_eq!(code, ExitCode::InvalidArgs);
        }
        assert!(!config(&dir).storage_path().exists());
    }

    #[tokio::test]
    async fn test_theme_set_and_reject_unknown() {
        let dir = tempfile::tempdir().unwrap();

        let code = commands::theme_cmd(
            ThemeCmd {
                name: Some("Matrix".into()),
            },
            config(&dir),
            &output(),
        )
        .await;
        assert_eq!(code, ExitCode::Success);

        let storage = FileStorage::open(config(&dir).storage_path());
        let theme: Theme = serde_json::from_str(&storage.get("theme").unwrap()).unwrap();
        assert_eq!(theme, Theme::Matrix);

        let code = commands::theme_cmd(
            ThemeCmd {
                name: Some("sepia".into()),
            },
            config(&dir),
            &output(),
        )
        .await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_download_reports_partial_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/midia/cavaleiros/ep01.mp4")
            .with_status(200)
            .with_body("video bytes")
            .create_async()
            .await;
        server
            .mock("GET", "/midia/cavaleiros/ep02.mp4")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            server_url: Some(server.url()),
            ..config(&dir)
        };
        let cmd = DownloadCmd {
            folder: "cavaleiros".into(),
            files: vec!["ep01.mp4".into(), "ep02.mp4".into()],
            show_name: None,
            code: None,
            title: None,
            poster: None,
        };

        let code = commands::download_cmd(cmd, config, &output()).await;

        assert_eq!(code, ExitCode::DownloadFailed);
        let downloads = dir.path().join("downloads").join("cavaleiros");
        assert_eq!(
            std::fs::read_to_string(downloads.join("ep01.mp4")).unwrap(),
            "video bytes"
        );
        assert!(!downloads.join("ep02.mp4").exists());
    }

    #[tokio::test]
    async fn test_download_without_server_url() {
        if std::env::var(nostalgia::config::SERVER_URL_ENV).is_ok() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let cmd = DownloadCmd {
            folder: "cavaleiros".into(),
            files: vec!["ep01.mp4".into()],
            show_name: None,
            code: None,
            title: None,
            poster: None,
        };

        let code = commands::download_cmd(cmd, config(&dir), &output()).await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }
}
