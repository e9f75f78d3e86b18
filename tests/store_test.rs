//! Store tests
//!
//! Persistence round-trips, resilience to malformed storage, watch history
//! progress rules, favorites de-duplication and preferences.

use std::sync::Arc;

use nostalgia::models::{FavoriteItem, Theme, User};
use nostalgia::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use nostalgia::store::auth::{SESSION_TOKEN_KEY, USER_KEY};
use nostalgia::store::favorites::FAVORITES_KEY;
use nostalgia::store::watch_history::WATCH_HISTORY_KEY;
use nostalgia::store::{
    AddOutcome, AuthStore, FavoritesStore, PersistedStore, Preferences, WatchHistoryStore,
};

fn memory() -> Arc<dyn KeyValueStorage> {
    Arc::new(MemoryStorage::new())
}

fn favorite(code: &str, name: &str) -> FavoriteItem {
    FavoriteItem {
        code: code.to_string(),
        name: name.to_string(),
        poster: format!("/posters/{}.jpg", code),
    }
}

// =============================================================================
// Persisted Store
// =============================================================================

#[test]
fn test_persisted_value_survives_new_store() {
    let storage = memory();
    let store = PersistedStore::new(storage.clone(), "counter", 0u32);
    store.set(41);
    store.update(|n| n + 1);

    let reopened = PersistedStore::new(storage, "counter", 0u32);
    assert_eq!(reopened.get(), 42);
}

#[test]
fn test_malformed_value_falls_back_to_initial() {
    let storage = memory();
    storage.set("list", "{not json").unwrap();

    let store = PersistedStore::new(storage.clone(), "list", vec!["seed".to_string()]);

    assert_eq!(store.get(), vec!["seed".to_string()]);
    // The bad entry was replaced by the initial value
    assert_eq!(storage.get("list").as_deref(), Some(r#"["seed"]"#));
}

#[test]
fn test_wrong_shape_falls_back_to_initial() {
    let storage = memory();
    storage.set("flag", r#"{"a":1}"#).unwrap();

    let store = PersistedStore::new(storage, "flag", false);
    assert!(!store.get());
}

#[test]
fn test_subscribers_see_every_set() {
    let store = PersistedStore::new(memory(), "theme", Theme::Default);
    let mut rx = store.subscribe();

    store.set(Theme::Matrix);
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), Theme::Matrix);
}

#[test]
fn test_file_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("storage.json");

    {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(&path));
        let favorites = FavoritesStore::new(storage);
        favorites.add(favorite("cdz", "Cavaleiros do Zodiaco"));
    }

    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(&path));
    let favorites = FavoritesStore::new(storage);
    assert_eq!(favorites.items(), vec![favorite("cdz", "Cavaleiros do Zodiaco")]);
}

#[test]
fn test_file_storage_corrupted_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    std::fs::write(&path, "not json at all").unwrap();

    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(&path));
    let history = WatchHistoryStore::new(storage.clone());
    assert!(history.all().is_empty());

    history.update_progress("ep1", 30.0, 60.0);
    let reopened = FileStorage::open(&path);
    assert!(reopened.get(WATCH_HISTORY_KEY).is_some());
}

// =============================================================================
// Watch History
// =============================================================================

#[test]
fn test_progress_is_rounded_fraction() {
    let history = WatchHistoryStore::new(memory());
    history.update_progress("ep1", 1.0, 3.0);

    let entry = history.get_progress("ep1").unwrap();
    assert_eq!(entry.code, "ep1");
    assert_eq!(entry.progress, 0.33);
    assert_eq!(entry.duration, 3.0);
    assert!(!entry.is_complete);
    assert!(entry.watched_at > 0);
}

#[test]
fn test_completion_threshold() {
    let history = WatchHistoryStore::new(memory());

    history.update_progress("almost", 1079.0, 1200.0);
    assert_eq!(history.get_progress("almost").unwrap().progress, 0.9);
    assert!(history.get_progress("almost").unwrap().is_complete);

    history.update_progress("not-yet", 1060.0, 1200.0);
    assert_eq!(history.get_progress("not-yet").unwrap().progress, 0.88);
    assert!(!history.get_progress("not-yet").unwrap().is_complete);
}

#[test]
fn test_invalid_updates_are_ignored() {
    let storage = memory();
    let history = WatchHistoryStore::new(storage.clone());
    let mut rx = history.subscribe();
    rx.borrow_and_update();

    history.update_progress("", 10.0, 100.0);
    history.update_progress("ep1", 10.0, 0.0);
    history.update_progress("ep1", 10.0, f64::NAN);
    history.update_progress("ep1", f64::NAN, 100.0);
    history.update_progress("ep1", 10.0, f64::INFINITY);
    history.update_progress("ep1", f64::NEG_INFINITY, 100.0);
    history.update_progress("ep1", f64::MAX, f64::MIN_POSITIVE);

    assert!(history.all().is_empty());
    assert!(!rx.has_changed().unwrap());
    assert_eq!(storage.get(WATCH_HISTORY_KEY).as_deref(), Some("{}"));
}

#[test]
fn test_non_finite_update_keeps_stored_history_readable() {
    let storage = memory();
    let history = WatchHistoryStore::new(storage.clone());
    history.update_progress("good", 300.0, 1200.0);
    history.update_progress("bad", f64::NAN, 1200.0);
    history.update_progress("bad", 10.0, f64::INFINITY);

    let reopened = WatchHistoryStore::new(storage);
    assert_eq!(reopened.get_progress("good").unwrap().progress, 0.25);
    assert!(reopened.get_progress("bad").is_none());
}

#[test]
fn test_update_replaces_entry() {
    let history = WatchHistoryStore::new(memory());
    history.update_progress("ep1", 600.0, 1200.0);
    history.update_progress("ep1", 120.0, 1200.0);

    assert_eq!(history.all().len(), 1);
    assert_eq!(history.get_progress("ep1").unwrap().progress, 0.1);
}

#[test]
fn test_history_stored_as_camel_case_object() {
    let storage = memory();
    let history = WatchHistoryStore::new(storage.clone());
    history.update_progress("ep1", 50.0, 100.0);

    let raw = storage.get(WATCH_HISTORY_KEY).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["ep1"]["progress"], 0.5);
    assert_eq!(value["ep1"]["isComplete"], false);
    assert!(value["ep1"]["watchedAt"].is_i64());
}

// =============================================================================
// Favorites
// =============================================================================

#[test]
fn test_favorites_deduplicate_by_code() {
    let favorites = FavoritesStore::new(memory());

    assert_eq!(favorites.add(favorite("a", "Show A")), AddOutcome::Added);
    assert_eq!(favorites.add(favorite("b", "Show B")), AddOutcome::Added);
    assert_eq!(
        favorites.add(favorite("a", "Renamed A")),
        AddOutcome::AlreadyPresent
    );

    let items = favorites.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "Show A");
    assert_eq!(items[1].code, "b");
}

#[test]
fn test_favorites_notice_text() {
    let item = favorite("a", "Show A");
    assert_eq!(AddOutcome::Added.notice(&item), "\"Show A\" added to favorites!");
    assert_eq!(
        AddOutcome::AlreadyPresent.notice(&item),
        "\"Show A\" is already in your favorites."
    );
}

#[test]
fn test_favorites_remove_missing_still_persists() {
    let storage = memory();
    let favorites = FavoritesStore::new(storage.clone());
    favorites.add(favorite("a", "Show A"));
    storage.remove(FAVORITES_KEY).unwrap();

    favorites.remove("zzz");

    assert_eq!(favorites.items().len(), 1);
    assert!(storage.get(FAVORITES_KEY).is_some());
}

#[test]
fn test_favorites_load_from_storage_is_idempotent() {
    let storage = memory();
    let favorites = FavoritesStore::new(storage.clone());
    storage
        .set(
            FAVORITES_KEY,
            r#"[{"code":"x","name":"X","poster":""},{"code":"y","name":"Y","poster":""}]"#,
        )
        .unwrap();

    favorites.load_from_storage();
    favorites.load_from_storage();

    assert_eq!(favorites.items().len(), 2);
    assert!(favorites.contains("y"));
}

#[test]
fn test_concurrent_adds_of_same_code_keep_one() {
    let storage = memory();
    let favorites = Arc::new(FavoritesStore::new(storage.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let favorites = favorites.clone();
            std::thread::spawn(move || favorites.add(favorite("cdz", "Cavaleiros")))
        })
        .collect();
    let added = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|outcome| *outcome == AddOutcome::Added)
        .count();

    assert_eq!(added, 1);
    assert_eq!(favorites.items().len(), 1);
    let stored: Vec<FavoriteItem> =
        serde_json::from_str(&storage.get(FAVORITES_KEY).unwrap()).unwrap();
    assert_eq!(stored.len(), 1);
}

// =============================================================================
// Auth
// =============================================================================

fn seiya() -> User {
    User {
        id: "u1".to_string(),
        username: "seiya".to_string(),
    }
}

#[test]
fn test_login_persists_session() {
    let storage = memory();
    let auth = AuthStore::new(storage.clone());
    assert!(auth.user().is_none());

    let mut rx = auth.subscribe();
    auth.login(seiya(), "token-123").unwrap();

    assert_eq!(rx.borrow_and_update().as_ref(), Some(&seiya()));
    assert_eq!(storage.get(SESSION_TOKEN_KEY).as_deref(), Some("token-123"));

    let restored = AuthStore::new(storage);
    assert_eq!(restored.user(), Some(seiya()));
    assert_eq!(restored.session_token().as_deref(), Some("token-123"));
}

#[test]
fn test_logout_clears_storage() {
    let storage = memory();
    let auth = AuthStore::new(storage.clone());
    auth.login(seiya(), "token-123").unwrap();

    auth.logout();

    assert!(!auth.is_logged_in());
    assert!(storage.get(USER_KEY).is_none());
    assert!(storage.get(SESSION_TOKEN_KEY).is_none());
    assert!(AuthStore::new(storage).user().is_none());
}

#[test]
fn test_corrupted_user_means_logged_out() {
    let storage = memory();
    storage.set(USER_KEY, "{not json").unwrap();
    storage.set(SESSION_TOKEN_KEY, "token-123").unwrap();

    let auth = AuthStore::new(storage);
    assert!(auth.user().is_none());
    assert!(auth.session_token().is_none());
}

// =============================================================================
// Preferences
// =============================================================================

#[test]
fn test_preferences_defaults_and_keys() {
    let storage = memory();
    let prefs = Preferences::new(storage.clone());

    assert_eq!(prefs.theme.get(), Theme::Default);
    assert!(!prefs.user_has_interacted.get());
    assert_eq!(storage.get("theme").as_deref(), Some("\"default\""));
    assert_eq!(storage.get("userHasInteracted").as_deref(), Some("false"));

    prefs.theme.set(Theme::Nostalgia);
    prefs.user_has_interacted.set(true);

    let reopened = Preferences::new(storage);
    assert_eq!(reopened.theme.get(), Theme::Nostalgia);
    assert!(reopened.user_has_interacted.get());
}

#[tokio::test]
async fn test_profile_picture_data_url() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("avatar.png");
    std::fs::write(&image, [0x89, b'P', b'N', b'G']).unwrap();

    let prefs = Preferences::new(memory());
    assert!(prefs.update_profile_picture(&image).await);
    assert_eq!(
        prefs.profile.get().profile_picture_url.as_deref(),
        Some("data:image/png;base64,iVBORw==")
    );

    assert!(!prefs.update_profile_picture(&dir.path().join("missing.png")).await);
    assert!(prefs.profile.get().profile_picture_url.is_some());
}
