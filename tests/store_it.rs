// std
use std::{env, fs, path::PathBuf, process, sync::Arc};
// crates.io
use time::macros;
// self
use session_relay::{
	auth::TokenPair,
	session::{SessionController, StoreSession},
	store::{FileStore, MemoryStore, TokenStore},
};

fn temp_path(label: &str) -> PathBuf {
	env::temp_dir()
		.join(format!("session_relay_{label}_{}", process::id()))
		.join("session.json")
}

fn token(access: &str, refresh: Option<&str>) -> TokenPair {
	let pair = TokenPair::new(access).with_obtained_at(macros::datetime!(2025-11-10 12:00 UTC));

	match refresh {
		Some(value) => pair.with_refresh_token(value),
		None => pair,
	}
}

#[tokio::test]
async fn memory_store_clones_share_one_slot() {
	let store = MemoryStore::default();
	let handle = store.clone();

	assert!(store.get().await.expect("Reading an empty store should succeed.").is_none());

	handle.set(token("access-1", Some("refresh-1"))).await.expect("Memory writes should succeed.");

	let fetched = store
		.get()
		.await
		.expect("Reading the memory store should succeed.")
		.expect("Clone should observe the write.");

	assert_eq!(fetched, token("access-1", Some("refresh-1")));

	store.clear().await.expect("Clearing the memory store should succeed.");

	assert!(handle.snapshot().is_none());
}

#[tokio::test]
async fn file_store_survives_reopen_and_logout_removes_it() {
	let path = temp_path("reopen");
	let store: Arc<dyn TokenStore> =
		Arc::new(FileStore::open(&path).expect("Opening a fresh file store should succeed."));
	let session = StoreSession::new(store.clone());

	session.sign_in(token("access-1", Some("refresh-1"))).await;
	session.on_refreshed(&token("access-2", Some("refresh-1"))).await;

	let reopened = FileStore::open(&path).expect("Reopening the file store should succeed.");
	let fetched = reopened
		.get()
		.await
		.expect("Reading the reopened store should succeed.")
		.expect("Snapshot should survive reopen.");

	assert_eq!(fetched.access_token.expose(), "access-2");
	assert_eq!(fetched.refresh_secret(), Some("refresh-1"));

	session.on_refresh_failed().await;

	assert!(!path.exists());
	assert!(store.get().await.expect("Read after logout should succeed.").is_none());

	if let Some(dir) = path.parent() {
		fs::remove_dir_all(dir).expect("Failed to remove temporary store directory.");
	}
}
