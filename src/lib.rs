//! Bearer-token HTTP client layer for app backends: token injection, failure classification,
//! single-flight refresh with a waiter queue, bounded replay, and session teardown when the
//! refresh itself fails.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod client;
pub mod config;
pub mod decorate;
pub mod error;
pub mod obs;
pub mod refresh;
pub mod session;
pub mod store;
pub mod transport;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		client::AuthClient,
		config::ClientConfig,
		refresh::HttpRefresher,
		store::{MemoryStore, TokenStore},
		transport::ReqwestTransport,
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = AuthClient<ReqwestTransport, HttpRefresher<ReqwestTransport>>;

	/// Builds a config pointing at `base_url` with a short timeout suited to tests.
	pub fn test_config(base_url: &str) -> ClientConfig {
		let base_url = Url::parse(base_url).expect("Test base URL should parse.");

		ClientConfig::builder(base_url)
			.timeout(Duration::seconds(5))
			.build()
			.expect("Test client config should be valid.")
	}

	/// Constructs an [`AuthClient`] backed by an in-memory store, the default session
	/// controller, and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_client(base_url: &str) -> (ReqwestTestClient, Arc<MemoryStore>) {
		let config = test_config(base_url);
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let transport = ReqwestTransport::from_config(&config)
			.expect("Failed to build Reqwest transport for tests.");
		let client = AuthClient::new(config, store, transport)
			.expect("Failed to build auth client for tests.");

		(client, store_backend)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use http;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
