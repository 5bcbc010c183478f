//! Storage contracts and built-in store implementations for the session's token pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenPair};

/// Boxed future returned by every [`TokenStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persisted key-value storage for the current session's credentials.
///
/// Every operation is async and fallible. The client only ever writes through the
/// refresh path or the logout path, so implementations need no cross-call coordination.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Reads the current token pair, if one is stored.
	fn get(&self) -> StoreFuture<'_, Option<TokenPair>>;

	/// Persists or replaces the current token pair.
	fn set(&self, token: TokenPair) -> StoreFuture<'_, ()>;

	/// Removes any stored credentials.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_messages_include_payload() {
		let err = StoreError::Backend { message: "keychain locked".into() };

		assert_eq!(err.to_string(), "Backend failure: keychain locked.");

		let err = StoreError::Serialization { message: "bad json".into() };

		assert!(err.to_string().contains("bad json"));
	}

	#[test]
	fn store_error_can_be_serialized() {
		let payload = serde_json::to_string(&StoreError::Backend { message: "down".into() })
			.expect("StoreError should serialize to JSON.");
		let round_trip: StoreError =
			serde_json::from_str(&payload).expect("Serialized error should deserialize.");

		assert_eq!(round_trip, StoreError::Backend { message: "down".into() });
	}
}
