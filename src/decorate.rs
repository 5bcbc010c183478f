//! Attaches the current access token to outbound requests.

// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	obs,
	store::{StoreError, TokenStore},
	transport::ApiRequest,
};

/// What [`RequestDecorator::decorate`] did to a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoration {
	/// A credential was attached.
	Attached,
	/// No token was stored; the request goes out unauthenticated.
	Anonymous,
	/// The lookup failed or the token is not header-safe; the request goes out without any
	/// `Authorization` header and a required credential surfaces downstream as a 401.
	Degraded,
}

/// Runs before every dispatch and injects `Authorization: <scheme> <access token>`.
///
/// A token adopted in memory (after a refresh or an explicit sign-in) takes precedence over the
/// store, so a store that fails to persist a refreshed token cannot push requests back onto
/// the expired one. Clones share the adopted slot.
#[derive(Clone)]
pub struct RequestDecorator {
	store: Arc<dyn TokenStore>,
	adopted: Arc<RwLock<Option<TokenPair>>>,
	scheme: String,
}
impl RequestDecorator {
	/// Creates a decorator reading from `store` and prefixing tokens with `scheme`.
	pub fn new(store: Arc<dyn TokenStore>, scheme: impl Into<String>) -> Self {
		Self { store, adopted: Default::default(), scheme: scheme.into() }
	}

	/// Current token: the adopted one if any, else whatever the store holds.
	pub async fn current(&self) -> Result<Option<TokenPair>, StoreError> {
		let adopted = self.adopted.read().clone();

		match adopted {
			Some(token) => Ok(Some(token)),
			None => self.store.get().await,
		}
	}

	/// Holds `token` in memory for every later request, regardless of what the store holds.
	pub fn adopt(&self, token: TokenPair) {
		*self.adopted.write() = Some(token);
	}

	/// Drops the adopted token; later requests read the store again.
	pub fn forget(&self) {
		self.adopted.write().take();
	}

	/// Reads the current token and attaches it to `request`.
	///
	/// Never fails: a store error degrades to an unauthenticated request.
	pub async fn decorate(&self, request: &mut ApiRequest) -> Decoration {
		match self.current().await {
			Ok(Some(token)) => self.apply(request, &token),
			Ok(None) => Decoration::Anonymous,
			Err(e) => {
				obs::token_lookup_failed(&e);

				Decoration::Degraded
			},
		}
	}

	/// Attaches `token` without consulting the store; used when replaying with a fresh token.
	pub fn apply(&self, request: &mut ApiRequest, token: &TokenPair) -> Decoration {
		match request.authorize(&self.scheme, &token.access_token) {
			Ok(()) => Decoration::Attached,
			Err(_) => Decoration::Degraded,
		}
	}

	/// Authorization scheme in use.
	pub fn scheme(&self) -> &str {
		&self.scheme
	}
}
impl Debug for RequestDecorator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestDecorator")
			.field("scheme", &self.scheme)
			.field("adopted", &self.adopted.read().is_some())
			.finish()
	}
}
