//! Client facade wiring the decorator, transport, classifier, and refresh coordinator together.

// crates.io
use http::Method;
// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	classify::{self, Failure},
	config::ClientConfig,
	decorate::RequestDecorator,
	error::{AuthExpiry, ClassifiedError, ErrorKind},
	obs::{self, RelaySpan},
	refresh::{HttpRefresher, RefreshCoordinator, TokenRefresher},
	session::{SessionController, StoreSession},
	store::TokenStore,
	transport::{ApiRequest, ApiResponse, HttpTransport},
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestAuthClient = AuthClient<ReqwestTransport, HttpRefresher<ReqwestTransport>>;

/// Sends requests with the session's bearer token and recovers from expired credentials.
///
/// Every request is decorated with the session's access token and dispatched through the
/// transport. Success responses come back untouched. Failures are classified; only an
/// auth-expiry failure enters the [`RefreshCoordinator`], and each request is replayed at most
/// once with the refreshed token. All other failures, and a second auth-expiry failure on the
/// replay, surface to the caller without touching the session.
pub struct AuthClient<T, R = HttpRefresher<T>>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + TokenRefresher,
{
	config: ClientConfig,
	transport: Arc<T>,
	refresher: Arc<R>,
	store: Arc<dyn TokenStore>,
	session: Arc<dyn SessionController>,
	decorator: RequestDecorator,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> AuthClient<T, HttpRefresher<T>>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that refreshes against the configured refresh endpoint over the same
	/// transport and persists sessions through a [`StoreSession`] on `store`.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn TokenStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self> {
		let transport = transport.into();
		let refresher = HttpRefresher::new(transport.clone(), config.refresh_url()?);

		Ok(Self::with_refresher(config, store, transport, refresher))
	}
}
#[cfg(feature = "reqwest")]
impl AuthClient<ReqwestTransport, HttpRefresher<ReqwestTransport>> {
	/// Creates a client with a reqwest transport built from `config`.
	pub fn with_reqwest(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Self::new(config, store, transport)
	}
}
impl<T, R> AuthClient<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + TokenRefresher,
{
	/// Creates a client from caller-provided parts.
	pub fn with_refresher(
		config: ClientConfig,
		store: Arc<dyn TokenStore>,
		transport: impl Into<Arc<T>>,
		refresher: impl Into<Arc<R>>,
	) -> Self {
		let session: Arc<dyn SessionController> = Arc::new(StoreSession::new(store.clone()));
		let decorator = RequestDecorator::new(store.clone(), config.auth_scheme.clone());

		Self {
			coordinator: Arc::new(RefreshCoordinator::new(session.clone())),
			config,
			transport: transport.into(),
			refresher: refresher.into(),
			store,
			session,
			decorator,
		}
	}

	/// Replaces the session controller.
	///
	/// Starts a fresh coordinator bound to the new controller; call this before sending.
	pub fn with_session(mut self, session: Arc<dyn SessionController>) -> Self {
		self.coordinator = Arc::new(RefreshCoordinator::new(session.clone()));
		self.session = session;

		self
	}

	/// Builds a request for `path` relative to the configured base URL.
	pub fn request(&self, method: Method, path: &str) -> Result<ApiRequest> {
		Ok(ApiRequest::new(method, self.config.endpoint(path)?))
	}

	/// Sends `request`, recovering once from an expired credential.
	pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		let span = RelaySpan::request(request.method(), request.url().path());
		let outcome = span.instrument(self.dispatch(&mut request)).await;

		obs::record_request(outcome.as_ref().err().map(ClassifiedError::kind), request.is_retried());

		Ok(outcome?)
	}

	/// Starts a session with a token obtained outside the refresh path (e.g. after login).
	///
	/// The token is used by every later request even if persisting it fails.
	pub async fn sign_in(&self, token: TokenPair) {
		self.decorator.adopt(token.clone());

		if let Err(e) = self.store.set(token).await {
			obs::store_write_failed("set", &e);
		}
	}

	/// Ends the session without notifying the UI (user-initiated logout).
	pub async fn sign_out(&self) {
		self.decorator.forget();

		if let Err(e) = self.store.clear().await {
			obs::store_write_failed("clear", &e);
		}
	}

	/// Active configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Token store backing the session.
	///
	/// Once a token has been adopted in memory, writing to the store directly does not replace
	/// it; use [`AuthClient::sign_in`] instead.
	pub fn store(&self) -> &Arc<dyn TokenStore> {
		&self.store
	}

	/// Refresh coordinator shared by every request of this client.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	async fn dispatch(&self, request: &mut ApiRequest) -> Result<ApiResponse, ClassifiedError> {
		self.decorator.decorate(request).await;

		loop {
			let failure = match self.transport.execute(request).await {
				Ok(response) if response.is_success() => return Ok(response),
				Ok(response) => Failure::Status(response),
				Err(e) => Failure::NoResponse(e),
			};
			let err = classify::classify(failure);

			obs::request_failed(err.kind(), err.status());

			if let Some(notice) = classify::notice_for(&err) {
				self.session.notify(notice);
			}
			if err.kind() != ErrorKind::AuthExpired {
				return Err(err);
			}
			if request.is_retried() {
				return Err(err.with_expiry(AuthExpiry::RetryRejected));
			}

			request.mark_retried();

			let token = self.coordinator.recover(|| self.refresh_session()).await?;

			self.decorator.apply(request, &token);
		}
	}

	/// Leader-only refresh call. The outcome is adopted (or dropped) in memory before the
	/// coordinator hands it to the session controller, so a store that cannot persist the
	/// new token does not send later requests back out with the expired one.
	async fn refresh_session(&self) -> Result<TokenPair, ClassifiedError> {
		let current = match self.decorator.current().await {
			Ok(current) => current,
			Err(e) => {
				obs::token_lookup_failed(&e);

				None
			},
		};

		match self.refresher.refresh(current.as_ref()).await {
			Ok(token) => {
				self.decorator.adopt(token.clone());

				Ok(token)
			},
			Err(e) => {
				self.decorator.forget();

				Err(e)
			},
		}
	}
}
impl<T, R> Clone for AuthClient<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + TokenRefresher,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			refresher: self.refresher.clone(),
			store: self.store.clone(),
			session: self.session.clone(),
			decorator: self.decorator.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T, R> Debug for AuthClient<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + TokenRefresher,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient")
			.field("config", &self.config)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}
