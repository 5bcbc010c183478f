//! Session controller boundary: adopts refreshed tokens, tears the session down when refresh
//! fails, and forwards user-facing notices to the UI layer.

// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	obs,
	store::TokenStore,
};

/// Boxed future returned by [`SessionController`] hooks.
pub type SessionFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Category of a user-facing notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
	/// No response was received.
	Network,
	/// The server refused the action.
	Forbidden,
	/// The server failed.
	Server,
	/// The refresh cycle failed and the user was signed out.
	SessionExpired,
}
impl NoticeKind {
	/// Returns a stable label suitable for span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Network => "network",
			Self::Forbidden => "forbidden",
			Self::Server => "server",
			Self::SessionExpired => "session_expired",
		}
	}
}

/// Fire-and-forget, non-blocking notification for the UI layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
	/// Notice category.
	pub kind: NoticeKind,
	/// Human-readable message.
	pub message: String,
}
impl Notice {
	/// Creates a notice.
	pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
		Self { kind, message: message.into() }
	}
}

/// Receives the coordinator's cycle outcomes and the classifier's notices.
///
/// `on_refreshed` and `on_refresh_failed` run exactly once per refresh cycle, from the task that
/// performed the refresh. `notify` must not block.
pub trait SessionController
where
	Self: Send + Sync,
{
	/// Persists and adopts a freshly issued token pair.
	fn on_refreshed<'a>(&'a self, token: &'a TokenPair) -> SessionFuture<'a>;

	/// Clears session state and signals the UI that the user was signed out.
	fn on_refresh_failed(&self) -> SessionFuture<'_>;

	/// Surfaces a user-facing notice.
	fn notify(&self, notice: Notice);
}

/// Sink for user-facing notices; closures implement it.
pub trait Notifier
where
	Self: Send + Sync,
{
	/// Delivers `notice` to the UI layer.
	fn notify(&self, notice: &Notice);
}
impl<F> Notifier for F
where
	F: Fn(&Notice) + Send + Sync,
{
	fn notify(&self, notice: &Notice) {
		self(notice)
	}
}

/// Default [`SessionController`] backed by a [`TokenStore`].
///
/// Store write failures are logged and swallowed. The client keeps refreshed tokens in memory
/// on its own, so a failed write only costs persistence across restarts.
pub struct StoreSession {
	store: Arc<dyn TokenStore>,
	notifier: Option<Arc<dyn Notifier>>,
	writes: AsyncMutex<()>,
}
impl StoreSession {
	/// Creates a session controller that persists into `store` and only logs notices.
	pub fn new(store: Arc<dyn TokenStore>) -> Self {
		Self { store, notifier: None, writes: AsyncMutex::new(()) }
	}

	/// Routes notices to `notifier` in addition to the log.
	pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
		self.notifier = Some(notifier);

		self
	}

	/// Persists a token pair.
	///
	/// A running client only picks this up while it has no token adopted in memory; sign in
	/// through [`AuthClient::sign_in`](crate::client::AuthClient::sign_in) instead.
	pub async fn sign_in(&self, token: TokenPair) {
		let _writes = self.writes.lock().await;

		if let Err(e) = self.store.set(token).await {
			obs::store_write_failed("set", &e);
		}
	}

	/// Clears the stored session without notifying the UI.
	pub async fn sign_out(&self) {
		let _writes = self.writes.lock().await;

		if let Err(e) = self.store.clear().await {
			obs::store_write_failed("clear", &e);
		}
	}
}
impl SessionController for StoreSession {
	fn on_refreshed<'a>(&'a self, token: &'a TokenPair) -> SessionFuture<'a> {
		Box::pin(self.sign_in(token.clone()))
	}

	fn on_refresh_failed(&self) -> SessionFuture<'_> {
		Box::pin(async move {
			self.sign_out().await;
			self.notify(Notice::new(
				NoticeKind::SessionExpired,
				crate::error::ClassifiedError::SESSION_EXPIRED_MESSAGE,
			));
		})
	}

	fn notify(&self, notice: Notice) {
		obs::notice_emitted(&notice);

		if let Some(notifier) = self.notifier.as_ref() {
			notifier.notify(&notice);
		}
	}
}
impl Debug for StoreSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StoreSession").field("notifier_set", &self.notifier.is_some()).finish()
	}
}
