//! Single-flight token refresh with a waiter queue.
//!
//! [`RefreshCoordinator`] guarantees at most one in-flight refresh per client. The first
//! request to hit an expired token becomes the cycle's leader and performs the refresh; every
//! request that expires while the cycle is open parks a [`oneshot`] handle in the waiter queue.
//! When the refresh settles the queue is drained exactly once: each handle is resolved with the
//! same new token, or rejected uniformly when the refresh failed, and the state returns to idle
//! so the next expiry starts a fresh cycle.
//!
//! A failed cycle stays open while the session controller tears the session down; requests
//! that expire during the teardown join the failed cycle instead of starting another refresh
//! with credentials that are being revoked.
//!
//! The idle/refreshing check and the transition (or the enqueue) happen under one lock
//! acquisition with no `.await` in between.

mod endpoint;
mod metrics;

pub use endpoint::*;
pub use metrics::RefreshMetrics;

// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	error::ClassifiedError,
	obs::{self, CycleOutcome, RelaySpan},
	session::SessionController,
};

type Settlement = std::result::Result<TokenPair, CycleFailed>;

#[derive(Clone, Copy, Debug)]
struct CycleFailed;

enum RefreshState {
	Idle,
	Refreshing { waiters: Vec<oneshot::Sender<Settlement>> },
}

enum Ticket<'a> {
	Leader(CycleGuard<'a>),
	Waiter(oneshot::Receiver<Settlement>),
}

/// Coalesces concurrent auth-expiry failures onto one refresh call.
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	session: Arc<dyn SessionController>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator reporting cycle outcomes to `session`.
	pub fn new(session: Arc<dyn SessionController>) -> Self {
		Self { state: Mutex::new(RefreshState::Idle), session, metrics: Default::default() }
	}

	/// Obtains a fresh token for a request that just failed with an expired credential.
	///
	/// Starts a cycle running `refresh` when idle, or waits on the open cycle otherwise; in
	/// both cases every caller of one cycle observes the same outcome. On success the token is
	/// handed to the session controller before any waiter resumes. On failure every waiter and
	/// the leader get a session-expired error and the session controller's logout path runs
	/// once for the cycle; the cycle closes only after that logout completes.
	pub async fn recover<F, Fut>(&self, refresh: F) -> Result<TokenPair, ClassifiedError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<TokenPair, ClassifiedError>>,
	{
		let mut guard = match self.enter() {
			Ticket::Waiter(handle) => return Self::wait(handle).await,
			Ticket::Leader(guard) => guard,
		};
		let span = RelaySpan::refresh(self.metrics.cycles());

		match span.instrument(refresh()).await {
			Ok(token) => {
				span.instrument(self.session.on_refreshed(&token)).await;
				guard.close(Ok(token.clone()), CycleOutcome::Refreshed);
				self.metrics.record_success();

				Ok(token)
			},
			Err(e) => {
				guard.reject_waiters();
				span.instrument(self.session.on_refresh_failed()).await;
				guard.close(Err(CycleFailed), CycleOutcome::Failed);
				self.metrics.record_failure();

				Err(ClassifiedError::session_expired().with_cause(e))
			},
		}
	}

	/// Returns `true` while a refresh cycle is open.
	pub fn is_refreshing(&self) -> bool {
		matches!(*self.state.lock(), RefreshState::Refreshing { .. })
	}

	/// Number of requests currently parked behind the open cycle.
	pub fn waiting(&self) -> usize {
		match &*self.state.lock() {
			RefreshState::Idle => 0,
			RefreshState::Refreshing { waiters } => waiters.len(),
		}
	}

	/// Cycle counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	fn enter(&self) -> Ticket<'_> {
		let mut state = self.state.lock();

		match &mut *state {
			RefreshState::Idle => {
				*state = RefreshState::Refreshing { waiters: Vec::new() };

				self.metrics.record_cycle();

				Ticket::Leader(CycleGuard { coordinator: self, drained: 0, closed: false })
			},
			RefreshState::Refreshing { waiters } => {
				let (tx, rx) = oneshot::channel();

				waiters.push(tx);
				self.metrics.record_queued();
				obs::waiter_queued(waiters.len());

				Ticket::Waiter(rx)
			},
		}
	}

	/// Hands `outcome` to every queued waiter. With `close` the state returns to idle in the
	/// same lock acquisition; otherwise the cycle stays open with an empty queue.
	fn drain(&self, outcome: &Settlement, close: bool) -> usize {
		let waiters = {
			let mut state = self.state.lock();

			if close {
				match std::mem::replace(&mut *state, RefreshState::Idle) {
					RefreshState::Refreshing { waiters } => waiters,
					RefreshState::Idle => Vec::new(),
				}
			} else if let RefreshState::Refreshing { waiters } = &mut *state {
				std::mem::take(waiters)
			} else {
				Vec::new()
			}
		};
		let drained = waiters.len();

		for waiter in waiters {
			// A waiter whose request future was dropped simply misses the outcome.
			let _ = waiter.send(outcome.clone());
		}

		drained
	}

	async fn wait(handle: oneshot::Receiver<Settlement>) -> Result<TokenPair, ClassifiedError> {
		match handle.await {
			Ok(Ok(token)) => Ok(token),
			Ok(Err(CycleFailed)) | Err(_) => Err(ClassifiedError::session_expired()),
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("refreshing", &self.is_refreshing())
			.field("waiting", &self.waiting())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Closes the leader's cycle exactly once, abandoning it if the leader is dropped first.
struct CycleGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	drained: usize,
	closed: bool,
}
impl CycleGuard<'_> {
	/// Rejects everyone queued so far while keeping the cycle open.
	fn reject_waiters(&mut self) {
		self.drained += self.coordinator.drain(&Err(CycleFailed), false);
	}

	fn close(&mut self, outcome: Settlement, ending: CycleOutcome) {
		if self.closed {
			return;
		}

		self.closed = true;
		self.drained += self.coordinator.drain(&outcome, true);

		obs::cycle_settled(ending, self.drained);
		obs::record_cycle(ending, self.drained);
	}
}
impl Drop for CycleGuard<'_> {
	fn drop(&mut self) {
		self.close(Err(CycleFailed), CycleOutcome::Abandoned);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	// crates.io
	use tokio::sync::Semaphore;
	// self
	use super::*;
	use crate::{
		error::ErrorKind,
		session::{Notice, SessionFuture},
	};

	#[derive(Default)]
	struct CountingSession {
		refreshed: AtomicUsize,
		failed: AtomicUsize,
	}
	impl SessionController for CountingSession {
		fn on_refreshed<'a>(&'a self, _token: &'a TokenPair) -> SessionFuture<'a> {
			self.refreshed.fetch_add(1, Ordering::SeqCst);

			Box::pin(async {})
		}

		fn on_refresh_failed(&self) -> SessionFuture<'_> {
			self.failed.fetch_add(1, Ordering::SeqCst);

			Box::pin(async {})
		}

		fn notify(&self, _notice: Notice) {}
	}

	/// Logout parks until the test releases it.
	struct SlowLogout {
		release: Semaphore,
		tearing_down: AtomicBool,
		failed: AtomicUsize,
	}
	impl SessionController for SlowLogout {
		fn on_refreshed<'a>(&'a self, _token: &'a TokenPair) -> SessionFuture<'a> {
			Box::pin(async {})
		}

		fn on_refresh_failed(&self) -> SessionFuture<'_> {
			Box::pin(async move {
				self.tearing_down.store(true, Ordering::SeqCst);

				let _permit = self.release.acquire().await.expect("Release gate should stay open.");

				self.failed.fetch_add(1, Ordering::SeqCst);
			})
		}

		fn notify(&self, _notice: Notice) {}
	}

	fn revoked(
		coordinator: Arc<RefreshCoordinator>,
		refreshes: Arc<AtomicUsize>,
	) -> tokio::task::JoinHandle<Result<TokenPair, ClassifiedError>> {
		tokio::spawn(async move {
			coordinator
				.recover(move || async move {
					refreshes.fetch_add(1, Ordering::SeqCst);

					Err(ClassifiedError::new(ErrorKind::AuthExpired, "refresh token revoked"))
				})
				.await
		})
	}

	fn coordinator() -> (Arc<RefreshCoordinator>, Arc<CountingSession>) {
		let session = Arc::new(CountingSession::default());

		(Arc::new(RefreshCoordinator::new(session.clone())), session)
	}

	#[test]
	fn enter_is_single_flight() {
		let (coordinator, _) = coordinator();
		let first = coordinator.enter();
		let second = coordinator.enter();
		let third = coordinator.enter();

		assert!(matches!(first, Ticket::Leader(_)));
		assert!(matches!(second, Ticket::Waiter(_)));
		assert!(matches!(third, Ticket::Waiter(_)));
		assert_eq!(coordinator.waiting(), 2);
		assert_eq!(coordinator.metrics().cycles(), 1);
	}

	#[tokio::test]
	async fn dropped_leader_fails_cycle_and_returns_to_idle() {
		let (coordinator, _) = coordinator();
		let leader = coordinator.enter();
		let waiter = match coordinator.enter() {
			Ticket::Waiter(handle) => handle,
			Ticket::Leader(_) => panic!("Second entry must wait on the open cycle."),
		};

		drop(leader);

		let err = RefreshCoordinator::wait(waiter)
			.await
			.expect_err("Waiters of an abandoned cycle must be rejected.");

		assert!(err.is_session_expired());
		assert!(!coordinator.is_refreshing());
		assert_eq!(coordinator.waiting(), 0);
	}

	#[tokio::test]
	async fn success_resolves_leader_and_notifies_session_once() {
		let (coordinator, session) = coordinator();
		let token = coordinator
			.recover(|| async { Ok(TokenPair::new("t2")) })
			.await
			.expect("Refresh should succeed.");

		assert_eq!(token.access_token.expose(), "t2");
		assert_eq!(session.refreshed.load(Ordering::SeqCst), 1);
		assert_eq!(session.failed.load(Ordering::SeqCst), 0);
		assert!(!coordinator.is_refreshing());
		assert_eq!(coordinator.metrics().successes(), 1);
	}

	#[tokio::test]
	async fn failure_wraps_cause_in_session_expired() {
		let (coordinator, session) = coordinator();
		let err = coordinator
			.recover(|| async {
				Err(ClassifiedError::new(ErrorKind::ServerError, "refresh endpoint down"))
			})
			.await
			.expect_err("Refresh failure must reject the leader.");

		assert!(err.is_session_expired());
		assert!(StdError::source(&err).is_some());
		assert_eq!(session.failed.load(Ordering::SeqCst), 1);
		assert_eq!(coordinator.metrics().failures(), 1);
		assert!(!coordinator.is_refreshing());
	}

	#[tokio::test]
	async fn waiters_share_leader_outcome() {
		let (coordinator, session) = coordinator();
		let (release_tx, release_rx) = oneshot::channel::<()>();
		let leader = {
			let coordinator = coordinator.clone();

			tokio::spawn(async move {
				coordinator
					.recover(|| async move {
						let _ = release_rx.await;

						Ok(TokenPair::new("shared"))
					})
					.await
			})
		};

		while !coordinator.is_refreshing() {
			tokio::task::yield_now().await;
		}

		let waiters: Vec<_> = (0..3)
			.map(|_| {
				let coordinator = coordinator.clone();

				tokio::spawn(async move {
					coordinator
						.recover(|| async {
							Err(ClassifiedError::new(ErrorKind::ServerError, "waiters never refresh"))
						})
						.await
				})
			})
			.collect();

		while coordinator.waiting() < 3 {
			tokio::task::yield_now().await;
		}

		release_tx.send(()).expect("Leader should still be waiting for release.");

		let leader_token =
			leader.await.expect("Leader task should not panic.").expect("Leader should succeed.");

		for waiter in waiters {
			let token = waiter
				.await
				.expect("Waiter task should not panic.")
				.expect("Waiter should receive the new token.");

			assert_eq!(token.access_token, leader_token.access_token);
		}

		assert_eq!(coordinator.metrics().cycles(), 1);
		assert_eq!(coordinator.metrics().queued(), 3);
		assert_eq!(session.refreshed.load(Ordering::SeqCst), 1);
		assert_eq!(coordinator.waiting(), 0);
	}

	#[tokio::test]
	async fn expiry_during_teardown_joins_failed_cycle() {
		let session = Arc::new(SlowLogout {
			release: Semaphore::new(0),
			tearing_down: AtomicBool::new(false),
			failed: AtomicUsize::new(0),
		});
		let coordinator = Arc::new(RefreshCoordinator::new(session.clone()));
		let refreshes = Arc::new(AtomicUsize::new(0));
		let leader = revoked(coordinator.clone(), refreshes.clone());

		while !session.tearing_down.load(Ordering::SeqCst) {
			tokio::task::yield_now().await;
		}

		assert!(coordinator.is_refreshing(), "Cycle must stay open until logout completes.");

		let late = revoked(coordinator.clone(), refreshes.clone());

		while coordinator.waiting() < 1 {
			tokio::task::yield_now().await;
		}

		session.release.add_permits(1);

		for handle in [leader, late] {
			let err = handle
				.await
				.expect("Recover task should not panic.")
				.expect_err("Both requests belong to the failed cycle.");

			assert!(err.is_session_expired());
		}

		assert_eq!(refreshes.load(Ordering::SeqCst), 1);
		assert_eq!(session.failed.load(Ordering::SeqCst), 1);
		assert_eq!(coordinator.metrics().cycles(), 1);
		assert_eq!(coordinator.metrics().queued(), 1);
		assert!(!coordinator.is_refreshing());
	}
}
