// crates.io
use http::Method;
// self
use crate::{
	_prelude::*,
	error::ErrorKind,
	obs::CycleOutcome,
	session::Notice,
	store::StoreError,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// Span wrapping either one caller request (replay included) or one refresh cycle.
#[derive(Clone, Debug)]
pub struct RelaySpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RelaySpan {
	/// Opens a `session_relay.request` span for `method` on `path`.
	///
	/// Only the path is recorded; query strings may carry caller data.
	pub fn request(method: &Method, path: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("session_relay.request", method = %method, path);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, path);

			Self {}
		}
	}

	/// Opens a `session_relay.refresh` span for the `cycle`-th refresh of this client.
	pub fn refresh(cycle: u64) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("session_relay.refresh", cycle);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = cycle;

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn token_lookup_failed(err: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %err, "token lookup failed; sending request without credentials");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = err;
	}
}

pub(crate) fn store_write_failed(action: &'static str, err: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(action, error = %err, "token store write failed; in-memory state proceeds");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (action, err);
	}
}

pub(crate) fn request_failed(kind: ErrorKind, status: Option<u16>) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(kind = kind.as_str(), status, "request failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, status);
	}
}

pub(crate) fn waiter_queued(waiting: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(waiting, "request queued behind in-flight refresh");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = waiting;
	}
}

pub(crate) fn cycle_settled(outcome: CycleOutcome, drained: usize) {
	#[cfg(feature = "tracing")]
	{
		match outcome {
			CycleOutcome::Refreshed =>
				tracing::debug!(outcome = outcome.as_str(), drained, "refresh cycle closed; waiters resumed"),
			CycleOutcome::Failed | CycleOutcome::Abandoned =>
				tracing::warn!(outcome = outcome.as_str(), drained, "refresh cycle closed; waiters rejected"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (outcome, drained);
	}
}

pub(crate) fn notice_emitted(notice: &Notice) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(kind = notice.kind.as_str(), message = %notice.message, "user notice emitted");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = notice;
	}
}
