//! Optional observability for requests and refresh cycles.
//!
//! # Feature Flags
//!
//! - `tracing` (on by default) opens a `session_relay.request` span per [`AuthClient::send`] call
//!   (fields `method`, `path`) and a `session_relay.refresh` span per refresh cycle (field
//!   `cycle`), and emits the warn/debug events raised by the decorator, the coordinator, and the
//!   session controller.
//! - `metrics` increments `session_relay_requests_total` (labels `outcome`, `replayed`) once per
//!   finished request, `session_relay_refresh_cycles_total` (label `outcome`) once per closed
//!   cycle, and records how many queued requests each cycle settled in the
//!   `session_relay_refresh_drained` histogram.
//!
//! [`AuthClient::send`]: crate::client::AuthClient::send

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, error::ErrorKind};

/// How a refresh cycle closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleOutcome {
	/// A new token was adopted and every queued request resumed with it.
	Refreshed,
	/// The refresh failed; queued requests were rejected and the session torn down.
	Failed,
	/// The leading request was dropped before the refresh settled; queued requests were
	/// rejected and the session left as it was.
	Abandoned,
}
impl CycleOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Refreshed => "refreshed",
			Self::Failed => "failed",
			Self::Abandoned => "abandoned",
		}
	}
}
impl Display for CycleOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Metric label for a finished request: `ok`, or the failure's [`ErrorKind`] label.
pub const fn request_outcome_label(failure: Option<ErrorKind>) -> &'static str {
	match failure {
		None => "ok",
		Some(kind) => kind.as_str(),
	}
}
