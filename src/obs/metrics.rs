// self
use crate::{
	error::ErrorKind,
	obs::{self, CycleOutcome},
};

/// Counts one finished [`AuthClient::send`](crate::client::AuthClient::send) call.
///
/// `failure` is `None` for a success response; `replayed` marks requests that went out a second
/// time with a refreshed token.
pub fn record_request(failure: Option<ErrorKind>, replayed: bool) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"session_relay_requests_total",
			"outcome" => obs::request_outcome_label(failure),
			"replayed" => if replayed { "true" } else { "false" }
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (obs::request_outcome_label(failure), replayed);
	}
}

/// Counts one closed refresh cycle and the number of queued requests it settled.
pub fn record_cycle(outcome: CycleOutcome, drained: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("session_relay_refresh_cycles_total", "outcome" => outcome.as_str())
			.increment(1);
		metrics::histogram!("session_relay_refresh_drained", "outcome" => outcome.as_str())
			.record(drained as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (outcome, drained);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_a_noop() {
		record_request(None, false);
		record_request(Some(ErrorKind::AuthExpired), true);
		record_cycle(CycleOutcome::Failed, 3);
		record_cycle(CycleOutcome::Abandoned, 0);
	}
}
