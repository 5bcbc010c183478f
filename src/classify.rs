//! Maps raw transport outcomes into exactly one [`ClassifiedError`].
//!
//! Only [`ErrorKind::AuthExpired`] is retryable: refreshing the credential is the one remedy this
//! layer controls. Everything else is terminal here and left to the caller.

// crates.io
use http::StatusCode;
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	error::{ClassifiedError, ErrorKind, TransportError},
	session::{Notice, NoticeKind},
	transport::ApiResponse,
};

/// Raw failed outcome handed to [`classify`].
#[derive(Debug)]
pub enum Failure {
	/// The transport produced no response at all.
	NoResponse(TransportError),
	/// The server responded with a non-success status.
	Status(ApiResponse),
}

const NETWORK_MESSAGE: &str = "Network unavailable. Check your connection and try again.";
const UNAUTHORIZED_MESSAGE: &str = "Authentication required.";
const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
const NOT_FOUND_MESSAGE: &str = "The requested resource was not found.";
const SERVER_MESSAGE: &str = "The server encountered an error. Please try again later.";

/// Classifies a failed outcome.
pub fn classify(failure: Failure) -> ClassifiedError {
	let response = match failure {
		Failure::NoResponse(err) => {
			let message = match err {
				TransportError::Timeout { .. } => "Request timed out. Please try again.",
				_ => NETWORK_MESSAGE,
			};

			return ClassifiedError::new(ErrorKind::NetworkError, message).with_cause(err);
		},
		Failure::Status(response) => response,
	};
	let status = response.status();
	let err = match status {
		StatusCode::UNAUTHORIZED => ClassifiedError::new(ErrorKind::AuthExpired, UNAUTHORIZED_MESSAGE),
		StatusCode::FORBIDDEN => ClassifiedError::new(ErrorKind::Forbidden, FORBIDDEN_MESSAGE),
		StatusCode::NOT_FOUND => ClassifiedError::new(ErrorKind::NotFound, NOT_FOUND_MESSAGE),
		s if s.is_server_error() => ClassifiedError::new(ErrorKind::ServerError, SERVER_MESSAGE),
		s => business_error(s, &response),
	};

	err.with_status(status.as_u16())
}

/// Returns the user-facing notice a failure should raise, if any.
///
/// Network, forbidden, and server failures notify globally; not-found, business, and auth
/// failures are left for the calling screen (auth expiry notifies only through logout).
pub fn notice_for(err: &ClassifiedError) -> Option<Notice> {
	let kind = match err.kind() {
		ErrorKind::NetworkError => NoticeKind::Network,
		ErrorKind::Forbidden => NoticeKind::Forbidden,
		ErrorKind::ServerError => NoticeKind::Server,
		ErrorKind::AuthExpired | ErrorKind::NotFound | ErrorKind::BusinessError => return None,
	};

	Some(Notice::new(kind, err.message()))
}

fn business_error(status: StatusCode, response: &ApiResponse) -> ClassifiedError {
	let body = serde_json::from_slice::<Value>(response.bytes()).ok();
	let fields = body.as_ref().and_then(Value::as_object);
	let message = fields
		.and_then(server_message)
		.unwrap_or_else(|| format!("Request failed with status {}.", status.as_u16()));
	let err = ClassifiedError::new(ErrorKind::BusinessError, message);

	match fields.and_then(server_code) {
		Some(code) => err.with_code(code),
		None => err,
	}
}

fn server_message(fields: &Map<String, Value>) -> Option<String> {
	["message", "msg", "error"]
		.iter()
		.find_map(|key| fields.get(*key).and_then(Value::as_str))
		.filter(|message| !message.trim().is_empty())
		.map(str::to_owned)
}

fn server_code(fields: &Map<String, Value>) -> Option<String> {
	match fields.get("code")? {
		Value::String(code) => Some(code.clone()),
		Value::Number(code) => Some(code.to_string()),
		_ => None,
	}
}
