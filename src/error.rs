//! Client-level error types shared across the decorator, classifier, coordinator, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Request failed and was classified into the fixed failure taxonomy.
	#[error(transparent)]
	Classified(#[from] ClassifiedError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Response body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure, including the JSON path that failed.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns the failure kind when the error came from a classified request failure.
	pub fn kind(&self) -> Option<ErrorKind> {
		match self {
			Self::Classified(e) => Some(e.kind()),
			_ => None,
		}
	}

	/// Returns the classified failure, if any.
	pub fn as_classified(&self) -> Option<&ClassifiedError> {
		match self {
			Self::Classified(e) => Some(e),
			_ => None,
		}
	}
}

/// Fixed taxonomy every failed request is mapped into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	/// No response was received (connect, TLS, timeout, IO).
	NetworkError,
	/// HTTP 401; the only kind eligible for refresh-and-retry.
	AuthExpired,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
	/// HTTP 5xx.
	ServerError,
	/// Any other non-success status.
	BusinessError,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::NetworkError => "NETWORK_ERROR",
			Self::AuthExpired => "AUTH_EXPIRED",
			Self::Forbidden => "FORBIDDEN",
			Self::NotFound => "NOT_FOUND",
			Self::ServerError => "SERVER_ERROR",
			Self::BusinessError => "BUSINESS_ERROR",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Phase of an [`ErrorKind::AuthExpired`] failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthExpiry {
	/// First 401 for a request; the coordinator may still recover it.
	Unauthorized,
	/// The request was already replayed once and the server rejected it again.
	RetryRejected,
	/// The refresh cycle failed and the session was torn down.
	SessionExpired,
}

/// Normalized failure produced by the classifier, decoupled from the transport's shape.
#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct ClassifiedError {
	kind: ErrorKind,
	message: String,
	status: Option<u16>,
	code: Option<String>,
	expiry: Option<AuthExpiry>,
	#[source]
	cause: Option<BoxError>,
}
impl ClassifiedError {
	/// Message used for every request rejected by a failed refresh cycle.
	pub const SESSION_EXPIRED_MESSAGE: &'static str = "Session expired. Please sign in again.";

	/// Creates an error of the given kind with a user-facing message.
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		let expiry = matches!(kind, ErrorKind::AuthExpired).then_some(AuthExpiry::Unauthorized);

		Self { kind, message: message.into(), status: None, code: None, expiry, cause: None }
	}

	/// Builds the uniform rejection handed to every request of a failed refresh cycle.
	pub fn session_expired() -> Self {
		Self::new(ErrorKind::AuthExpired, Self::SESSION_EXPIRED_MESSAGE)
			.with_expiry(AuthExpiry::SessionExpired)
	}

	/// Attaches the HTTP status that produced the failure.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Attaches a server-provided business code.
	pub fn with_code(mut self, code: impl Into<String>) -> Self {
		self.code = Some(code.into());

		self
	}

	/// Attaches the underlying cause.
	pub fn with_cause(mut self, cause: impl 'static + Send + Sync + StdError) -> Self {
		self.cause = Some(Box::new(cause));

		self
	}

	pub(crate) fn with_expiry(mut self, expiry: AuthExpiry) -> Self {
		if matches!(self.kind, ErrorKind::AuthExpired) {
			self.expiry = Some(expiry);
		}

		self
	}

	/// Returns the taxonomy entry.
	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	/// Returns the user-facing message.
	pub fn message(&self) -> &str {
		&self.message
	}

	/// Returns the HTTP status, when a response was received.
	pub fn status(&self) -> Option<u16> {
		self.status
	}

	/// Returns the server-provided business code, when one was supplied.
	pub fn code(&self) -> Option<&str> {
		self.code.as_deref()
	}

	/// Returns the auth-expiry phase for [`ErrorKind::AuthExpired`] failures.
	pub fn expiry(&self) -> Option<AuthExpiry> {
		self.expiry
	}

	/// Returns `true` if the failure ended the session.
	pub fn is_session_expired(&self) -> bool {
		matches!(self.expiry, Some(AuthExpiry::SessionExpired))
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A relative path could not be joined onto the base URL.
	#[error("Path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied by the caller.
		name: String,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Body(#[source] serde_json::Error),
	/// Config document could not be parsed.
	#[error("Client config could not be parsed.")]
	Parse(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// Config document parsed but failed validation.
	#[error(transparent)]
	Invalid(#[from] crate::config::ClientConfigError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (no response received).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete within the transport timeout.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}
