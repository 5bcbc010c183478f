//! Refresh endpoint contract and its transport-backed implementation.

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	classify::{self, Failure},
	error::{ClassifiedError, ErrorKind},
	transport::{ApiRequest, HttpTransport},
};

/// Boxed future returned by [`TokenRefresher::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenPair, ClassifiedError>> + 'a + Send>>;

/// Obtains a new token pair from the backend.
///
/// Any error counts as a refresh failure and ends the session; implementations should not
/// retry internally.
pub trait TokenRefresher
where
	Self: 'static + Send + Sync,
{
	/// Exchanges the current credentials (if any) for a new token pair.
	fn refresh<'a>(&'a self, current: Option<&'a TokenPair>) -> RefreshFuture<'a>;
}

#[derive(Debug, Serialize)]
struct RefreshBody<'a> {
	#[serde(skip_serializing_if = "Option::is_none")]
	refresh_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
	#[serde(alias = "accessToken", alias = "token")]
	access_token: TokenSecret,
	#[serde(default, alias = "refreshToken")]
	refresh_token: Option<TokenSecret>,
}

/// [`TokenRefresher`] that POSTs the stored refresh credential to a fixed endpoint.
///
/// The call goes straight through the transport, bypassing the decorator and coordinator, so a
/// 401 from the refresh endpoint is a plain refresh failure. The transport's timeout applies.
pub struct HttpRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	url: Url,
}
impl<T> HttpRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a refresher posting to `url` over `transport`.
	pub fn new(transport: Arc<T>, url: Url) -> Self {
		Self { transport, url }
	}

	/// Refresh endpoint URL.
	pub fn url(&self) -> &Url {
		&self.url
	}

	fn parse(response: &crate::transport::ApiResponse) -> Result<RefreshResponse, ClassifiedError> {
		let status = response.status().as_u16();
		let mut de = serde_json::Deserializer::from_slice(response.bytes());
		let parsed: RefreshResponse = serde_path_to_error::deserialize(&mut de).map_err(|e| {
			ClassifiedError::new(ErrorKind::BusinessError, "Refresh response could not be decoded.")
				.with_status(status)
				.with_cause(e)
		})?;

		if parsed.access_token.is_empty() {
			return Err(ClassifiedError::new(
				ErrorKind::BusinessError,
				"Refresh response carried an empty access token.",
			)
			.with_status(status));
		}

		Ok(parsed)
	}
}
impl<T> TokenRefresher for HttpRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	fn refresh<'a>(&'a self, current: Option<&'a TokenPair>) -> RefreshFuture<'a> {
		Box::pin(async move {
			let body = RefreshBody { refresh_token: current.and_then(TokenPair::refresh_secret) };
			let request = ApiRequest::post(self.url.clone()).json(&body).map_err(|e| {
				ClassifiedError::new(ErrorKind::BusinessError, "Refresh request could not be built.")
					.with_cause(e)
			})?;
			let response = self
				.transport
				.execute(&request)
				.await
				.map_err(|e| classify::classify(Failure::NoResponse(e)))?;

			if !response.is_success() {
				return Err(classify::classify(Failure::Status(response)));
			}

			let parsed = Self::parse(&response)?;
			let mut token = TokenPair {
				access_token: parsed.access_token,
				refresh_token: parsed.refresh_token,
				obtained_at: OffsetDateTime::now_utc(),
			};

			token = token.inherit_refresh(current);

			Ok(token)
		})
	}
}
impl<T> Debug for HttpRefresher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRefresher").field("url", &self.url.as_str()).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::StatusCode;
	// self
	use super::*;
	use crate::{
		error::TransportError,
		transport::{ApiResponse, TransportFuture},
	};

	struct Scripted {
		status: StatusCode,
		body: &'static str,
		seen: Mutex<Vec<Vec<u8>>>,
	}
	impl Scripted {
		fn new(status: StatusCode, body: &'static str) -> Arc<Self> {
			Arc::new(Self { status, body, seen: Mutex::new(Vec::new()) })
		}
	}
	impl HttpTransport for Scripted {
		fn execute<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
			self.seen.lock().push(request.body_bytes().unwrap_or_default().to_vec());

			let response = ApiResponse::new(self.status).with_body(self.body.as_bytes());

			Box::pin(async move { Ok(response) })
		}
	}

	struct Offline;
	impl HttpTransport for Offline {
		fn execute<'a>(&'a self, _request: &'a ApiRequest) -> TransportFuture<'a> {
			Box::pin(async {
				Err(TransportError::Io(std::io::Error::other("network unreachable")))
			})
		}
	}

	fn url() -> Url {
		Url::parse("https://api.example.com/auth/refresh").expect("Fixture URL should parse.")
	}

	#[tokio::test]
	async fn sends_refresh_credential_and_reads_rotated_pair() {
		let transport =
			Scripted::new(StatusCode::OK, r#"{"accessToken":"t2","refreshToken":"r2"}"#);
		let refresher = HttpRefresher::new(transport.clone(), url());
		let current = TokenPair::new("t1").with_refresh_token("r1");
		let token = refresher.refresh(Some(&current)).await.expect("Refresh should succeed.");

		assert_eq!(token.access_token.expose(), "t2");
		assert_eq!(token.refresh_secret(), Some("r2"));
		assert_eq!(transport.seen.lock()[0], br#"{"refresh_token":"r1"}"#.to_vec());
	}

	#[tokio::test]
	async fn keeps_previous_refresh_credential_when_not_rotated() {
		let transport = Scripted::new(StatusCode::OK, r#"{"access_token":"t2"}"#);
		let refresher = HttpRefresher::new(transport.clone(), url());
		let current = TokenPair::new("t1").with_refresh_token("r1");
		let token = refresher.refresh(Some(&current)).await.expect("Refresh should succeed.");

		assert_eq!(token.refresh_secret(), Some("r1"));
	}

	#[tokio::test]
	async fn relies_on_server_session_without_refresh_credential() {
		let transport = Scripted::new(StatusCode::OK, r#"{"token":"t2"}"#);
		let refresher = HttpRefresher::new(transport.clone(), url());
		let token = refresher.refresh(None).await.expect("Refresh should succeed.");

		assert_eq!(token.access_token.expose(), "t2");
		assert_eq!(transport.seen.lock()[0], b"{}".to_vec());
	}

	#[tokio::test]
	async fn non_success_and_malformed_bodies_fail() {
		let refresher =
			HttpRefresher::new(Scripted::new(StatusCode::UNAUTHORIZED, "{}"), url());
		let err = refresher.refresh(None).await.expect_err("401 from refresh must fail.");

		assert_eq!(err.kind(), ErrorKind::AuthExpired);

		let refresher = HttpRefresher::new(Scripted::new(StatusCode::OK, r#"{"user":1}"#), url());
		let err = refresher.refresh(None).await.expect_err("Missing token must fail.");

		assert_eq!(err.status(), Some(200));

		let refresher =
			HttpRefresher::new(Scripted::new(StatusCode::OK, r#"{"access_token":""}"#), url());

		refresher.refresh(None).await.expect_err("Empty token must fail.");
	}

	#[tokio::test]
	async fn network_failure_is_refresh_failure() {
		let refresher = HttpRefresher::new(Arc::new(Offline), url());
		let err = refresher.refresh(None).await.expect_err("Offline refresh must fail.");

		assert_eq!(err.kind(), ErrorKind::NetworkError);
	}
}
