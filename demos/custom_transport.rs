//! Demonstrates plugging a non-reqwest transport into [`AuthClient`].
//!
//! 1. Implement [`HttpTransport`] so every status code comes back as an [`ApiResponse`] and only
//!    "no response" conditions surface as [`TransportError`].
//! 2. Hand the transport to [`AuthClient::new`]; the client reuses it for the refresh call.
//! 3. Watch a stale token get refreshed once and the request replayed, then watch a revoked
//!    refresh credential end the session.

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};
// crates.io
use color_eyre::Result;
use url::Url;
// self
use session_relay::{
	auth::TokenPair,
	client::AuthClient,
	config::ClientConfig,
	error::TransportError,
	http::{Method, StatusCode},
	session::{Notice, StoreSession},
	store::MemoryStore,
	transport::{ApiRequest, ApiResponse, HttpTransport, TransportFuture},
};

/// In-process stand-in for a backend that rotates `stale` into `fresh`.
#[derive(Default)]
struct LoopbackTransport {
	revoked: AtomicBool,
}
impl HttpTransport for LoopbackTransport {
	fn execute<'a>(&'a self, request: &'a ApiRequest) -> TransportFuture<'a> {
		Box::pin(async move {
			let response = match (request.url().path(), request.authorization()) {
				("/auth/refresh", _) if self.revoked.load(Ordering::SeqCst) =>
					ApiResponse::new(StatusCode::UNAUTHORIZED),
				("/auth/refresh", _) =>
					ApiResponse::new(StatusCode::OK).with_body(r#"{"access_token":"fresh"}"#),
				("/offline", _) =>
					return Err(TransportError::network(std::io::Error::other("unplugged"))),
				(_, Some("Bearer fresh")) => ApiResponse::new(StatusCode::OK).with_body(r#"{"ok":true}"#),
				_ => ApiResponse::new(StatusCode::UNAUTHORIZED),
			};

			Ok(response)
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::builder(Url::parse("https://api.example.com")?).build()?;
	let store = Arc::new(MemoryStore::with_token(TokenPair::new("stale").with_refresh_token("r1")));
	let transport = Arc::new(LoopbackTransport::default());
	let session = StoreSession::new(store.clone())
		.with_notifier(Arc::new(|notice: &Notice| println!("Notice: {}.", notice.message)));
	let client: AuthClient<LoopbackTransport> =
		AuthClient::new(config, store.clone(), transport.clone())?.with_session(Arc::new(session));
	let response = client.send(client.request(Method::GET, "/me")?).await?;

	println!("Replayed request answered {} with body {}.", response.status(), response.text());
	println!(
		"Refresh cycles so far: {}; stored token: {:?}.",
		client.coordinator().metrics().cycles(),
		store.snapshot()
	);

	if let Err(e) = client.send(client.request(Method::GET, "/offline")?).await {
		println!("Network failures bypass refresh: {e}.");
	}

	transport.revoked.store(true, Ordering::SeqCst);
	client.sign_in(TokenPair::new("stale")).await;

	match client.send(client.request(Method::GET, "/me")?).await {
		Ok(response) => println!("Unexpected success: {}.", response.status()),
		Err(e) => println!("Session ended: {e}; store now holds {:?}.", store.snapshot()),
	}

	Ok(())
}
