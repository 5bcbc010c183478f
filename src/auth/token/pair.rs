//! Access/refresh credential pair persisted by token stores.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Access credential plus an optional longer-lived refresh credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Access token attached to every outbound request; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh credential sent to the refresh endpoint, when the server issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the pair was adopted by the client.
	pub obtained_at: OffsetDateTime,
}
impl TokenPair {
	/// Creates a pair holding only an access token.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: None,
			obtained_at: OffsetDateTime::now_utc(),
		}
	}

	/// Attaches a refresh credential.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(refresh_token));

		self
	}

	/// Overrides the adoption instant.
	pub fn with_obtained_at(mut self, instant: OffsetDateTime) -> Self {
		self.obtained_at = instant;

		self
	}

	/// Returns the refresh credential as a plain string, if present.
	pub fn refresh_secret(&self) -> Option<&str> {
		self.refresh_token.as_ref().map(TokenSecret::expose)
	}

	/// Keeps `previous`'s refresh credential when this pair was issued without one.
	pub fn inherit_refresh(mut self, previous: Option<&TokenPair>) -> Self {
		if self.refresh_token.is_none() {
			self.refresh_token = previous.and_then(|p| p.refresh_token.clone());
		}

		self
	}
}
impl Debug for TokenPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("obtained_at", &self.obtained_at)
			.finish()
	}
}
