//! Client configuration: API base URL, refresh endpoint path, timeout, and auth scheme.
//!
//! Configs are assembled through [`ClientConfigBuilder`] or loaded from a JSON document via
//! [`ClientConfig::from_json`]; both paths run the same validation.

// crates.io
use http::HeaderValue;
// self
use crate::{_prelude::*, error::ConfigError};

/// Errors raised while validating a [`ClientConfig`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ClientConfigError {
	/// Base URL must be HTTP(S) and able to carry paths.
	#[error("Base URL must be an http(s) URL that can carry paths: {url}.")]
	UnsupportedBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// Refresh path must be absolute.
	#[error("Refresh path must start with `/`: {path}.")]
	RelativeRefreshPath {
		/// Path that failed validation.
		path: String,
	},
	/// Timeout must be strictly positive.
	#[error("Timeout must be positive.")]
	NonPositiveTimeout,
	/// Auth scheme must be a non-empty header-safe token.
	#[error("Auth scheme `{scheme}` is not a valid header token.")]
	InvalidAuthScheme {
		/// Scheme that failed validation.
		scheme: String,
	},
}

/// Immutable client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Base URL every relative request path is joined onto.
	pub base_url: Url,
	/// Path of the refresh endpoint, relative to the base URL.
	#[serde(default = "ClientConfig::default_refresh_path")]
	pub refresh_path: String,
	/// Per-request timeout applied by the transport (and inherited by the refresh call).
	#[serde(default = "ClientConfig::default_timeout", with = "timeout_secs")]
	pub timeout: Duration,
	/// Scheme prefixed to the access token in the `Authorization` header.
	#[serde(default = "ClientConfig::default_auth_scheme")]
	pub auth_scheme: String,
}
impl ClientConfig {
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
	/// Default per-request timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(15);
	/// Default auth scheme.
	pub const DEFAULT_AUTH_SCHEME: &'static str = "Bearer";

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Parses and validates a JSON config document.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut de).map_err(ConfigError::Parse)?;

		config.validate()?;

		Ok(config)
	}

	/// Joins `path` onto the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let relative = path.trim_start_matches('/');
		let mut base = self.base_url.clone();

		if !base.path().ends_with('/') {
			let dir = format!("{}/", base.path());

			base.set_path(&dir);
		}

		base.join(relative)
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.refresh_path)
	}

	fn default_refresh_path() -> String {
		Self::DEFAULT_REFRESH_PATH.into()
	}

	fn default_timeout() -> Duration {
		Self::DEFAULT_TIMEOUT
	}

	fn default_auth_scheme() -> String {
		Self::DEFAULT_AUTH_SCHEME.into()
	}

	fn validate(&self) -> Result<(), ClientConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") || self.base_url.cannot_be_a_base()
		{
			return Err(ClientConfigError::UnsupportedBaseUrl { url: self.base_url.to_string() });
		}
		if !self.refresh_path.starts_with('/') {
			return Err(ClientConfigError::RelativeRefreshPath { path: self.refresh_path.clone() });
		}
		if !self.timeout.is_positive() {
			return Err(ClientConfigError::NonPositiveTimeout);
		}

		validate_auth_scheme(&self.auth_scheme)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for every request path.
	pub base_url: Url,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Per-request timeout.
	pub timeout: Duration,
	/// Authorization scheme.
	pub auth_scheme: String,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: ClientConfig::default_refresh_path(),
			timeout: ClientConfig::DEFAULT_TIMEOUT,
			auth_scheme: ClientConfig::default_auth_scheme(),
		}
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the per-request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the authorization scheme.
	pub fn auth_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.auth_scheme = scheme.into();

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			refresh_path: self.refresh_path,
			timeout: self.timeout,
			auth_scheme: self.auth_scheme,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_auth_scheme(scheme: &str) -> Result<(), ClientConfigError> {
	let header_safe = HeaderValue::from_str(scheme).is_ok();

	if scheme.is_empty() || !header_safe || scheme.contains(char::is_whitespace) {
		Err(ClientConfigError::InvalidAuthScheme { scheme: scheme.to_owned() })
	} else {
		Ok(())
	}
}

mod timeout_secs {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_f64(value.as_seconds_f64())
	}

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let secs = f64::deserialize(deserializer)?;

		if !secs.is_finite() || secs.abs() > u32::MAX as f64 {
			return Err(serde::de::Error::custom("timeout must be a finite number of seconds"));
		}

		Ok(Duration::seconds_f64(secs))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> Url {
		Url::parse("https://api.example.com/v1").expect("Fixture base URL should parse.")
	}

	#[test]
	fn builder_applies_defaults() {
		let config = ClientConfig::builder(base()).build().expect("Defaults should validate.");

		assert_eq!(config.refresh_path, "/auth/refresh");
		assert_eq!(config.timeout, Duration::seconds(15));
		assert_eq!(config.auth_scheme, "Bearer");
	}

	#[test]
	fn endpoint_keeps_base_path_prefix() {
		let config = ClientConfig::builder(base()).build().expect("Defaults should validate.");

		assert_eq!(
			config.endpoint("/posts/7").expect("Path should join.").as_str(),
			"https://api.example.com/v1/posts/7"
		);
		assert_eq!(
			config.refresh_url().expect("Refresh URL should join.").as_str(),
			"https://api.example.com/v1/auth/refresh"
		);
	}

	#[test]
	fn builder_rejects_invalid_values() {
		let err = ClientConfig::builder(base())
			.refresh_path("auth/refresh")
			.build()
			.expect_err("Relative refresh paths should be rejected.");

		assert!(matches!(err, ClientConfigError::RelativeRefreshPath { .. }));

		let err = ClientConfig::builder(base())
			.timeout(Duration::ZERO)
			.build()
			.expect_err("Zero timeouts should be rejected.");

		assert_eq!(err, ClientConfigError::NonPositiveTimeout);

		let err = ClientConfig::builder(base())
			.auth_scheme("Bear er")
			.build()
			.expect_err("Schemes with whitespace should be rejected.");

		assert!(matches!(err, ClientConfigError::InvalidAuthScheme { .. }));

		let mailto = Url::parse("mailto:ops@example.com").expect("Mailto URL should parse.");
		let err = ClientConfig::builder(mailto)
			.build()
			.expect_err("Non-HTTP base URLs should be rejected.");

		assert!(matches!(err, ClientConfigError::UnsupportedBaseUrl { .. }));
	}

	#[test]
	fn from_json_fills_defaults_and_reads_timeout_seconds() {
		let config =
			ClientConfig::from_json(r#"{ "base_url": "https://api.example.com", "timeout": 2.5 }"#)
				.expect("Minimal config should parse.");

		assert_eq!(config.timeout, Duration::milliseconds(2_500));
		assert_eq!(config.refresh_path, ClientConfig::DEFAULT_REFRESH_PATH);
	}

	#[test]
	fn from_json_reports_path_and_validation_failures() {
		let err = ClientConfig::from_json(r#"{ "base_url": "https://api.example.com", "timeout": "x" }"#)
			.expect_err("String timeouts should not parse.");

		match err {
			ConfigError::Parse(source) => assert_eq!(source.path().to_string(), "timeout"),
			other => panic!("Unexpected error variant: {other:?}."),
		}

		let err = ClientConfig::from_json(r#"{ "base_url": "ftp://files.example.com" }"#)
			.expect_err("FTP base URLs should fail validation.");

		assert!(matches!(err, ConfigError::Invalid(ClientConfigError::UnsupportedBaseUrl { .. })));
	}
}
