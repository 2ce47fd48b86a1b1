//! Client configuration: base URL, refresh endpoint, and optional request timeout.

// std
use std::{env, time::Duration as StdDuration};
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "ADMISSIONS_API_BASE_URL";
/// Environment variable holding an optional request timeout, in whole seconds.
pub const TIMEOUT_ENV: &str = "ADMISSIONS_API_TIMEOUT_SECS";
/// Token-refresh endpoint path relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/token/refresh/";

/// Validated client configuration shared by every request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL every endpoint path is appended to.
	pub base_url: Url,
	/// Path of the token-refresh endpoint.
	pub refresh_path: String,
	/// Upper bound for a single HTTP exchange; `None` waits indefinitely.
	pub timeout: Option<StdDuration>,
}
impl ClientConfig {
	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Reads [`BASE_URL_ENV`] and [`TIMEOUT_ENV`] from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Builds the configuration from an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let base_url = lookup(BASE_URL_ENV)
			.filter(|value| !value.trim().is_empty())
			.ok_or(ConfigError::MissingEnv { name: BASE_URL_ENV })?;
		let mut builder = Self::builder(base_url.trim());

		if let Some(raw) = lookup(TIMEOUT_ENV).filter(|value| !value.trim().is_empty()) {
			let secs = raw
				.trim()
				.parse::<u64>()
				.map_err(|_| ConfigError::InvalidEnv { name: TIMEOUT_ENV, value: raw.clone() })?;

			builder = builder.timeout(StdDuration::from_secs(secs));
		}

		builder.build()
	}

	/// Resolves `endpoint` against the base URL.
	///
	/// Paths are appended verbatim (with exactly one `/` at the seam) so a base URL carrying a
	/// path prefix such as `/api` keeps it.
	pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ConfigError> {
		let base = self.base_url.as_str().trim_end_matches('/');
		let joined = format!("{base}/{}", endpoint.trim_start_matches('/'));

		Url::parse(&joined)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: endpoint.to_owned(), source })
	}

	/// Whether `endpoint` addresses the token-refresh endpoint.
	pub fn is_refresh_endpoint(&self, endpoint: &str) -> bool {
		normalize_path(endpoint) == normalize_path(&self.refresh_path)
	}
}

fn normalize_path(endpoint: &str) -> &str {
	let path = endpoint.split(['?', '#']).next().unwrap_or_default();

	path.trim_matches('/')
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Raw base URL.
	pub base_url: String,
	/// Token-refresh endpoint path.
	pub refresh_path: String,
	/// Optional request timeout.
	pub timeout: Option<StdDuration>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided base URL.
	pub fn new(base_url: impl Into<String>) -> Self {
		Self { base_url: base_url.into(), refresh_path: DEFAULT_REFRESH_PATH.into(), timeout: None }
	}

	/// Overrides the token-refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Bounds every HTTP exchange by `timeout`.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url = Url::parse(&self.base_url)
			.map_err(|source| ConfigError::InvalidBaseUrl { value: self.base_url.clone(), source })?;

		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: base_url.to_string() });
		}
		if !self.refresh_path.starts_with('/') {
			return Err(ConfigError::InvalidRefreshPath { path: self.refresh_path });
		}
		if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
			return Err(ConfigError::ZeroTimeout);
		}

		Ok(ClientConfig { base_url, refresh_path: self.refresh_path, timeout: self.timeout })
	}
}
