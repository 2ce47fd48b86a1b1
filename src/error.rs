//! Client-level error types shared by the executor, refresh coordinator, and token stores.

// self
use crate::{_prelude::*, http::HttpResponse};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// Every variant is cheap to clone so request-state wrappers can keep the failure around while
/// also handing it back to the caller.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// API answered with a non-success status.
	#[error(transparent)]
	Api(#[from] ApiError),

	/// The API rejected the access token and the session could not be renewed.
	///
	/// Stored tokens have already been cleared when this error is returned.
	#[error("Session expired: {reason}")]
	SessionExpired {
		/// The 401 response that triggered the refresh attempt.
		original: ApiError,
		/// Why the refresh attempt could not renew the session.
		reason: RefreshFailure,
	},
	/// A success payload did not match the expected response schema.
	#[error("Response from `{endpoint}` does not match the expected schema.")]
	Decode {
		/// Endpoint whose payload failed to decode.
		endpoint: String,
		/// Path-aware decoding failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
}
impl Error {
	/// Returns the HTTP status associated with the failure, when one exists.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(api) => Some(api.status),
			Self::SessionExpired { original, .. } => Some(original.status),
			_ => None,
		}
	}

	/// Returns the structured API error carried by the failure, if any.
	pub fn api_error(&self) -> Option<&ApiError> {
		match self {
			Self::Api(api) => Some(api),
			Self::SessionExpired { original, .. } => Some(original),
			_ => None,
		}
	}

	/// Whether the caller must treat the session as terminated (e.g. navigate to sign-in).
	pub fn is_session_expired(&self) -> bool {
		matches!(self, Self::SessionExpired { .. })
	}
}

/// Structured failure raised for non-success API responses.
#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("API request failed with status {status}: {message}")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Human-readable message (`error` field, then `message` field, then the status text).
	pub message: String,
	/// Parsed response body, `{}` when it was absent or not JSON.
	pub body: JsonValue,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
}
impl ApiError {
	/// Builds an error from a status, the transport's status text, and the parsed body.
	pub fn new(status: u16, status_text: Option<&str>, body: JsonValue) -> Self {
		let message = body_message(&body, "error")
			.or_else(|| body_message(&body, "message"))
			.map(str::to_owned)
			.or_else(|| status_text.filter(|text| !text.is_empty()).map(str::to_owned))
			.unwrap_or_else(|| format!("HTTP {status}"));

		Self { status, message, body, retry_after: None }
	}

	/// Classifies a non-success transport response.
	pub fn from_response(response: &HttpResponse) -> Self {
		let body = serde_json::from_slice::<JsonValue>(&response.body)
			.unwrap_or_else(|_| JsonValue::Object(Default::default()));
		let mut error = Self::new(response.status, response.reason.as_deref(), body);

		error.retry_after = response.retry_after();

		error
	}

	/// Whether the API rejected the bearer credential.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}
}

fn body_message<'a>(body: &'a JsonValue, field: &str) -> Option<&'a str> {
	body.get(field).and_then(JsonValue::as_str).filter(|value| !value.is_empty())
}

/// Reasons a refresh attempt failed to produce a new access token.
///
/// The same value is handed to every request that joined the in-flight refresh.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshFailure {
	/// No refresh token was stored, so no network call was made.
	#[error("no refresh token available")]
	MissingRefreshToken,
	/// The refresh endpoint answered with a non-success status.
	#[error("refresh token rejected with status {status}: {message}")]
	Rejected {
		/// HTTP status returned by the refresh endpoint.
		status: u16,
		/// Message extracted from the refresh response.
		message: String,
	},
	/// The refresh endpoint returned a success status without a usable access token.
	#[error("refresh response is malformed: {message}")]
	MalformedResponse {
		/// Parser message.
		message: String,
	},
	/// The refresh call failed before a response arrived.
	#[error("refresh request failed: {message}")]
	Transport {
		/// Transport or configuration message.
		message: String,
	},
	/// The new tokens could not be persisted.
	#[error("refreshed tokens could not be stored: {message}")]
	Storage {
		/// Store message.
		message: String,
	},
}
impl RefreshFailure {
	/// Whether the failure ends the session (tokens cleared, sign-in required).
	///
	/// Only a refresh endpoint that answers with a non-success status, or a store holding no
	/// refresh token, clears the tokens. Network, malformed-response and storage failures leave
	/// the stored pair in place, and the caller receives the original 401 instead.
	pub fn terminates_session(&self) -> bool {
		matches!(self, Self::MissingRefreshToken | Self::Rejected { .. })
	}
}

/// Configuration and request-construction failures raised by the client.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request could not be assembled by the transport.
	#[error("HTTP request could not be built.")]
	HttpRequestBuild {
		/// Underlying transport failure.
		#[source]
		source: SharedError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL `{value}` is invalid.")]
	InvalidBaseUrl {
		/// Raw configured value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than HTTP(S).
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// Endpoint cannot be joined onto the base URL.
	#[error("Endpoint `{endpoint}` does not form a valid URL.")]
	InvalidEndpoint {
		/// Endpoint path supplied by the caller.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Refresh endpoint path must be absolute.
	#[error("Refresh path `{path}` must start with `/`.")]
	InvalidRefreshPath {
		/// Offending path.
		path: String,
	},
	/// Request timeout must be positive.
	#[error("Request timeout must be positive.")]
	ZeroTimeout,
	/// Required environment variable is missing.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// Environment variable holds an unusable value.
	#[error("Environment variable `{name}` has an invalid value `{value}`.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Raw value.
		value: String,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be encoded as JSON.")]
	BodyEncode {
		/// Serializer failure.
		#[source]
		source: Arc<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}

	/// Wraps a transport's request-assembly failure inside [`ConfigError`].
	pub fn http_request_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpRequestBuild { source: Arc::new(src) }
	}
}
impl From<serde_json::Error> for ConfigError {
	fn from(e: serde_json::Error) -> Self {
		Self::BodyEncode { source: Arc::new(e) }
	}
}

/// Transport-level failures (network, timeout).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// The request exceeded the configured timeout.
	#[error("Request timed out while calling the API.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: SharedError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Timeout { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for Error {
	fn from(e: ReqwestError) -> Self {
		if e.is_builder() {
			ConfigError::http_request_build(e).into()
		} else {
			TransportError::from(e).into()
		}
	}
}
