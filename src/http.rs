//! Transport primitives for API calls.
//!
//! The module exposes [`HttpTransport`] alongside transport-neutral [`HttpRequest`] and
//! [`HttpResponse`] values so downstream crates (and tests) can plug in custom HTTP stacks
//! without losing the client's auth and refresh handling. Requests are plain data and cheap to
//! clone, which is what lets the executor replay a request after a token refresh; multipart
//! bodies are therefore described by [`MultipartForm`] and only turned into a transport form at
//! send time.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::multipart::{Form, Part};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::{config::ClientConfig, error::ConfigError};

/// `Content-Type` header name.
pub const CONTENT_TYPE: &str = "content-type";
/// `Authorization` header name.
pub const AUTHORIZATION: &str = "authorization";
/// JSON media type.
pub const APPLICATION_JSON: &str = "application/json";

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing a single API exchange.
///
/// Implementations perform exactly one round-trip per call: no redirects to other origins, no
/// retries, no auth handling. Non-success statuses are returned as responses, not errors; only
/// failures that prevent a response (network, timeout, request assembly) become errors.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and buffers the full response body.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// HTTP methods used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the wire name of the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Body attached to an [`HttpRequest`].
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// Pre-serialized JSON bytes.
	Json(Vec<u8>),
	/// Multipart form; the transport chooses the boundary and content type.
	Multipart(MultipartForm),
}

/// Transport-neutral outbound request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Fully resolved URL.
	pub url: Url,
	/// Header pairs; names are matched case-insensitively.
	pub headers: Vec<(String, String)>,
	/// Request body.
	pub body: RequestBody,
}
impl HttpRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), body: RequestBody::Empty }
	}

	/// Sets `name` to `value`, replacing any existing value for the same header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.set_header(name, value);

		self
	}

	/// Attaches a body.
	pub fn with_body(mut self, body: RequestBody) -> Self {
		self.body = body;

		self
	}

	/// Sets `name` to `value`, replacing any existing value for the same header.
	pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();

		self.remove_header(&name);
		self.headers.push((name, value.into()));
	}

	/// Removes every value for `name`.
	pub fn remove_header(&mut self, name: &str) {
		self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
	}

	/// Returns the first value for `name`.
	pub fn header(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}
}

/// Fully buffered response returned by an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Status text reported by the transport (canonical reason phrase).
	pub reason: Option<String>,
	/// Header pairs; names are matched case-insensitively.
	pub headers: Vec<(String, String)>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Whether the status is in the 2xx range.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the first value for `name`.
	pub fn header(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}

	/// Returns the declared content type.
	pub fn content_type(&self) -> Option<&str> {
		self.header(CONTENT_TYPE)
	}

	/// Whether the response declares a JSON media type (`application/json`, `*+json`).
	pub fn is_json(&self) -> bool {
		self.content_type().is_some_and(|value| {
			let essence = value.split(';').next().unwrap_or_default().trim();

			essence.eq_ignore_ascii_case(APPLICATION_JSON)
				|| essence.to_ascii_lowercase().ends_with("+json")
		})
	}

	/// Parses the Retry-After header (delta seconds or HTTP date) into a relative duration.
	pub fn retry_after(&self) -> Option<Duration> {
		let raw = self.header("retry-after")?.trim();

		if let Ok(secs) = raw.parse::<u64>() {
			return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
		}
		if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
			let delta = moment - OffsetDateTime::now_utc();

			if delta.is_positive() {
				return Some(delta);
			}
		}

		None
	}
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
	headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
}

/// One field of a [`MultipartForm`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormPart {
	/// Plain text field.
	Text(String),
	/// File field.
	File {
		/// File contents.
		bytes: Vec<u8>,
		/// File name reported to the server.
		file_name: Option<String>,
		/// Media type of the contents.
		mime: Option<String>,
	},
}

/// Replayable multipart form description.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartForm {
	parts: Vec<(String, FormPart)>,
}
impl MultipartForm {
	/// Creates an empty form.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push((name.into(), FormPart::Text(value.into())));

		self
	}

	/// Appends a file field.
	pub fn file(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		self.parts.push((
			name.into(),
			FormPart::File { bytes: bytes.into(), file_name: Some(file_name.into()), mime: None },
		));

		self
	}

	/// Appends a file field with an explicit media type.
	pub fn file_with_mime(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		mime: impl Into<String>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		self.parts.push((
			name.into(),
			FormPart::File {
				bytes: bytes.into(),
				file_name: Some(file_name.into()),
				mime: Some(mime.into()),
			},
		));

		self
	}

	/// Returns the fields in insertion order.
	pub fn parts(&self) -> &[(String, FormPart)] {
		&self.parts
	}

	/// Whether the form has no fields.
	pub fn is_empty(&self) -> bool {
		self.parts.is_empty()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client honoring the configured request timeout.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = config.timeout {
			builder = builder.timeout(timeout);
		}

		builder.build().map(Self).map_err(ConfigError::http_client_build)
	}

	fn build_form(form: MultipartForm) -> Result<Form> {
		let mut out = Form::new();

		for (name, part) in form.parts {
			out = match part {
				FormPart::Text(value) => out.text(name, value),
				FormPart::File { bytes, file_name, mime } => {
					let mut part = Part::bytes(bytes);

					if let Some(file_name) = file_name {
						part = part.file_name(file_name);
					}
					if let Some(mime) = mime {
						part = part.mime_str(&mime).map_err(ConfigError::http_request_build)?;
					}

					out.part(name, part)
				},
			};
		}

		Ok(out)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = self.0.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}

			builder = match request.body {
				RequestBody::Empty => builder,
				RequestBody::Json(bytes) => builder.body(bytes),
				RequestBody::Multipart(form) => builder.multipart(Self::build_form(form)?),
			};

			let response = builder.send().await?;
			let status = response.status();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse {
				status: status.as_u16(),
				reason: status.canonical_reason().map(str::to_owned),
				headers,
				body,
			})
		})
	}
}
