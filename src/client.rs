//! Request executor: bearer injection, status classification, and retry-after-refresh.
//!
//! [`ApiClient`] is the only component that talks to the transport. Each call resolves the
//! endpoint against the configured base URL, attaches `Authorization: Bearer <access>` when the
//! token store holds an access token, and classifies the response. A 401 from any endpoint other
//! than the refresh endpoint hands control to the [`RefreshCoordinator`]; once the shared
//! refresh settles with a new token, the identical request is replayed exactly once.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, RefreshGrant, RefreshRequest, TokenSecret},
	config::ClientConfig,
	error::{ApiError, ConfigError, RefreshFailure},
	http::{
		APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE, HttpRequest, HttpResponse, HttpTransport,
		Method, MultipartForm, RequestBody,
	},
	obs::{self, CallSpan, Operation, Outcome},
	refresh::{RefreshCoordinator, RefreshOutcome, SessionListener},
	store::{StoreError, TokenStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Body carried by [`RequestOptions`].
#[derive(Clone, Debug)]
pub enum Payload<B> {
	/// No body.
	None,
	/// Value serialized as JSON.
	Json(B),
	/// Multipart form; no content type is forced so the transport can set the boundary.
	Multipart(MultipartForm),
}

/// Method, extra headers, and body for a single call.
#[derive(Clone, Debug)]
pub struct RequestOptions<B = ()> {
	/// HTTP method.
	pub method: Method,
	/// Extra headers; they override defaults except `Authorization` when a token is stored.
	pub headers: Vec<(String, String)>,
	/// Request body.
	pub body: Payload<B>,
}
impl RequestOptions<()> {
	/// Creates options for `method` without headers or body.
	pub fn new(method: Method) -> Self {
		Self { method, headers: Vec::new(), body: Payload::None }
	}

	/// Shorthand for a `GET` without body.
	pub fn get() -> Self {
		Self::new(Method::Get)
	}

	/// Attaches a JSON body.
	pub fn json<B>(self, body: B) -> RequestOptions<B>
	where
		B: Serialize,
	{
		RequestOptions { method: self.method, headers: self.headers, body: Payload::Json(body) }
	}

	/// Attaches a multipart body.
	pub fn multipart(mut self, form: MultipartForm) -> Self {
		self.body = Payload::Multipart(form);

		self
	}
}
impl<B> RequestOptions<B> {
	/// Adds an extra header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}
}

/// Undecoded success response returned by upload and download calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Declared content type, if any.
	pub content_type: Option<String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Decodes the body as JSON on demand.
	pub fn json<T>(&self) -> Result<T, serde_json::Error>
	where
		T: DeserializeOwned,
	{
		serde_json::from_slice(&self.body)
	}
}
impl From<HttpResponse> for RawResponse {
	fn from(response: HttpResponse) -> Self {
		let content_type = response.content_type().map(str::to_owned);

		Self { status: response.status, content_type, body: response.body }
	}
}

/// Authenticated API client.
///
/// Cloning is cheap; clones share the transport, token store, configuration, and, crucially,
/// the refresh coordinator, so the single-flight guarantee spans every clone.
#[derive(Clone)]
pub struct ApiClient {
	/// Transport used for every outbound request.
	pub transport: Arc<dyn HttpTransport>,
	/// Token store holding the session credentials.
	pub store: Arc<dyn TokenStore>,
	/// Validated configuration.
	pub config: Arc<ClientConfig>,
	refresh: Arc<RefreshCoordinator>,
	session_listener: Option<Arc<dyn SessionListener>>,
}
impl ApiClient {
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn TokenStore>,
		transport: Arc<dyn HttpTransport>,
	) -> Self {
		Self {
			transport,
			store,
			config: Arc::new(config),
			refresh: Default::default(),
			session_listener: None,
		}
	}

	/// Registers a listener notified whenever a failed refresh ends the session.
	pub fn with_session_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
		self.session_listener = Some(listener);

		self
	}

	/// Refresh coordinator shared by this client and its clones.
	pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
		&self.refresh
	}

	/// Executes a call and decodes the JSON success payload into `Resp`.
	///
	/// Endpoints that answer without a body (or with a non-JSON body) decode from `{}`; use
	/// [`serde::de::IgnoredAny`] or [`JsonValue`] when the payload is irrelevant.
	pub async fn execute<Req, Resp>(
		&self,
		endpoint: &str,
		options: RequestOptions<Req>,
	) -> Result<Resp>
	where
		Req: Serialize,
		Resp: DeserializeOwned,
	{
		let value = self.execute_value(endpoint, options).await?;

		decode(endpoint, value)
	}

	/// Executes a call and returns the JSON success payload without a schema.
	pub async fn execute_value<Req>(
		&self,
		endpoint: &str,
		options: RequestOptions<Req>,
	) -> Result<JsonValue>
	where
		Req: Serialize,
	{
		let operation = match options.body {
			Payload::Multipart(_) if options.method == Method::Patch => Operation::UploadPatch,
			Payload::Multipart(_) => Operation::Upload,
			_ => Operation::for_json(options.method),
		};
		let request = self.prepare(endpoint, options)?;
		let response = self.dispatch(endpoint, operation, request).await?;

		Ok(success_payload(&response))
	}

	/// Executes a call and returns the success body untouched (no JSON parsing).
	pub async fn execute_raw<Req>(
		&self,
		endpoint: &str,
		operation: Operation,
		options: RequestOptions<Req>,
	) -> Result<RawResponse>
	where
		Req: Serialize,
	{
		let request = self.prepare(endpoint, options)?;

		self.dispatch(endpoint, operation, request).await.map(RawResponse::from)
	}

	/// `GET`s `endpoint` and decodes the payload.
	pub async fn get_json<Resp>(&self, endpoint: &str) -> Result<Resp>
	where
		Resp: DeserializeOwned,
	{
		self.execute(endpoint, RequestOptions::get()).await
	}

	/// Sends `body` as JSON with `method` and decodes the payload.
	pub async fn send_json<Req, Resp>(
		&self,
		method: Method,
		endpoint: &str,
		body: &Req,
	) -> Result<Resp>
	where
		Req: ?Sized + Serialize,
		Resp: DeserializeOwned,
	{
		self.execute(endpoint, RequestOptions::new(method).json(body)).await
	}

	/// `DELETE`s `endpoint` without a body and decodes the payload.
	pub async fn delete_resource<Resp>(&self, endpoint: &str) -> Result<Resp>
	where
		Resp: DeserializeOwned,
	{
		self.execute(endpoint, RequestOptions::new(Method::Delete)).await
	}

	/// Sends a multipart form with `method` (`POST` or `PATCH`) and returns the raw body.
	pub async fn send_multipart(
		&self,
		method: Method,
		endpoint: &str,
		form: MultipartForm,
	) -> Result<RawResponse> {
		let operation =
			if method == Method::Patch { Operation::UploadPatch } else { Operation::Upload };

		self.execute_raw(endpoint, operation, RequestOptions::new(method).multipart(form)).await
	}

	/// `GET`s `endpoint` and returns the raw body for file persistence.
	pub async fn get_raw(&self, endpoint: &str) -> Result<RawResponse> {
		self.execute_raw(endpoint, Operation::Download, RequestOptions::get()).await
	}

	/// Stores the credentials (and optional profile) returned by sign-in or registration.
	pub fn sign_in(&self, credentials: CredentialPair, user: Option<JsonValue>) -> Result<()> {
		self.store.set_tokens(credentials)?;

		if let Some(user) = user {
			self.store.set_user(user)?;
		}

		Ok(())
	}

	/// Clears the stored credentials and profile.
	pub fn sign_out(&self) -> Result<()> {
		self.store.remove_tokens()?;
		self.store.remove_user()?;

		Ok(())
	}

	/// Whether an access token is currently stored.
	pub fn is_signed_in(&self) -> Result<bool> {
		Ok(self.store.access_token()?.is_some())
	}

	/// Decodes the stored profile blob.
	pub fn current_user<T>(&self) -> Result<Option<T>>
	where
		T: DeserializeOwned,
	{
		self.store.user()?.map(|user| decode("user", user)).transpose()
	}

	/// Obtains a new access token through the shared refresh slot.
	///
	/// Concurrent callers share one refresh round-trip and observe the same outcome.
	pub async fn refresh_access_token(&self) -> RefreshOutcome {
		self.refresh.run(|| self.perform_refresh()).await
	}

	fn prepare<Req>(&self, endpoint: &str, options: RequestOptions<Req>) -> Result<HttpRequest>
	where
		Req: Serialize,
	{
		let url = self.config.endpoint_url(endpoint)?;
		let mut request = HttpRequest::new(options.method, url);

		request.body = match options.body {
			Payload::None => RequestBody::Empty,
			Payload::Json(body) =>
				RequestBody::Json(serde_json::to_vec(&body).map_err(ConfigError::from)?),
			Payload::Multipart(form) => RequestBody::Multipart(form),
		};

		if !matches!(request.body, RequestBody::Multipart(_)) {
			request.set_header(CONTENT_TYPE, APPLICATION_JSON);
		}

		for (name, value) in options.headers {
			request.set_header(name, value);
		}

		Ok(request)
	}

	async fn dispatch(
		&self,
		endpoint: &str,
		operation: Operation,
		request: HttpRequest,
	) -> Result<HttpResponse> {
		let span = CallSpan::new(operation, endpoint);

		obs::record_outcome(operation, Outcome::Attempt);

		let result: Result<HttpResponse> = span
			.instrument(async move {
				let access = self.store.access_token()?;
				let response = self.send(request.clone(), access.as_ref()).await?;

				if response.status != 401 || self.config.is_refresh_endpoint(endpoint) {
					return classify(response);
				}

				let original = ApiError::from_response(&response);

				obs::debug_event("Access token rejected; awaiting shared refresh.");

				let access = match self.refresh_access_token().await {
					Ok(access) => access,
					Err(reason) if reason.terminates_session() =>
						return Err(Error::SessionExpired { original, reason }),
					Err(reason) => {
						obs::warn_event("Refresh failed; surfacing the original 401.", &reason);

						return Err(original.into());
					},
				};

				obs::record_outcome(operation, Outcome::Retry);

				classify(self.send(request, Some(&access)).await?)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(operation, Outcome::Success),
			Err(_) => obs::record_outcome(operation, Outcome::Failure),
		}

		result
	}

	async fn send(
		&self,
		mut request: HttpRequest,
		access: Option<&TokenSecret>,
	) -> Result<HttpResponse> {
		if let Some(access) = access {
			request.set_header(AUTHORIZATION, access.bearer());
		}

		self.transport.send(request).await
	}

	async fn perform_refresh(&self) -> RefreshOutcome {
		let span = CallSpan::new(Operation::Refresh, &self.config.refresh_path);
		let outcome = span.instrument(self.exchange_refresh_token()).await;

		match &outcome {
			Ok(_) => obs::record_outcome(Operation::Refresh, Outcome::Success),
			Err(reason) => {
				obs::record_outcome(Operation::Refresh, Outcome::Failure);

				if reason.terminates_session() {
					obs::warn_event("Session terminated; stored tokens cleared.", reason);

					if let Some(listener) = &self.session_listener {
						listener.on_session_expired(reason);
					}
				}
			},
		}

		outcome
	}

	async fn exchange_refresh_token(&self) -> RefreshOutcome {
		let storage = |e: StoreError| RefreshFailure::Storage { message: e.to_string() };
		let transport = |e: Error| RefreshFailure::Transport { message: e.to_string() };
		let Some(refresh) = self.store.refresh_token().map_err(storage)? else {
			self.store.remove_tokens().map_err(storage)?;

			return Err(RefreshFailure::MissingRefreshToken);
		};
		let url = self
			.config
			.endpoint_url(&self.config.refresh_path)
			.map_err(|e| transport(e.into()))?;
		let body = serde_json::to_vec(&RefreshRequest { refresh: refresh.expose() })
			.map_err(|e| transport(ConfigError::from(e).into()))?;
		let request = HttpRequest::new(Method::Post, url)
			.with_header(CONTENT_TYPE, APPLICATION_JSON)
			.with_body(RequestBody::Json(body));
		let response = self.transport.send(request).await.map_err(transport)?;

		if !response.is_success() {
			let rejected = ApiError::from_response(&response);

			self.store.remove_tokens().map_err(storage)?;

			return Err(RefreshFailure::Rejected {
				status: rejected.status,
				message: rejected.message,
			});
		}

		let grant = serde_json::from_slice::<RefreshGrant>(&response.body)
			.map_err(|e| RefreshFailure::MalformedResponse { message: e.to_string() })?;
		let persisted = match grant.rotated_refresh() {
			Some(rotated) => self.store.set_tokens(CredentialPair {
				access: grant.access.clone(),
				refresh: rotated.clone(),
			}),
			None => self.store.set_access_token(grant.access.clone()),
		};

		persisted.map_err(storage)?;

		obs::debug_event("Access token refreshed.");

		Ok(grant.access)
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient {
	/// Creates a client backed by the crate's reqwest transport.
	///
	/// The transport honors [`ClientConfig::timeout`].
	pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, store, Arc::new(transport)))
	}

	/// Creates a reqwest-backed client configured from the process environment.
	pub fn from_env(store: Arc<dyn TokenStore>) -> Result<Self> {
		Self::new(ClientConfig::from_env()?, store)
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("refresh", &self.refresh)
			.field("session_listener_set", &self.session_listener.is_some())
			.finish()
	}
}

fn classify(response: HttpResponse) -> Result<HttpResponse> {
	if response.is_success() { Ok(response) } else { Err(ApiError::from_response(&response).into()) }
}

/// Success bodies are parsed only when declared as JSON; empty or malformed JSON yields `{}`.
fn success_payload(response: &HttpResponse) -> JsonValue {
	let empty = || JsonValue::Object(Default::default());

	if !response.is_json() || response.body.iter().all(u8::is_ascii_whitespace) {
		return empty();
	}

	serde_json::from_slice(&response.body).unwrap_or_else(|_| empty())
}

fn decode<T>(endpoint: &str, value: JsonValue) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value)
		.map_err(|e| Error::Decode { endpoint: endpoint.to_owned(), source: Arc::new(e) })
}
