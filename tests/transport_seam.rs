// std
use std::{
	collections::VecDeque,
	io::{Error as IoError, ErrorKind},
	sync::Arc,
};
// crates.io
use color_eyre::{Result, eyre::eyre};
use parking_lot::Mutex;
use serde_json::{Value as JsonValue, json};
// self
use admissions_client::{
	auth::{CredentialPair, TokenSecret},
	client::{ApiClient, RequestOptions},
	config::ClientConfig,
	error::{Error, RefreshFailure, TransportError},
	http::{
		HttpRequest, HttpResponse, HttpTransport, Method, MultipartForm, RequestBody,
		TransportFuture,
	},
	refresh::SessionListener,
	store::{DetachedStore, MemoryStore, StoreSnapshot, TokenStore},
};

/// Replays canned outcomes and records every request it receives.
#[derive(Default)]
struct ScriptedTransport {
	outcomes: Mutex<VecDeque<Result<HttpResponse, Error>>>,
	requests: Mutex<Vec<HttpRequest>>,
}
impl ScriptedTransport {
	fn with_responses(responses: impl IntoIterator<Item = HttpResponse>) -> Arc<Self> {
		Self::with_outcomes(responses.into_iter().map(Ok))
	}

	fn with_outcomes(
		outcomes: impl IntoIterator<Item = Result<HttpResponse, Error>>,
	) -> Arc<Self> {
		Arc::new(Self {
			outcomes: Mutex::new(outcomes.into_iter().collect()),
			requests: Default::default(),
		})
	}

	fn requests(&self) -> Vec<HttpRequest> {
		self.requests.lock().clone()
	}
}
impl HttpTransport for ScriptedTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		self.requests.lock().push(request);

		let outcome =
			self.outcomes.lock().pop_front().unwrap_or_else(|| Ok(json_response(500, "{}")));

		Box::pin(async move { outcome })
	}
}

fn json_response(status: u16, body: &str) -> HttpResponse {
	HttpResponse {
		status,
		reason: None,
		headers: vec![("Content-Type".into(), "application/json; charset=utf-8".into())],
		body: body.as_bytes().to_vec(),
	}
}

#[derive(Default)]
struct RecordingListener(Mutex<Vec<RefreshFailure>>);
impl SessionListener for RecordingListener {
	fn on_session_expired(&self, reason: &RefreshFailure) {
		self.0.lock().push(reason.clone());
	}
}

fn client_with(
	transport: Arc<ScriptedTransport>,
	store: Arc<dyn TokenStore>,
) -> Result<ApiClient> {
	let config = ClientConfig::builder("https://portal.example.edu/api/").build()?;

	Ok(ApiClient::with_transport(config, store, transport))
}

#[tokio::test]
async fn bearer_replaces_caller_authorization_and_urls_keep_the_base_path() -> Result<()> {
	let transport = ScriptedTransport::with_responses([json_response(200, "{\"ok\":true}")]);
	let store = Arc::new(MemoryStore::default());

	store.set_tokens(CredentialPair::new("a1", "r1"))?;

	let client = client_with(transport.clone(), store)?;
	let value = client
		.execute_value(
			"/applicant/application/",
			RequestOptions::new(Method::Patch)
				.json(json!({ "step": 2 }))
				.header("Authorization", "Bearer forged")
				.header("X-Request-Source", "wizard"),
		)
		.await?;
	let requests = transport.requests();
	let request = &requests[0];

	assert_eq!(value, json!({ "ok": true }));
	assert_eq!(request.url.as_str(), "https://portal.example.edu/api/applicant/application/");
	assert_eq!(request.header("authorization"), Some("Bearer a1"));
	assert_eq!(request.header("content-type"), Some("application/json"));
	assert_eq!(request.header("x-request-source"), Some("wizard"));
	assert!(matches!(&request.body, RequestBody::Json(bytes) if bytes == b"{\"step\":2}"));

	Ok(())
}

#[tokio::test]
async fn anonymous_requests_carry_no_bearer() -> Result<()> {
	let transport = ScriptedTransport::with_responses([json_response(200, "[]")]);
	let client = client_with(transport.clone(), Arc::new(MemoryStore::default()))?;
	let programs: Vec<JsonValue> = client.get_json("programs/").await?;

	assert!(programs.is_empty());
	assert_eq!(transport.requests()[0].header("authorization"), None);

	Ok(())
}

#[tokio::test]
async fn multipart_requests_leave_content_type_to_the_transport() -> Result<()> {
	let transport = ScriptedTransport::with_responses([json_response(201, "{}")]);
	let client = client_with(transport.clone(), Arc::new(MemoryStore::default()))?;
	let form = MultipartForm::new().file("transcript", "transcript.pdf", b"%PDF".to_vec());
	let response =
		client.send_multipart(Method::Post, "/applicant/documents/", form.clone()).await?;
	let requests = transport.requests();

	assert_eq!(response.status, 201);
	assert_eq!(requests[0].header("content-type"), None);
	assert!(matches!(&requests[0].body, RequestBody::Multipart(sent) if *sent == form));

	Ok(())
}

#[tokio::test]
async fn unavailable_store_sends_anonymous_requests_and_expires_on_401() -> Result<()> {
	let transport = ScriptedTransport::with_responses([json_response(401, "{}")]);
	let client = client_with(transport.clone(), Arc::new(DetachedStore))?;

	client.sign_in(CredentialPair::new("a1", "r1"), None)?;

	assert!(!client.is_signed_in()?);

	let err = client
		.get_json::<JsonValue>("/applicant/status/")
		.await
		.expect_err("401 without stored refresh token should fail.");

	assert!(err.is_session_expired());
	assert_eq!(transport.requests().len(), 1);

	Ok(())
}

#[tokio::test]
async fn unreachable_refresh_endpoint_keeps_the_session() -> Result<()> {
	let transport = ScriptedTransport::with_outcomes([
		Ok(json_response(401, "{\"error\":\"Token expired\"}")),
		Err(TransportError::network(IoError::new(ErrorKind::ConnectionReset, "reset")).into()),
	]);
	let store = Arc::new(MemoryStore::default());
	let listener = Arc::new(RecordingListener::default());
	let client =
		client_with(transport.clone(), store.clone())?.with_session_listener(listener.clone());

	client.sign_in(CredentialPair::new("a1", "r1"), None)?;

	let err = client
		.get_json::<JsonValue>("/applicant/status/")
		.await
		.expect_err("Unreachable refresh endpoint should surface the original 401.");
	let requests = transport.requests();

	assert!(matches!(&err, Error::Api(api) if api.status == 401 && api.message == "Token expired"));
	assert_eq!(store.access_token()?, Some(TokenSecret::new("a1")));
	assert_eq!(store.refresh_token()?, Some(TokenSecret::new("r1")));
	assert!(listener.0.lock().is_empty());
	assert!(!client.refresh_coordinator().is_in_flight());
	assert_eq!(client.refresh_coordinator().metrics().failures(), 1);
	assert_eq!(requests.len(), 2);
	assert_eq!(requests[1].url.as_str(), "https://portal.example.edu/api/auth/token/refresh/");

	Ok(())
}

#[tokio::test]
async fn sign_out_clears_tokens_and_profile() -> Result<()> {
	let store = Arc::new(MemoryStore::default());
	let client = client_with(ScriptedTransport::with_responses(Vec::new()), store.clone())?;

	client.sign_in(CredentialPair::new("a1", "r1"), Some(json!({ "email": "ada@example.edu" })))?;

	#[derive(serde::Deserialize)]
	struct Profile {
		email: String,
	}

	let profile =
		client.current_user::<Profile>()?.ok_or_else(|| eyre!("Profile should be stored."))?;

	assert_eq!(profile.email, "ada@example.edu");
	assert!(client.is_signed_in()?);

	client.sign_out()?;

	assert_eq!(store.load()?, StoreSnapshot::default());

	Ok(())
}
