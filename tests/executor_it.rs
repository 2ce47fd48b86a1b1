#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use admissions_client::{
	_preludet::*,
	auth::CredentialPair,
	client::RequestOptions,
	envelope::{MaybeEnveloped, StatusEnvelope},
	http::Method,
	store::TokenStore,
};

#[derive(Clone, Debug, PartialEq, Deserialize)]
struct Program {
	id: u32,
	name: String,
}

#[tokio::test]
async fn bearer_and_json_content_type_are_attached() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url());

	store.set_tokens(CredentialPair::new("a1", "r1")).expect("Seeding tokens should succeed.");

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/applicant/programs/")
				.header("authorization", "Bearer a1")
				.header("content-type", "application/json")
				.json_body(json!({ "name": "Physics" }));
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"id\":1,\"name\":\"Physics\"}");
		})
		.await;
	let program: Program = client
		.send_json(Method::Post, "/applicant/programs/", &json!({ "name": "Physics" }))
		.await
		.expect("Authorized create should succeed.");

	mock.assert_async().await;

	assert_eq!(program, Program { id: 1, name: "Physics".into() });
}

#[tokio::test]
async fn anonymous_reads_succeed_without_stored_tokens() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_reqwest_test_client(&server.base_url());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/programs/public/");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let programs: Vec<Program> =
		client.get_json("programs/public/").await.expect("Anonymous read should succeed.");

	mock.assert_async().await;

	assert!(programs.is_empty());
}

#[tokio::test]
async fn caller_headers_are_merged() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url());

	store.set_tokens(CredentialPair::new("a1", "r1")).expect("Seeding tokens should succeed.");

	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/applicant/profile/")
				.header("authorization", "Bearer a1")
				.header("accept-language", "de");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"data\":{\"id\":3,\"name\":\"Ada\"}}");
		})
		.await;
	let profile: MaybeEnveloped<Program> = client
		.execute("/applicant/profile/", RequestOptions::get().header("Accept-Language", "de"))
		.await
		.expect("Read with caller headers should succeed.");

	mock.assert_async().await;

	assert_eq!(profile.into_inner(), Program { id: 3, name: "Ada".into() });
}

#[tokio::test]
async fn error_message_prefers_error_then_message_then_status_text() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_reqwest_test_client(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(POST).path("/with-error/");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"Invalid exam year\",\"message\":\"ignored\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/with-message/");
			then.status(422)
				.header("content-type", "application/json")
				.body("{\"message\":\"Transcript missing\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/plain/");
			then.status(404).header("content-type", "text/html").body("<h1>nope</h1>");
		})
		.await;

	let cases = [
		("/with-error/", 400, "Invalid exam year"),
		("/with-message/", 422, "Transcript missing"),
		("/plain/", 404, "Not Found"),
	];

	for (endpoint, status, message) in cases {
		let err = client
			.send_json::<_, JsonValue>(Method::Post, endpoint, &json!({}))
			.await
			.expect_err("Non-success status should fail.");
		let api = err.api_error().expect("Failure should carry the API error.");

		assert!(!err.is_session_expired());
		assert_eq!(api.status, status);
		assert_eq!(api.message, message);
	}
}

#[tokio::test]
async fn retry_after_is_exposed_on_api_errors() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_reqwest_test_client(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(GET).path("/busy/");
			then.status(429).header("retry-after", "30").body("");
		})
		.await;

	let err = client.get_json::<JsonValue>("/busy/").await.expect_err("429 should fail.");
	let api = err.api_error().expect("Failure should carry the API error.");

	assert_eq!(api.status, 429);
	assert_eq!(api.retry_after, Some(Duration::seconds(30)));
	assert_eq!(api.body, json!({}));
}

#[tokio::test]
async fn empty_and_non_json_success_bodies_decode_as_empty_objects() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_reqwest_test_client(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(DELETE).path("/applicant/documents/9/");
			then.status(204);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/health/");
			then.status(200).header("content-type", "text/plain").body("ok");
		})
		.await;

	let deleted: StatusEnvelope = client
		.delete_resource("/applicant/documents/9/")
		.await
		.expect("Empty success body should decode.");
	let health = client
		.execute_value("/health/", RequestOptions::get())
		.await
		.expect("Non-JSON success body should be tolerated.");

	assert_eq!(deleted, StatusEnvelope::default());
	assert_eq!(health, json!({}));
}

#[tokio::test]
async fn schema_mismatch_is_a_decode_error() {
	let server = MockServer::start_async().await;
	let (client, _store) = build_reqwest_test_client(&server.base_url());

	server
		.mock_async(|when, then| {
			when.method(GET).path("/programs/1/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":\"one\",\"name\":\"Physics\"}");
		})
		.await;

	let err = client.get_json::<Program>("/programs/1/").await.expect_err("Mismatch should fail.");

	assert!(matches!(err, Error::Decode { ref endpoint, .. } if endpoint == "/programs/1/"));
	assert_eq!(err.status(), None);
}

#[tokio::test]
async fn transport_failures_are_not_api_errors() {
	let (client, store) = build_reqwest_test_client("http://127.0.0.1:9");

	store.set_tokens(CredentialPair::new("a1", "r1")).expect("Seeding tokens should succeed.");

	let err =
		client.get_json::<JsonValue>("/anything/").await.expect_err("Closed port should fail.");
	let access = store.access_token().expect("Store read should succeed.");

	assert!(matches!(err, Error::Transport(_)));
	assert_eq!(access.as_ref().map(|secret| secret.expose()), Some("a1"));
}
