//! Typed operation wrappers over [`ApiClient`].
//!
//! Each wrapper binds an endpoint (and method) once and tracks the lifecycle of its latest call
//! in a shared [`RequestState`], so a view layer can render loading and error states without
//! re-implementing the bookkeeping. Wrappers add no error handling of their own: the value
//! returned by a call is exactly what the executor produced.

// self
use crate::{
	_prelude::*,
	client::{ApiClient, Payload, RawResponse, RequestOptions},
	http::{Method, MultipartForm},
	obs::Operation,
};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Lifecycle of the latest call issued through a wrapper.
#[derive(Clone, Debug, Default)]
pub enum RequestState<T> {
	/// No call issued yet (or the wrapper is disabled).
	#[default]
	Idle,
	/// A call is in flight.
	Loading,
	/// The latest call succeeded.
	Success(T),
	/// The latest call failed.
	Failed(Error),
}
impl<T> RequestState<T> {
	/// Whether no call has been issued.
	pub fn is_idle(&self) -> bool {
		matches!(self, Self::Idle)
	}

	/// Whether a call is in flight.
	pub fn is_loading(&self) -> bool {
		matches!(self, Self::Loading)
	}

	/// Whether the latest call succeeded.
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success(_))
	}

	/// Whether the latest call failed.
	pub fn is_error(&self) -> bool {
		matches!(self, Self::Failed(_))
	}

	/// Data produced by the latest successful call.
	pub fn data(&self) -> Option<&T> {
		match self {
			Self::Success(data) => Some(data),
			_ => None,
		}
	}

	/// Failure produced by the latest call.
	pub fn error(&self) -> Option<&Error> {
		match self {
			Self::Failed(error) => Some(error),
			_ => None,
		}
	}
}

struct Tracker<T>(Arc<RwLock<RequestState<T>>>);
impl<T> Tracker<T>
where
	T: Clone,
{
	fn snapshot(&self) -> RequestState<T> {
		self.0.read().clone()
	}

	fn begin(&self) {
		*self.0.write() = RequestState::Loading;
	}

	fn settle(&self, result: &Result<T>) {
		*self.0.write() = match result {
			Ok(data) => RequestState::Success(data.clone()),
			Err(e) => RequestState::Failed(e.clone()),
		};
	}
}
impl<T> Clone for Tracker<T> {
	fn clone(&self) -> Self {
		Self(Arc::clone(&self.0))
	}
}
impl<T> Default for Tracker<T> {
	fn default() -> Self {
		Self(Arc::new(RwLock::new(RequestState::Idle)))
	}
}

/// `GET` wrapper decoding the payload into `T`.
pub struct Query<T> {
	client: ApiClient,
	endpoint: String,
	enabled: bool,
	state: Tracker<T>,
}
impl<T> Query<T>
where
	T: Clone + DeserializeOwned,
{
	/// Enables or disables the query; a disabled query never touches the network.
	pub fn enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;

		self
	}

	/// In-place variant of [`Query::enabled`].
	pub fn set_enabled(&mut self, enabled: bool) {
		self.enabled = enabled;
	}

	/// Whether the query currently issues requests.
	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	/// Endpoint bound to the query.
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// Current request state (shared with clones of this query).
	pub fn state(&self) -> RequestState<T> {
		self.state.snapshot()
	}

	/// Issues the request; returns `Ok(None)` without any I/O while the query is disabled.
	pub async fn fetch(&self) -> Result<Option<T>> {
		if !self.enabled {
			return Ok(None);
		}

		self.state.begin();

		let result = self.client.get_json::<T>(&self.endpoint).await;

		self.state.settle(&result);

		result.map(Some)
	}

	/// Re-issues the request.
	pub async fn refetch(&self) -> Result<Option<T>> {
		self.fetch().await
	}
}
impl<T> Clone for Query<T> {
	fn clone(&self) -> Self {
		Self {
			client: self.client.clone(),
			endpoint: self.endpoint.clone(),
			enabled: self.enabled,
			state: self.state.clone(),
		}
	}
}
impl<T> Debug for Query<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Query")
			.field("endpoint", &self.endpoint)
			.field("enabled", &self.enabled)
			.finish()
	}
}

/// `POST`/`PUT`/`PATCH`/`DELETE` wrapper sending `Req` as JSON and decoding `Resp`.
pub struct Mutation<Req, Resp> {
	client: ApiClient,
	endpoint: String,
	method: Method,
	on_success: Option<Callback<Resp>>,
	on_error: Option<Callback<Error>>,
	state: Tracker<Resp>,
	_request: PhantomData<fn(Req)>,
}
impl<Req, Resp> Mutation<Req, Resp>
where
	Req: Serialize,
	Resp: Clone + DeserializeOwned,
{
	/// Registers a callback invoked with the decoded payload after each successful call.
	pub fn on_success<F>(mut self, callback: F) -> Self
	where
		F: 'static + Fn(&Resp) + Send + Sync,
	{
		self.on_success = Some(Arc::new(callback));

		self
	}

	/// Registers a callback invoked with the failure after each failed call.
	pub fn on_error<F>(mut self, callback: F) -> Self
	where
		F: 'static + Fn(&Error) + Send + Sync,
	{
		self.on_error = Some(Arc::new(callback));

		self
	}

	/// HTTP method used by the mutation.
	pub fn method(&self) -> Method {
		self.method
	}

	/// Current request state (shared with clones of this mutation).
	pub fn state(&self) -> RequestState<Resp> {
		self.state.snapshot()
	}

	/// Sends `body` (ignored for `DELETE`, which carries no body).
	pub async fn mutate(&self, body: Req) -> Result<Resp> {
		let payload =
			if self.method == Method::Delete { Payload::None } else { Payload::Json(body) };
		let options = RequestOptions { method: self.method, headers: Vec::new(), body: payload };

		self.state.begin();

		let result = self.client.execute::<Req, Resp>(&self.endpoint, options).await;

		self.state.settle(&result);

		match &result {
			Ok(data) =>
				if let Some(callback) = &self.on_success {
					callback(data);
				},
			Err(e) =>
				if let Some(callback) = &self.on_error {
					callback(e);
				},
		}

		result
	}
}
impl<Req, Resp> Clone for Mutation<Req, Resp> {
	fn clone(&self) -> Self {
		Self {
			client: self.client.clone(),
			endpoint: self.endpoint.clone(),
			method: self.method,
			on_success: self.on_success.clone(),
			on_error: self.on_error.clone(),
			state: self.state.clone(),
			_request: PhantomData,
		}
	}
}
impl<Req, Resp> Debug for Mutation<Req, Resp> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Mutation")
			.field("endpoint", &self.endpoint)
			.field("method", &self.method)
			.finish()
	}
}

/// Multipart upload wrapper returning the undecoded response.
#[derive(Clone)]
pub struct Upload {
	client: ApiClient,
	endpoint: String,
	method: Method,
	state: Tracker<RawResponse>,
}
impl Upload {
	/// HTTP method used by the upload (`POST` or `PATCH`).
	pub fn method(&self) -> Method {
		self.method
	}

	/// Current request state.
	pub fn state(&self) -> RequestState<RawResponse> {
		self.state.snapshot()
	}

	/// Sends `form`.
	pub async fn send(&self, form: MultipartForm) -> Result<RawResponse> {
		self.state.begin();

		let result = self.client.send_multipart(self.method, &self.endpoint, form).await;

		self.state.settle(&result);

		result
	}
}
impl Debug for Upload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Upload")
			.field("endpoint", &self.endpoint)
			.field("method", &self.method)
			.finish()
	}
}

/// Binary download wrapper.
#[derive(Clone)]
pub struct Download {
	client: ApiClient,
	endpoint: String,
	state: Tracker<RawResponse>,
}
impl Download {
	/// Current request state.
	pub fn state(&self) -> RequestState<RawResponse> {
		self.state.snapshot()
	}

	/// Fetches the raw body for the caller to persist.
	pub async fn fetch(&self) -> Result<RawResponse> {
		self.state.begin();

		let result = self
			.client
			.execute_raw(&self.endpoint, Operation::Download, RequestOptions::get())
			.await;

		self.state.settle(&result);

		result
	}
}
impl Debug for Download {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Download").field("endpoint", &self.endpoint).finish()
	}
}

impl ApiClient {
	/// Binds a `GET` query to `endpoint`; enabled by default.
	pub fn query<T>(&self, endpoint: impl Into<String>) -> Query<T> {
		Query {
			client: self.clone(),
			endpoint: endpoint.into(),
			enabled: true,
			state: Default::default(),
		}
	}

	/// Binds a JSON `POST` mutation to `endpoint`.
	pub fn post<Req, Resp>(&self, endpoint: impl Into<String>) -> Mutation<Req, Resp> {
		self.mutation(Method::Post, endpoint.into())
	}

	/// Binds a JSON `PUT` mutation to `endpoint`.
	pub fn put<Req, Resp>(&self, endpoint: impl Into<String>) -> Mutation<Req, Resp> {
		self.mutation(Method::Put, endpoint.into())
	}

	/// Binds a JSON `PATCH` mutation to `endpoint`.
	pub fn patch<Req, Resp>(&self, endpoint: impl Into<String>) -> Mutation<Req, Resp> {
		self.mutation(Method::Patch, endpoint.into())
	}

	/// Binds a `DELETE` mutation to `endpoint`; call it with `mutate(())`.
	pub fn delete<Resp>(&self, endpoint: impl Into<String>) -> Mutation<(), Resp> {
		self.mutation(Method::Delete, endpoint.into())
	}

	/// Binds a multipart `POST` upload to `endpoint`.
	pub fn upload(&self, endpoint: impl Into<String>) -> Upload {
		Upload {
			client: self.clone(),
			endpoint: endpoint.into(),
			method: Method::Post,
			state: Default::default(),
		}
	}

	/// Binds a multipart `PATCH` upload to `endpoint`.
	pub fn upload_patch(&self, endpoint: impl Into<String>) -> Upload {
		Upload {
			client: self.clone(),
			endpoint: endpoint.into(),
			method: Method::Patch,
			state: Default::default(),
		}
	}

	/// Binds a binary download to `endpoint`.
	pub fn download(&self, endpoint: impl Into<String>) -> Download {
		Download { client: self.clone(), endpoint: endpoint.into(), state: Default::default() }
	}

	fn mutation<Req, Resp>(&self, method: Method, endpoint: String) -> Mutation<Req, Resp> {
		Mutation {
			client: self.clone(),
			endpoint,
			method,
			on_success: None,
			on_error: None,
			state: Default::default(),
			_request: PhantomData,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ApiError;

	#[test]
	fn request_state_accessors_follow_the_variant() {
		let idle = RequestState::<u8>::default();

		assert!(idle.is_idle());
		assert!(idle.data().is_none());

		let success = RequestState::Success(7_u8);

		assert!(success.is_success());
		assert_eq!(success.data(), Some(&7));

		let failed = RequestState::<u8>::Failed(
			ApiError::new(400, Some("Bad Request"), serde_json::json!({ "error": "Invalid" }))
				.into(),
		);

		assert!(failed.is_error());
		assert_eq!(failed.error().and_then(Error::status), Some(400));
		assert!(!RequestState::<u8>::Loading.is_success());
		assert!(RequestState::<u8>::Loading.is_loading());
	}

	#[test]
	fn tracker_shares_state_across_clones() {
		let tracker = Tracker::<u8>::default();
		let observer = tracker.clone();

		tracker.begin();

		assert!(observer.snapshot().is_loading());

		tracker.settle(&Ok(3));

		assert_eq!(observer.snapshot().data(), Some(&3));
	}
}
