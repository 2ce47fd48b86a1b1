//! Optional observability helpers for API calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `admissions_client.request` with the
//!   `operation` and `endpoint` fields, plus debug/warn events at refresh decision points.
//! - Enable `metrics` to increment the `admissions_client_request_total` counter for every
//!   attempt/retry/join/success/failure, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, http::Method};

/// Call sites observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// JSON read.
	Get,
	/// JSON create.
	Post,
	/// JSON replace.
	Put,
	/// JSON partial update.
	Patch,
	/// Resource removal.
	Delete,
	/// Multipart upload via `POST`.
	Upload,
	/// Multipart upload via `PATCH`.
	UploadPatch,
	/// Raw binary read.
	Download,
	/// Access-token refresh.
	Refresh,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Get => "get",
			Operation::Post => "post",
			Operation::Put => "put",
			Operation::Patch => "patch",
			Operation::Delete => "delete",
			Operation::Upload => "upload",
			Operation::UploadPatch => "upload_patch",
			Operation::Download => "download",
			Operation::Refresh => "refresh",
		}
	}

	/// Maps a JSON request method onto its operation label.
	pub const fn for_json(method: Method) -> Self {
		match method {
			Method::Get => Operation::Get,
			Method::Post => Operation::Post,
			Method::Put => Operation::Put,
			Method::Patch => Operation::Patch,
			Method::Delete => Operation::Delete,
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a client call.
	Attempt,
	/// Request replayed after a token refresh.
	Retry,
	/// Refresh request attached to one already in flight.
	Join,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Retry => "retry",
			Outcome::Join => "join",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
