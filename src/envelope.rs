//! Response envelope shapes used by portal endpoints.
//!
//! Most endpoints wrap their payload as `{ message, error, status, data }`, but several answer
//! with the bare resource. [`MaybeEnveloped`] accepts both so call sites do not need to know
//! which shape a given endpoint uses.

// self
use crate::_prelude::*;

/// Envelope status; the API reports either a numeric code or a label such as `"success"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeStatus {
	/// Numeric status code.
	Code(i64),
	/// Textual status label.
	Label(String),
}

/// Standard `{ message, error, status, data }` wrapper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
	/// Human-readable message.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// Error description, present on failures reported with a success status.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Status reported by the API.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<EnvelopeStatus>,
	/// Wrapped payload.
	pub data: T,
}

/// Envelope for endpoints that answer with a message only (no `data`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEnvelope {
	/// Human-readable message.
	#[serde(default)]
	pub message: Option<String>,
	/// Error description.
	#[serde(default)]
	pub error: Option<String>,
	/// Status reported by the API.
	#[serde(default)]
	pub status: Option<EnvelopeStatus>,
}

/// Payload that may or may not be wrapped in an [`Envelope`].
///
/// The enveloped form requires a `data` key; anything else decodes as the bare payload.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MaybeEnveloped<T> {
	/// `{ ..., "data": T }`.
	Enveloped(Envelope<T>),
	/// Bare `T`.
	Bare(T),
}
impl<T> MaybeEnveloped<T> {
	/// Unwraps the payload regardless of shape.
	pub fn into_inner(self) -> T {
		match self {
			Self::Enveloped(envelope) => envelope.data,
			Self::Bare(data) => data,
		}
	}

	/// Message carried by the envelope, if the payload was wrapped.
	pub fn message(&self) -> Option<&str> {
		match self {
			Self::Enveloped(envelope) => envelope.message.as_deref(),
			Self::Bare(_) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[derive(Debug, PartialEq, Deserialize)]
	struct Program {
		id: u32,
		name: String,
	}

	#[test]
	fn maybe_enveloped_accepts_both_shapes() {
		let wrapped: MaybeEnveloped<Program> = serde_json::from_value(json!({
			"message": "ok",
			"status": 200,
			"data": { "id": 7, "name": "Physics" },
		}))
		.expect("Enveloped payload should decode.");

		assert_eq!(wrapped.message(), Some("ok"));
		assert_eq!(wrapped.into_inner(), Program { id: 7, name: "Physics".into() });

		let bare: MaybeEnveloped<Program> =
			serde_json::from_value(json!({ "id": 8, "name": "Chemistry" }))
				.expect("Bare payload should decode.");

		assert_eq!(bare.message(), None);
		assert_eq!(bare.into_inner(), Program { id: 8, name: "Chemistry".into() });
	}

	#[test]
	fn envelope_status_accepts_codes_and_labels() {
		let coded: StatusEnvelope = serde_json::from_value(json!({ "status": 201 }))
			.expect("Numeric status should decode.");
		let labeled: StatusEnvelope =
			serde_json::from_value(json!({ "status": "success", "message": "Saved." }))
				.expect("Textual status should decode.");

		assert_eq!(coded.status, Some(EnvelopeStatus::Code(201)));
		assert_eq!(labeled.status, Some(EnvelopeStatus::Label("success".into())));
		assert_eq!(labeled.message.as_deref(), Some("Saved."));
	}

	#[test]
	fn status_envelope_tolerates_empty_success_body() {
		let empty: StatusEnvelope =
			serde_json::from_value(json!({})).expect("Empty object should decode.");

		assert_eq!(empty, StatusEnvelope::default());
	}
}
