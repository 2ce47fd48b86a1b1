// self
use crate::{_prelude::*, obs::Operation};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by client calls.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided operation + endpoint.
	pub fn new(operation: Operation, endpoint: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"admissions_client.request",
				operation = operation.as_str(),
				endpoint
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, endpoint);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug-level event inside the current span.
pub fn debug_event(message: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::debug!("{message}");
	#[cfg(not(feature = "tracing"))]
	let _ = message;
}

/// Emits a warn-level event carrying the failure that caused it.
pub fn warn_event(message: &'static str, cause: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%cause, "{message}");
	#[cfg(not(feature = "tracing"))]
	let _ = (message, cause);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn events_are_infallible_without_subscriber() {
		debug_event("refresh skipped");
		warn_event("refresh failed", &"connection reset");
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = CallSpan::new(Operation::Refresh, "/auth/token/refresh/");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
