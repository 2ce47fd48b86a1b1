//! Single-flight access-token refresh.
//!
//! [`RefreshCoordinator`] owns the one "refresh in flight" slot shared by every request issued
//! through a client. The first caller to observe a rejected access token installs a handle in
//! the slot while still holding the slot lock, before any await point, so callers arriving
//! concurrently always find the handle and attach to it instead of starting a second refresh.
//! Everyone attached to a handle observes the same outcome (the same new token or the same
//! failure), and the slot is emptied as soon as that outcome is known so the next rejection
//! starts a fresh refresh.
//!
//! The handle stores its outcome in an [`async_lock::OnceCell`]. If the caller driving the
//! refresh is dropped mid-flight, one of the remaining callers resumes driving the same handle,
//! so an abandoned request never leaves the slot occupied by an operation nobody completes.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::RefreshFailure,
	obs::{self, Operation, Outcome},
};

/// Result shared by every caller attached to one refresh operation.
pub type RefreshOutcome = Result<TokenSecret, RefreshFailure>;

/// Receives session-termination notices (e.g. to navigate to the sign-in screen).
pub trait SessionListener
where
	Self: Send + Sync,
{
	/// Called once per refresh operation that ended the session; tokens are already cleared.
	fn on_session_expired(&self, reason: &RefreshFailure);
}

#[derive(Default)]
struct InFlight {
	outcome: OnceCell<RefreshOutcome>,
}

/// Coordinates concurrent refresh requests so at most one refresh runs at a time.
#[derive(Default)]
pub struct RefreshCoordinator {
	slot: Mutex<Option<Arc<InFlight>>>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates a coordinator with an empty slot.
	pub fn new() -> Self {
		Self::default()
	}

	/// Counters describing the coordinator's activity so far.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Whether a refresh operation currently occupies the slot.
	pub fn is_in_flight(&self) -> bool {
		self.slot.lock().is_some()
	}

	/// Runs `refresh` unless an operation is already in flight, in which case the caller waits
	/// for that operation's outcome instead.
	///
	/// `refresh` is only invoked by the caller that drives the operation, so it must perform the
	/// complete refresh (read the refresh token, call the endpoint, persist the result).
	pub async fn run<F, Fut>(&self, refresh: F) -> RefreshOutcome
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = RefreshOutcome>,
	{
		let handle = self.acquire();
		let pending = &handle;
		let drove = AtomicBool::new(false);
		let driving = &drove;
		let outcome = handle
			.outcome
			.get_or_init(|| async move {
				driving.store(true, Ordering::Relaxed);
				self.metrics.record_attempt();
				obs::record_outcome(Operation::Refresh, Outcome::Attempt);

				let outcome = refresh().await;

				match &outcome {
					Ok(_) => self.metrics.record_success(),
					Err(_) => self.metrics.record_failure(),
				}

				// The slot is empty before any waiter observes the outcome.
				self.release(pending);

				outcome
			})
			.await
			.clone();

		if !drove.load(Ordering::Relaxed) {
			self.metrics.record_join();
			obs::record_outcome(Operation::Refresh, Outcome::Join);
		}

		outcome
	}

	fn acquire(&self) -> Arc<InFlight> {
		let mut slot = self.slot.lock();

		if let Some(existing) = slot.as_ref() {
			return Arc::clone(existing);
		}

		let handle = Arc::new(InFlight::default());

		*slot = Some(Arc::clone(&handle));

		handle
	}

	fn release(&self, handle: &Arc<InFlight>) {
		let mut slot = self.slot.lock();

		if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, handle)) {
			*slot = None;
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("in_flight", &self.is_in_flight())
			.field("metrics", &self.metrics)
			.finish()
	}
}
