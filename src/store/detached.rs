//! Store used where no persistent client storage exists (e.g. server-side rendering).

// self
use crate::store::{StoreError, StoreSnapshot, TokenStore};

/// Storage stand-in that reports itself unavailable; reads yield nothing and writes no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedStore;
impl TokenStore for DetachedStore {
	fn is_available(&self) -> bool {
		false
	}

	fn load(&self) -> Result<StoreSnapshot, StoreError> {
		Ok(StoreSnapshot::default())
	}

	fn modify(&self, _change: &mut dyn FnMut(&mut StoreSnapshot)) -> Result<(), StoreError> {
		Ok(())
	}
}
