//! Thread-safe in-memory [`TokenStore`] implementation for tests and short-lived sessions.

// self
use crate::{
	_prelude::*,
	store::{StoreError, StoreSnapshot, TokenStore},
};

/// Thread-safe storage backend that keeps tokens in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<StoreSnapshot>>);
impl MemoryStore {
	/// Creates a store seeded with the provided snapshot.
	pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
		Self(Arc::new(RwLock::new(snapshot)))
	}
}
impl TokenStore for MemoryStore {
	fn load(&self) -> Result<StoreSnapshot, StoreError> {
		Ok(self.0.read().clone())
	}

	fn modify(&self, change: &mut dyn FnMut(&mut StoreSnapshot)) -> Result<(), StoreError> {
		let mut guard = self.0.write();

		change(&mut *guard);

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{CredentialPair, TokenSecret};

	#[test]
	fn set_and_remove_tokens() {
		let store = MemoryStore::default();

		store.set_tokens(CredentialPair::new("a1", "r1")).expect("Saving tokens should succeed.");

		assert_eq!(
			store.credentials().expect("Reading tokens should succeed."),
			Some(CredentialPair::new("a1", "r1"))
		);

		store.set_access_token(TokenSecret::new("a2")).expect("Replacing access should succeed.");

		assert_eq!(
			store.access_token().expect("Reading access should succeed."),
			Some(TokenSecret::new("a2"))
		);
		assert_eq!(
			store.refresh_token().expect("Reading refresh should succeed."),
			Some(TokenSecret::new("r1"))
		);

		store.remove_tokens().expect("Clearing tokens should succeed.");

		assert!(store.access_token().expect("Reading access should succeed.").is_none());
		assert!(store.refresh_token().expect("Reading refresh should succeed.").is_none());
	}

	#[test]
	fn user_blob_is_stored_verbatim_and_survives_token_removal() {
		let store = MemoryStore::default();
		let user = serde_json::json!({ "id": 7, "role": "admin", "speciality": null });

		store.set_user(user.clone()).expect("Saving user should succeed.");
		store.set_tokens(CredentialPair::new("a1", "r1")).expect("Saving tokens should succeed.");
		store.remove_tokens().expect("Clearing tokens should succeed.");

		assert_eq!(store.user().expect("Reading user should succeed."), Some(user));

		store.remove_user().expect("Clearing user should succeed.");

		assert!(store.user().expect("Reading user should succeed.").is_none());
	}

	#[test]
	fn clones_share_state() {
		let store = MemoryStore::default();
		let view = store.clone();

		store.set_tokens(CredentialPair::new("a1", "r1")).expect("Saving tokens should succeed.");

		assert_eq!(
			view.access_token().expect("Reading access should succeed."),
			Some(TokenSecret::new("a1"))
		);
	}
}
