//! Token storage contract and built-in backends.
//!
//! A [`TokenStore`] holds the session's access + refresh tokens and an opaque profile blob
//! under the `access_token`, `refresh_token`, and `user` keys. Backends implement two
//! primitives, [`TokenStore::load`] and [`TokenStore::modify`]; the typed accessors are
//! derived from them, so every write (e.g. [`TokenStore::set_tokens`]) replaces both tokens
//! under a single lock and concurrent readers never observe a half-updated pair.

pub mod detached;
pub mod file;
pub mod memory;

pub use detached::DetachedStore;
pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenSecret},
};

/// Persisted contents of a token store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
	/// Current access token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
	/// Current refresh token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Signed-in profile, stored verbatim.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<JsonValue>,
}

/// Storage backend contract implemented by token stores.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Whether the backing storage can be used in the current context.
	///
	/// When `false` every read yields `None` and every write is a no-op.
	fn is_available(&self) -> bool {
		true
	}

	/// Returns a consistent copy of the stored values.
	fn load(&self) -> Result<StoreSnapshot, StoreError>;

	/// Applies `change` to the stored values under the backend's write lock and persists the
	/// result.
	fn modify(&self, change: &mut dyn FnMut(&mut StoreSnapshot)) -> Result<(), StoreError>;

	/// Reads the current access token.
	fn access_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.snapshot()?.access_token)
	}

	/// Reads the current refresh token.
	fn refresh_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.snapshot()?.refresh_token)
	}

	/// Reads both tokens when both are present.
	fn credentials(&self) -> Result<Option<CredentialPair>, StoreError> {
		let snapshot = self.snapshot()?;

		Ok(snapshot
			.access_token
			.zip(snapshot.refresh_token)
			.map(|(access, refresh)| CredentialPair { access, refresh }))
	}

	/// Replaces both tokens.
	fn set_tokens(&self, pair: CredentialPair) -> Result<(), StoreError> {
		let mut pair = Some(pair);

		self.apply(&mut |snapshot| {
			if let Some(CredentialPair { access, refresh }) = pair.take() {
				snapshot.access_token = Some(access);
				snapshot.refresh_token = Some(refresh);
			}
		})
	}

	/// Replaces the access token and keeps the stored refresh token.
	fn set_access_token(&self, access: TokenSecret) -> Result<(), StoreError> {
		let mut access = Some(access);

		self.apply(&mut |snapshot| {
			if let Some(value) = access.take() {
				snapshot.access_token = Some(value);
			}
		})
	}

	/// Clears both tokens.
	fn remove_tokens(&self) -> Result<(), StoreError> {
		self.apply(&mut |snapshot| {
			snapshot.access_token = None;
			snapshot.refresh_token = None;
		})
	}

	/// Reads the stored profile blob.
	fn user(&self) -> Result<Option<JsonValue>, StoreError> {
		Ok(self.snapshot()?.user)
	}

	/// Stores the profile blob verbatim.
	fn set_user(&self, user: JsonValue) -> Result<(), StoreError> {
		let mut user = Some(user);

		self.apply(&mut |snapshot| {
			if let Some(value) = user.take() {
				snapshot.user = Some(value);
			}
		})
	}

	/// Clears the stored profile blob.
	fn remove_user(&self) -> Result<(), StoreError> {
		self.apply(&mut |snapshot| snapshot.user = None)
	}

	#[doc(hidden)]
	fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
		if self.is_available() { self.load() } else { Ok(StoreSnapshot::default()) }
	}

	#[doc(hidden)]
	fn apply(&self, change: &mut dyn FnMut(&mut StoreSnapshot)) -> Result<(), StoreError> {
		if self.is_available() { self.modify(change) } else { Ok(()) }
	}
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
