//! Credential pair stored per session and the refresh endpoint's wire payloads.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access + refresh secrets issued on sign-in or registration completion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived bearer credential.
	pub access: TokenSecret,
	/// Longer-lived credential exchanged for new access tokens.
	pub refresh: TokenSecret,
}
impl CredentialPair {
	/// Creates a pair from raw token strings.
	pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
		Self { access: TokenSecret::new(access), refresh: TokenSecret::new(refresh) }
	}
}

/// JSON body posted to the refresh endpoint.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
	/// Currently stored refresh token.
	pub refresh: &'a str,
}

/// Success body returned by the refresh endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RefreshGrant {
	/// Newly minted access token.
	pub access: TokenSecret,
	/// Rotated refresh token, when the issuer rotates.
	#[serde(default)]
	pub refresh: Option<TokenSecret>,
}
impl RefreshGrant {
	/// Returns the rotated refresh token, ignoring blank values.
	pub fn rotated_refresh(&self) -> Option<&TokenSecret> {
		self.refresh.as_ref().filter(|secret| !secret.is_empty())
	}
}
