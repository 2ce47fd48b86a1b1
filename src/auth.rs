//! Credential model: redacted secrets, the stored credential pair, and refresh payloads.

pub mod credentials;
pub mod secret;

pub use credentials::*;
pub use secret::*;
