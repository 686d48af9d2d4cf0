//! Client secret sources presented to token endpoints.
//!
//! The exchange client only ever sees a [`Secret`]; whether it came from static
//! configuration or was minted as a signed assertion is decided here.

// self
use crate::{
	_prelude::*,
	auth::{AssertionSigner, Secret},
};

/// Where a `client_secret` comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKind {
	/// Shared secret issued by the provider and read from configuration.
	Static,
	/// Signed assertion minted for every exchange.
	Assertion,
}
impl CredentialKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKind::Static => "static",
			CredentialKind::Assertion => "assertion",
		}
	}
}
impl Display for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Produces the `client_secret` for a single token exchange.
pub trait ClientCredential
where
	Self: Send + Sync,
{
	/// Returns the secret to present on behalf of `client_id`.
	fn client_secret(&self, client_id: &str) -> Result<Secret>;

	/// Describes the provenance of the secrets this source hands out.
	fn kind(&self) -> CredentialKind;
}

/// Secret configured once at start-up and presented verbatim.
#[derive(Clone, Debug)]
pub struct StaticSecret(Secret);
impl StaticSecret {
	/// Wraps a configured client secret.
	pub fn new(secret: impl Into<String>) -> Self {
		Self(Secret::new(secret))
	}
}
impl ClientCredential for StaticSecret {
	fn client_secret(&self, _client_id: &str) -> Result<Secret> {
		Ok(self.0.clone())
	}

	fn kind(&self) -> CredentialKind {
		CredentialKind::Static
	}
}

impl ClientCredential for AssertionSigner {
	fn client_secret(&self, client_id: &str) -> Result<Secret> {
		self.sign_assertion(client_id).map_err(Error::from)
	}

	fn kind(&self) -> CredentialKind {
		CredentialKind::Assertion
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::test_assertion_signer;

	#[test]
	fn static_secret_is_returned_verbatim() {
		let credential = StaticSecret::new("configured");
		let secret = credential.client_secret("client").expect("Static secret should resolve.");

		assert_eq!(secret.expose(), "configured");
		assert_eq!(credential.kind(), CredentialKind::Static);
	}

	#[test]
	fn assertion_credential_mints_a_token_per_call() {
		let credential: Arc<dyn ClientCredential> = Arc::new(test_assertion_signer());
		let first = credential.client_secret("com.example.service").expect("First assertion.");
		let second = credential.client_secret("com.example.service").expect("Second assertion.");

		assert_eq!(credential.kind(), CredentialKind::Assertion);
		assert_eq!(first.expose().split('.').count(), 3);
		assert_ne!(first, second);
	}
}
