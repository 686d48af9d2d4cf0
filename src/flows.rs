//! Relay orchestration: provider wiring, authorization redirects, and code exchanges.

pub mod authorize;
pub mod exchange;

pub use authorize::*;

// self
use crate::{
	_prelude::*,
	auth::{AssertionSigner, ClientCredential, StaticSecret},
	error::ConfigError,
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{ReqwestTransportErrorMapper, TokenExchangeClient, TransportErrorMapper},
	provider::{ProviderConfig, ProviderKind},
};

/// Relay specialized for the crate's default reqwest transport stack.
pub type ReqwestRelay = Relay<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// A provider configuration paired with the single source of its client secret.
#[derive(Clone)]
pub struct RelayProvider {
	/// Immutable provider configuration.
	pub config: ProviderConfig,
	/// Secret source consulted once per exchange.
	pub credential: Arc<dyn ClientCredential>,
}
impl RelayProvider {
	/// Pairs `config` with an arbitrary credential source.
	pub fn new(config: ProviderConfig, credential: Arc<dyn ClientCredential>) -> Self {
		Self { config, credential }
	}

	/// Pairs `config` with a secret presented verbatim on every exchange.
	pub fn with_static_secret(config: ProviderConfig, secret: impl Into<String>) -> Self {
		Self::new(config, Arc::new(StaticSecret::new(secret)))
	}

	/// Pairs `config` with a signer that mints a fresh assertion per exchange.
	pub fn with_assertion_signer(config: ProviderConfig, signer: AssertionSigner) -> Self {
		Self::new(config, Arc::new(signer))
	}
}
impl Debug for RelayProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RelayProvider")
			.field("config", &self.config)
			.field("credential", &self.credential.kind())
			.finish()
	}
}

/// Coordinates redirects and code exchanges for the Google and Apple providers.
///
/// The relay is built once at start-up and shared read-only behind an [`Arc`]; it keeps
/// no per-request state.
pub struct Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchange client shared by both providers.
	pub exchange_client: TokenExchangeClient<C, M>,
	google: RelayProvider,
	apple: RelayProvider,
}
impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a relay that reuses the caller-provided transport and mapper pair.
	pub fn with_http_client(
		google: RelayProvider,
		apple: RelayProvider,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self, ConfigError> {
		ensure_slot(ProviderKind::Google, &google)?;
		ensure_slot(ProviderKind::Apple, &apple)?;

		Ok(Self { exchange_client: TokenExchangeClient::new(http_client, mapper), google, apple })
	}

	/// Returns the provider wired for `kind`.
	pub fn provider(&self, kind: ProviderKind) -> &RelayProvider {
		match kind {
			ProviderKind::Google => &self.google,
			ProviderKind::Apple => &self.apple,
		}
	}
}
impl ReqwestRelay {
	/// Creates a relay backed by a fresh reqwest client that never follows redirects.
	pub fn new(google: RelayProvider, apple: RelayProvider) -> Result<Self, ConfigError> {
		Self::with_http_client(
			google,
			apple,
			ReqwestHttpClient::new()?,
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay").field("google", &self.google).field("apple", &self.apple).finish()
	}
}

fn ensure_slot(expected: ProviderKind, provider: &RelayProvider) -> Result<(), ConfigError> {
	if provider.config.kind == expected {
		Ok(())
	} else {
		Err(ConfigError::ProviderMismatch { expected, actual: provider.config.kind })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, auth::CredentialKind, oauth::DefaultTransportErrorMapper};

	#[test]
	fn providers_are_wired_by_kind() {
		let relay = build_recording_relay(RecordingHttpClient::responding(200, "{}"));

		assert_eq!(relay.provider(ProviderKind::Google).config.kind, ProviderKind::Google);
		assert_eq!(relay.provider(ProviderKind::Google).credential.kind(), CredentialKind::Static);
		assert_eq!(relay.provider(ProviderKind::Apple).config.kind, ProviderKind::Apple);
		assert_eq!(
			relay.provider(ProviderKind::Apple).credential.kind(),
			CredentialKind::Assertion
		);
	}

	#[test]
	fn swapped_providers_are_rejected() {
		let (google, apple) = test_relay_providers("https://provider.test");
		let err = RecordingRelay::with_http_client(
			apple,
			google,
			RecordingHttpClient::failing(),
			Arc::new(DefaultTransportErrorMapper),
		)
		.expect_err("Swapped providers should be rejected.");

		assert!(matches!(
			err,
			ConfigError::ProviderMismatch {
				expected: ProviderKind::Google,
				actual: ProviderKind::Apple
			}
		));
	}

	#[test]
	fn debug_output_hides_credentials() {
		let relay = build_recording_relay(RecordingHttpClient::failing());
		let rendered = format!("{relay:?}");

		assert!(!rendered.contains("google-static-secret"));
		assert!(rendered.contains("Assertion"));
	}
}
