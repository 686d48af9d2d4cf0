//! Immutable provider configuration consumed by the redirect builder and exchange client.

/// Builder API for assembling provider configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	provider::{CallbackTransport, ProviderKind},
};

/// Endpoint set declared by a provider configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint users are redirected to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges.
	pub token: Url,
}

/// Immutable, validated configuration for one provider.
///
/// Built once at start-up and shared read-only for the life of the process. The client
/// secret is deliberately absent: it is supplied per exchange by a
/// [`ClientCredential`](crate::auth::ClientCredential) so the configuration never has to
/// know whether the secret is static or derived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
	/// Provider this configuration targets.
	pub kind: ProviderKind,
	/// OAuth 2.0 client identifier (the Services ID for Apple).
	pub client_id: String,
	/// Redirect URI registered with the provider.
	pub redirect_uri: Url,
	/// Endpoint definitions.
	pub endpoints: ProviderEndpoints,
	/// Space-delimited scope string sent verbatim.
	pub scope: String,
	/// Fixed authorization query parameters, appended in order.
	pub authorization_extras: Vec<(String, String)>,
	/// How the provider returns the authorization code.
	pub callback: CallbackTransport,
}
impl ProviderConfig {
	/// Creates a new builder seeded with the provider's defaults.
	pub fn builder(kind: ProviderKind, client_id: impl Into<String>) -> ProviderConfigBuilder {
		ProviderConfigBuilder::new(kind, client_id)
	}
}
