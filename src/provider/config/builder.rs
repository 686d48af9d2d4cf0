// std
use std::iter::IntoIterator;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	provider::{CallbackTransport, ProviderConfig, ProviderEndpoints, ProviderKind},
};

/// Query parameters the redirect builder always sets itself.
pub const RESERVED_AUTHORIZATION_PARAMS: [&str; 4] =
	["client_id", "redirect_uri", "response_type", "scope"];

/// Errors raised while constructing or validating provider configurations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProviderConfigError {
	/// Client identifier is blank.
	#[error("Client identifier must not be empty.")]
	MissingClientId,
	/// Redirect URI was never supplied.
	#[error("Missing redirect URI.")]
	MissingRedirectUri,
	/// A built-in endpoint constant failed to parse.
	#[error("The default {endpoint} endpoint is invalid.")]
	InvalidDefaultEndpoint {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} URL must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which URL failed validation.
		endpoint: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// Endpoint cannot carry query parameters.
	#[error("The {endpoint} URL cannot be used as a base URL: {url}.")]
	OpaqueEndpoint {
		/// Which URL failed validation.
		endpoint: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// An authorization extra would shadow a parameter the relay sets itself.
	#[error("Authorization parameter `{name}` is managed by the relay and cannot be overridden.")]
	ReservedParameter {
		/// Offending parameter name.
		name: String,
	},
}

/// Builder for [`ProviderConfig`] values.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
	/// Provider the configuration targets.
	pub kind: ProviderKind,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Redirect URI registered with the provider.
	pub redirect_uri: Option<Url>,
	/// Authorization endpoint override; the provider default is used when absent.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint override; the provider default is used when absent.
	pub token_endpoint: Option<Url>,
	/// Scope string.
	pub scope: String,
	/// Fixed authorization query parameters.
	pub authorization_extras: Vec<(String, String)>,
	/// Callback transport.
	pub callback: CallbackTransport,
}
impl ProviderConfigBuilder {
	/// Creates a new builder seeded with the provider's documented defaults.
	pub fn new(kind: ProviderKind, client_id: impl Into<String>) -> Self {
		Self {
			kind,
			client_id: client_id.into(),
			redirect_uri: None,
			authorization_endpoint: None,
			token_endpoint: None,
			scope: kind.default_scope().into(),
			authorization_extras: kind
				.authorization_extras()
				.iter()
				.map(|(key, value)| ((*key).into(), (*value).into()))
				.collect(),
			callback: kind.callback_transport(),
		}
	}

	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Overrides the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Overrides the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the scope string.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Adds or replaces a single authorization extra, keeping its original position.
	pub fn authorization_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		let key = key.into();
		let value = value.into();

		match self.authorization_extras.iter_mut().find(|(existing, _)| *existing == key) {
			Some(slot) => slot.1 = value,
			None => self.authorization_extras.push((key, value)),
		}

		self
	}

	/// Replaces every authorization extra.
	pub fn authorization_extras<I, K, V>(mut self, extras: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.authorization_extras =
			extras.into_iter().map(|(key, value)| (key.into(), value.into())).collect();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ProviderConfig, ProviderConfigError> {
		let client_id = self.client_id.trim().to_owned();

		if client_id.is_empty() {
			return Err(ProviderConfigError::MissingClientId);
		}

		let redirect_uri = self.redirect_uri.ok_or(ProviderConfigError::MissingRedirectUri)?;
		let authorization = match self.authorization_endpoint {
			Some(url) => url,
			None => default_endpoint("authorization", self.kind.authorization_endpoint())?,
		};
		let token = match self.token_endpoint {
			Some(url) => url,
			None => default_endpoint("token", self.kind.token_endpoint())?,
		};
		let config = ProviderConfig {
			kind: self.kind,
			client_id,
			redirect_uri,
			endpoints: ProviderEndpoints { authorization, token },
			scope: self.scope.trim().to_owned(),
			authorization_extras: self.authorization_extras,
			callback: self.callback,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ProviderConfig {
	/// Validates invariants for the configuration.
	fn validate(&self) -> Result<(), ProviderConfigError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("redirect", &self.redirect_uri)?;

		if let Some((name, _)) = self
			.authorization_extras
			.iter()
			.find(|(name, _)| RESERVED_AUTHORIZATION_PARAMS.contains(&name.as_str()))
		{
			return Err(ProviderConfigError::ReservedParameter { name: name.clone() });
		}

		Ok(())
	}
}

fn default_endpoint(name: &'static str, raw: &str) -> Result<Url, ProviderConfigError> {
	Url::parse(raw)
		.map_err(|source| ProviderConfigError::InvalidDefaultEndpoint { endpoint: name, source })
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderConfigError> {
	if url.cannot_be_a_base() {
		return Err(ProviderConfigError::OpaqueEndpoint { endpoint: name, url: url.to_string() });
	}

	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ =>
			Err(ProviderConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Ipv4(ip)) => ip.is_loopback(),
		Some(Host::Ipv6(ip)) => ip.is_loopback(),
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse test URL.")
	}

	#[test]
	fn defaults_follow_the_provider_kind() {
		let config = ProviderConfig::builder(ProviderKind::Apple, " com.example.service ")
			.redirect_uri(url("https://relay.example.com/oauth2/apple"))
			.build()
			.expect("Apple defaults should build.");

		assert_eq!(config.client_id, "com.example.service");
		assert_eq!(
			config.endpoints.authorization.as_str(),
			"https://appleid.apple.com/auth/authorize"
		);
		assert_eq!(config.endpoints.token.as_str(), "https://appleid.apple.com/auth/token");
		assert_eq!(config.scope, "name email");
		assert_eq!(config.callback, CallbackTransport::FormPost);
		assert_eq!(
			config.authorization_extras,
			vec![("response_mode".to_owned(), "form_post".to_owned())]
		);
	}

	#[test]
	fn rejects_blank_client_ids_and_missing_redirects() {
		let err = ProviderConfig::builder(ProviderKind::Google, "  ")
			.redirect_uri(url("https://relay.example.com/cb"))
			.build()
			.expect_err("Blank client identifiers should be rejected.");

		assert_eq!(err, ProviderConfigError::MissingClientId);

		let err = ProviderConfig::builder(ProviderKind::Google, "client")
			.build()
			.expect_err("Missing redirect URIs should be rejected.");

		assert_eq!(err, ProviderConfigError::MissingRedirectUri);
	}

	#[test]
	fn rejects_insecure_endpoints_but_allows_loopback() {
		let err = ProviderConfig::builder(ProviderKind::Google, "client")
			.redirect_uri(url("https://relay.example.com/cb"))
			.token_endpoint(url("http://provider.example.com/token"))
			.build()
			.expect_err("Plain HTTP token endpoints should be rejected.");

		assert!(matches!(err, ProviderConfigError::InsecureEndpoint { endpoint: "token", .. }));

		ProviderConfig::builder(ProviderKind::Google, "client")
			.redirect_uri(url("http://localhost:3000/oauth2/google"))
			.authorization_endpoint(url("http://127.0.0.1:8080/authorize"))
			.token_endpoint(url("http://[::1]:8080/token"))
			.build()
			.expect("Loopback endpoints should be accepted for local development.");
	}

	#[test]
	fn rejects_opaque_endpoints() {
		let err = ProviderConfig::builder(ProviderKind::Google, "client")
			.redirect_uri(url("https://relay.example.com/cb"))
			.authorization_endpoint(url("mailto:auth@example.com"))
			.build()
			.expect_err("Opaque URLs cannot carry query parameters.");

		assert!(matches!(
			err,
			ProviderConfigError::OpaqueEndpoint { endpoint: "authorization", .. }
		));
	}

	#[test]
	fn extras_cannot_shadow_managed_parameters() {
		let err = ProviderConfig::builder(ProviderKind::Google, "client")
			.redirect_uri(url("https://relay.example.com/cb"))
			.authorization_extra("scope", "everything")
			.build()
			.expect_err("Extras must not override the scope parameter.");

		assert_eq!(err, ProviderConfigError::ReservedParameter { name: "scope".into() });
	}

	#[test]
	fn authorization_extra_replaces_in_place() {
		let config = ProviderConfig::builder(ProviderKind::Google, "client")
			.redirect_uri(url("https://relay.example.com/cb"))
			.authorization_extra("prompt", "select_account")
			.authorization_extra("hd", "example.com")
			.build()
			.expect("Extras should build.");

		assert_eq!(
			config.authorization_extras,
			vec![
				("access_type".to_owned(), "offline".to_owned()),
				("prompt".to_owned(), "select_account".to_owned()),
				("hd".to_owned(), "example.com".to_owned()),
			]
		);
	}
}
