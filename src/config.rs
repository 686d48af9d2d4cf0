//! Start-up configuration read once from the environment.
//!
//! Handlers never touch the environment; everything they need is resolved here, validated,
//! and injected through [`AppState`](crate::server::AppState).

// std
use std::{
	net::{IpAddr, Ipv4Addr, SocketAddr},
	path::PathBuf,
	time::Duration as StdDuration,
};
// self
use crate::{
	_prelude::*,
	auth::{Secret, SigningMaterial},
	error::ConfigError,
	provider::{ProviderConfig, ProviderKind},
	server::ResponseMode,
};

/// Environment variable names understood by [`Config::from_env`].
pub mod env {
	/// Listener port.
	pub const PORT: &str = "PORT";
	/// Listener address, defaults to `0.0.0.0`.
	pub const HOST: &str = "HOST";
	/// Google OAuth client identifier.
	pub const GOOGLE_OAUTH_CLIENT_ID: &str = "GOOGLE_OAUTH_CLIENT_ID";
	/// Google OAuth client secret.
	pub const GOOGLE_OAUTH_CLIENT_SECRET: &str = "GOOGLE_OAUTH_CLIENT_SECRET";
	/// Redirect URI registered with Google.
	pub const GOOGLE_REDIRECT_URI: &str = "GOOGLE_REDIRECT_URI";
	/// Scope override for Google.
	pub const GOOGLE_SCOPE: &str = "GOOGLE_SCOPE";
	/// Authorization endpoint override for Google.
	pub const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "GOOGLE_AUTHORIZATION_ENDPOINT";
	/// Token endpoint override for Google.
	pub const GOOGLE_TOKEN_ENDPOINT: &str = "GOOGLE_TOKEN_ENDPOINT";
	/// Apple Services ID.
	pub const APPLE_OAUTH_CLIENT_ID: &str = "APPLE_OAUTH_CLIENT_ID";
	/// Apple developer team identifier, used as the assertion issuer.
	pub const APPLE_DEVELOPER_TEAM_ID: &str = "APPLE_DEVELOPER_TEAM_ID";
	/// Identifier of the Apple signing key.
	pub const APPLE_KEY_ID: &str = "APPLE_KEY_ID";
	/// Redirect URI registered with Apple.
	pub const APPLE_REDIRECT_URI: &str = "APPLE_REDIRECT_URI";
	/// Path of the `.p8` signing key.
	pub const APPLE_OAUTH_CLIENT_SECRET_FILENAME: &str = "APPLE_OAUTH_CLIENT_SECRET_FILENAME";
	/// Scope override for Apple.
	pub const APPLE_SCOPE: &str = "APPLE_SCOPE";
	/// Authorization endpoint override for Apple.
	pub const APPLE_AUTHORIZATION_ENDPOINT: &str = "APPLE_AUTHORIZATION_ENDPOINT";
	/// Token endpoint override for Apple.
	pub const APPLE_TOKEN_ENDPOINT: &str = "APPLE_TOKEN_ENDPOINT";
	/// `passthrough` (default) or `acknowledge`.
	pub const RELAY_RESPONSE_MODE: &str = "RELAY_RESPONSE_MODE";
	/// Upper bound, in seconds, for a single token exchange.
	pub const TOKEN_EXCHANGE_TIMEOUT_SECS: &str = "TOKEN_EXCHANGE_TIMEOUT_SECS";
}

/// Loads `.env` from the working directory or its ancestors into the process environment.
///
/// Variables already set in the environment win. A missing file is not an error.
pub fn load_dotenv() -> Result<Option<PathBuf>, ConfigError> {
	match dotenvy::dotenv() {
		Ok(path) => Ok(Some(path)),
		Err(e) if e.not_found() => Ok(None),
		Err(source) => Err(ConfigError::DotEnv { source }),
	}
}

/// Fully validated relay configuration.
#[derive(Clone, Debug)]
pub struct Config {
	/// Socket address the HTTP listener binds.
	pub listen_addr: SocketAddr,
	/// Google provider configuration.
	pub google: ProviderConfig,
	/// Static Google client secret.
	pub google_client_secret: Secret,
	/// Apple provider configuration.
	pub apple: ProviderConfig,
	/// Key material used to mint Apple client secrets.
	pub apple_signing: SigningMaterial,
	/// What the callback routes return on success.
	pub response_mode: ResponseMode,
	/// Upper bound for a single token exchange, if any.
	pub exchange_timeout: Option<StdDuration>,
}
impl Config {
	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through `lookup`; blank values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let vars = Vars(lookup);
		let host = match vars.optional(env::HOST) {
			Some(raw) => vars.parse::<IpAddr>(env::HOST, &raw)?,
			None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
		};
		let port = vars.parse::<u16>(env::PORT, &vars.required(env::PORT)?)?;
		let google = ProviderSection {
			kind: ProviderKind::Google,
			client_id: env::GOOGLE_OAUTH_CLIENT_ID,
			redirect_uri: env::GOOGLE_REDIRECT_URI,
			scope: env::GOOGLE_SCOPE,
			authorization_endpoint: env::GOOGLE_AUTHORIZATION_ENDPOINT,
			token_endpoint: env::GOOGLE_TOKEN_ENDPOINT,
		}
		.load(&vars)?;
		let google_client_secret = Secret::new(vars.required(env::GOOGLE_OAUTH_CLIENT_SECRET)?);
		let apple = ProviderSection {
			kind: ProviderKind::Apple,
			client_id: env::APPLE_OAUTH_CLIENT_ID,
			redirect_uri: env::APPLE_REDIRECT_URI,
			scope: env::APPLE_SCOPE,
			authorization_endpoint: env::APPLE_AUTHORIZATION_ENDPOINT,
			token_endpoint: env::APPLE_TOKEN_ENDPOINT,
		}
		.load(&vars)?;
		let apple_signing = SigningMaterial::from_key_file(
			vars.required(env::APPLE_OAUTH_CLIENT_SECRET_FILENAME)?,
			vars.required(env::APPLE_KEY_ID)?,
			vars.required(env::APPLE_DEVELOPER_TEAM_ID)?,
		)?;
		let response_mode = match vars.optional(env::RELAY_RESPONSE_MODE) {
			Some(raw) => vars.parse::<ResponseMode>(env::RELAY_RESPONSE_MODE, &raw)?,
			None => ResponseMode::default(),
		};
		let exchange_timeout = match vars.optional(env::TOKEN_EXCHANGE_TIMEOUT_SECS) {
			Some(raw) => match vars.parse::<u64>(env::TOKEN_EXCHANGE_TIMEOUT_SECS, &raw)? {
				0 =>
					return Err(ConfigError::InvalidEnv {
						name: env::TOKEN_EXCHANGE_TIMEOUT_SECS,
						reason: "must be at least one second".into(),
					}),
				secs => Some(StdDuration::from_secs(secs)),
			},
			None => None,
		};

		Ok(Self {
			listen_addr: SocketAddr::new(host, port),
			google,
			google_client_secret,
			apple,
			apple_signing,
			response_mode,
			exchange_timeout,
		})
	}
}

struct Vars<F>(F);
impl<F> Vars<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn optional(&self, name: &'static str) -> Option<String> {
		(self.0)(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
	}

	fn required(&self, name: &'static str) -> Result<String, ConfigError> {
		self.optional(name).ok_or(ConfigError::MissingEnv { name })
	}

	fn parse<T>(&self, name: &'static str, raw: &str) -> Result<T, ConfigError>
	where
		T: FromStr,
		T::Err: Display,
	{
		raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnv { name, reason: e.to_string() })
	}

	fn url(&self, name: &'static str, raw: &str) -> Result<Url, ConfigError> {
		self.parse(name, raw)
	}
}

struct ProviderSection {
	kind: ProviderKind,
	client_id: &'static str,
	redirect_uri: &'static str,
	scope: &'static str,
	authorization_endpoint: &'static str,
	token_endpoint: &'static str,
}
impl ProviderSection {
	fn load<F>(&self, vars: &Vars<F>) -> Result<ProviderConfig, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let redirect_uri = vars.url(self.redirect_uri, &vars.required(self.redirect_uri)?)?;
		let mut builder = ProviderConfig::builder(self.kind, vars.required(self.client_id)?)
			.redirect_uri(redirect_uri);

		if let Some(scope) = vars.optional(self.scope) {
			builder = builder.scope(scope);
		}
		if let Some(raw) = vars.optional(self.authorization_endpoint) {
			builder = builder.authorization_endpoint(vars.url(self.authorization_endpoint, &raw)?);
		}
		if let Some(raw) = vars.optional(self.token_endpoint) {
			builder = builder.token_endpoint(vars.url(self.token_endpoint, &raw)?);
		}

		builder.build().map_err(|source| ConfigError::Provider { provider: self.kind, source })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, provider::ProviderConfigError};

	fn base_env() -> BTreeMap<&'static str, String> {
		BTreeMap::from([
			(env::PORT, "8080".to_owned()),
			(env::GOOGLE_OAUTH_CLIENT_ID, "google-id".to_owned()),
			(env::GOOGLE_OAUTH_CLIENT_SECRET, "google-secret".to_owned()),
			(env::GOOGLE_REDIRECT_URI, "https://relay.example.com/oauth2/google".to_owned()),
			(env::APPLE_OAUTH_CLIENT_ID, "com.example.service".to_owned()),
			(env::APPLE_DEVELOPER_TEAM_ID, TEST_TEAM_ID.to_owned()),
			(env::APPLE_KEY_ID, TEST_KEY_ID.to_owned()),
			(env::APPLE_REDIRECT_URI, "https://relay.example.com/oauth2/apple".to_owned()),
			(env::APPLE_OAUTH_CLIENT_SECRET_FILENAME, TEST_KEY_PATH.to_owned()),
		])
	}

	fn load(vars: &BTreeMap<&'static str, String>) -> Result<Config, ConfigError> {
		Config::from_lookup(|name| vars.get(name).cloned())
	}

	#[test]
	fn minimal_environment_uses_defaults() {
		let config = load(&base_env()).expect("Minimal environment should load.");

		assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().expect("Address should parse."));
		assert_eq!(config.google.client_id, "google-id");
		assert_eq!(config.google.scope, "openid email profile");
		assert_eq!(config.google_client_secret.expose(), "google-secret");
		assert_eq!(config.apple.client_id, "com.example.service");
		assert_eq!(config.apple.endpoints.token.as_str(), "https://appleid.apple.com/auth/token");
		assert_eq!(config.apple_signing.key_id, TEST_KEY_ID);
		assert_eq!(config.apple_signing.issuer, TEST_TEAM_ID);
		assert_eq!(config.response_mode, ResponseMode::Passthrough);
		assert_eq!(config.exchange_timeout, None);
	}

	#[test]
	fn optional_overrides_are_applied() {
		let mut vars = base_env();

		vars.insert(env::HOST, "127.0.0.1".into());
		vars.insert(env::GOOGLE_SCOPE, "openid email".into());
		vars.insert(env::APPLE_TOKEN_ENDPOINT, "http://localhost:9000/token".into());
		vars.insert(env::RELAY_RESPONSE_MODE, "acknowledge".into());
		vars.insert(env::TOKEN_EXCHANGE_TIMEOUT_SECS, "15".into());

		let config = load(&vars).expect("Overrides should load.");

		assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().expect("Address should parse."));
		assert_eq!(config.google.scope, "openid email");
		assert_eq!(config.apple.endpoints.token.as_str(), "http://localhost:9000/token");
		assert_eq!(config.response_mode, ResponseMode::Acknowledge);
		assert_eq!(config.exchange_timeout, Some(StdDuration::from_secs(15)));
	}

	#[test]
	fn missing_and_blank_values_are_reported_by_name() {
		let mut vars = base_env();

		vars.remove(env::APPLE_KEY_ID);

		assert!(matches!(
			load(&vars),
			Err(ConfigError::MissingEnv { name: env::APPLE_KEY_ID })
		));

		let mut vars = base_env();

		vars.insert(env::GOOGLE_OAUTH_CLIENT_SECRET, "   ".into());

		assert!(matches!(
			load(&vars),
			Err(ConfigError::MissingEnv { name: env::GOOGLE_OAUTH_CLIENT_SECRET })
		));
	}

	#[test]
	fn malformed_values_are_rejected() {
		for (name, value) in [
			(env::PORT, "eighty"),
			(env::HOST, "relay.example.com"),
			(env::GOOGLE_REDIRECT_URI, "not a url"),
			(env::RELAY_RESPONSE_MODE, "echo"),
			(env::TOKEN_EXCHANGE_TIMEOUT_SECS, "0"),
		] {
			let mut vars = base_env();

			vars.insert(name, value.into());

			match load(&vars) {
				Err(ConfigError::InvalidEnv { name: reported, .. }) => assert_eq!(reported, name),
				other => panic!("Expected `{name}` to be rejected, got {other:?}."),
			}
		}
	}

	#[test]
	fn insecure_endpoints_fail_provider_validation() {
		let mut vars = base_env();

		vars.insert(env::GOOGLE_TOKEN_ENDPOINT, "http://tokens.example.com/token".into());

		match load(&vars) {
			Err(ConfigError::Provider { provider, source }) => {
				assert_eq!(provider, ProviderKind::Google);
				assert!(matches!(source, ProviderConfigError::InsecureEndpoint { .. }));
			},
			other => panic!("Expected a provider error, got {other:?}."),
		}
	}

	#[test]
	fn unreadable_key_files_are_reported() {
		let mut vars = base_env();

		vars.insert(env::APPLE_OAUTH_CLIENT_SECRET_FILENAME, "/nonexistent/AuthKey.p8".into());

		assert!(matches!(load(&vars), Err(ConfigError::KeyFile { .. })));
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let config = load(&base_env()).expect("Minimal environment should load.");
		let rendered = format!("{config:?}");

		assert!(!rendered.contains("google-secret"));
		assert!(!rendered.contains("PRIVATE KEY"));
	}
}
