//! Relay-level error types shared across the signer, exchange client, and HTTP adapter.

// std
use std::{io::Error as IoError, path::PathBuf};
// self
use crate::{
	_prelude::*,
	auth::AssertionError,
	provider::{ProviderConfigError, ProviderKind},
};

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Client assertion could not be produced.
	#[error(transparent)]
	Assertion(#[from] AssertionError),
	/// Token endpoint call failed or was rejected.
	#[error(transparent)]
	Exchange(#[from] ExchangeError),

	/// Callback arrived without an authorization code.
	#[error("Callback did not include an authorization code.")]
	MissingCode,
	/// Provider redirected back with an OAuth error instead of a code.
	#[error("Provider denied the authorization request: {error}.")]
	ProviderDenied {
		/// Provider-supplied OAuth `error` field.
		error: String,
		/// Provider-supplied OAuth `error_description` field.
		description: Option<String>,
	},
	/// Callback payload could not be decoded.
	#[error("Callback payload could not be read: {reason}.")]
	InvalidCallback {
		/// Decoder-supplied reason string.
		reason: String,
	},
	/// Token exchange was abandoned before the provider answered.
	#[error("Token exchange timed out.")]
	Timeout,
}
impl Error {
	/// Stable machine-readable code used in error payloads.
	pub fn code(&self) -> &'static str {
		match self {
			Error::Config(_) => "configuration_error",
			Error::Assertion(_) => "assertion_failed",
			Error::Exchange(_) => "exchange_failed",
			Error::MissingCode => "missing_code",
			Error::ProviderDenied { .. } => "authorization_denied",
			Error::InvalidCallback { .. } => "invalid_callback",
			Error::Timeout => "timeout",
		}
	}

	/// Returns true when the caller (not the relay or provider) caused the failure.
	pub fn is_client_error(&self) -> bool {
		matches!(
			self,
			Error::MissingCode | Error::ProviderDenied { .. } | Error::InvalidCallback { .. }
		)
	}
}
impl From<TransportError> for Error {
	fn from(e: TransportError) -> Self {
		ExchangeError::from(e).into()
	}
}

/// Configuration and start-up failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required environment variable is absent or blank.
	#[error("Environment variable `{name}` is required.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable is present but unusable.
	#[error("Environment variable `{name}` is invalid: {reason}.")]
	InvalidEnv {
		/// Variable name.
		name: &'static str,
		/// Parser-supplied reason string.
		reason: String,
	},
	/// The `.env` file exists but could not be loaded.
	#[error("The .env file could not be loaded.")]
	DotEnv {
		/// Underlying loader failure.
		#[source]
		source: dotenvy::Error,
	},
	/// Provider configuration failed validation.
	#[error("Provider `{provider}` is misconfigured.")]
	Provider {
		/// Provider whose configuration failed.
		provider: ProviderKind,
		/// Validation failure.
		#[source]
		source: ProviderConfigError,
	},
	/// Provider configuration was wired into the wrong relay slot.
	#[error("Expected a `{expected}` provider but received `{actual}`.")]
	ProviderMismatch {
		/// Slot the configuration was wired into.
		expected: ProviderKind,
		/// Kind declared by the configuration.
		actual: ProviderKind,
	},
	/// Private key file could not be read.
	#[error("Private key file `{}` could not be read.", .path.display())]
	KeyFile {
		/// Path that failed to load.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: IoError,
	},
	/// Private key material is malformed or does not match the declared algorithm.
	#[error("Private key material is unusable for {algorithm}.")]
	SigningKey {
		/// Declared signing algorithm.
		algorithm: String,
		/// Underlying key parsing or signing failure.
		#[source]
		source: BoxError,
	},
	/// Assertion validity window is outside the range providers accept.
	#[error("Assertion validity window must be between 1 second and {max}, got {window}.")]
	AssertionWindow {
		/// Requested window.
		window: Duration,
		/// Largest accepted window.
		max: Duration,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a key parsing or probe-signing failure inside [`ConfigError`].
	pub fn signing_key(
		algorithm: impl Debug,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::SigningKey { algorithm: format!("{algorithm:?}"), source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token endpoint failures surfaced by the exchange client.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint rejected the exchange with HTTP {status}.")]
	Rejected {
		/// HTTP status code returned by the provider.
		status: u16,
		/// `Content-Type` of the provider response, when present.
		content_type: Option<String>,
		/// Verbatim provider response body.
		body: Vec<u8>,
	},
	/// Request never produced a response.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl ExchangeError {
	/// HTTP status returned by the provider, when one was received.
	pub fn provider_status(&self) -> Option<u16> {
		match self {
			ExchangeError::Rejected { status, .. } => Some(*status),
			ExchangeError::Transport(_) => None,
		}
	}

	/// Verbatim provider response body, when one was received.
	pub fn provider_body(&self) -> Option<&[u8]> {
		match self {
			ExchangeError::Rejected { body, .. } => Some(body),
			ExchangeError::Transport(_) => None,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] IoError),
	/// Transport reported a failure without a typed source.
	#[error("HTTP client error occurred while calling the token endpoint: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
