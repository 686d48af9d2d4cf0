//! Stateless OAuth 2.0 authorization-code relay for Sign in with Google and Sign in with
//! Apple: builds provider redirects, receives callbacks, mints ES256 client-secret
//! assertions, and exchanges codes for tokens without keeping any state.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod server;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports, fakes, and fixtures shared by unit and integration tests; enabled
	//! via `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::io::{Error as IoError, ErrorKind as IoErrorKind};
	// crates.io
	use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::Error as JwtError};
	use oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode as HttpStatus,
	};
	// self
	use crate::{
		auth::{APPLE_AUDIENCE, AssertionClaims, AssertionSigner, SigningMaterial},
		flows::{Relay, RelayProvider},
		http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
		oauth::{DefaultTransportErrorMapper, ReqwestTransportErrorMapper},
		provider::{ProviderConfig, ProviderKind},
	};

	/// Location of the P-256 PKCS#8 key used as a stand-in for an Apple `.p8` key.
	pub const TEST_KEY_PATH: &str =
		concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/AuthKey_TEST.p8");
	/// Location of the public half of [`TEST_KEY_PATH`], used to verify minted assertions.
	pub const TEST_PUBLIC_KEY_PATH: &str =
		concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/AuthKey_TEST.pub.pem");
	/// Key identifier paired with the fixture key.
	pub const TEST_KEY_ID: &str = "TESTKEY123";
	/// Team identifier used as the assertion issuer in tests.
	pub const TEST_TEAM_ID: &str = "TEAM456789";

	/// Relay type alias used by reqwest-backed integration tests.
	pub type ReqwestTestRelay = Relay<ReqwestHttpClient, ReqwestTransportErrorMapper>;
	/// Relay type alias used by tests that capture outbound requests.
	pub type RecordingRelay = Relay<RecordingHttpClient, DefaultTransportErrorMapper>;

	/// Reqwest builder that accepts the self-signed certificates produced by `httpmock` and
	/// never follows redirects.
	pub fn test_reqwest_client_builder() -> reqwest::ClientBuilder {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
	}

	/// Builds a reqwest HTTP client from [`test_reqwest_client_builder`].
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = test_reqwest_client_builder()
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Verifies `token` against the fixture public key, audience, and issuer.
	pub fn verify_test_assertion(token: &str) -> Result<AssertionClaims, JwtError> {
		let pem = std::fs::read(TEST_PUBLIC_KEY_PATH).expect("Fixture public key should exist.");
		let key = DecodingKey::from_ec_pem(&pem)?;
		let mut validation = Validation::new(Algorithm::ES256);

		validation.set_audience(&[APPLE_AUDIENCE]);
		validation.set_issuer(&[TEST_TEAM_ID]);

		Ok(jsonwebtoken::decode::<AssertionClaims>(token, &key, &validation)?.claims)
	}

	/// Builds a provider configuration whose endpoints live under `base`.
	pub fn test_provider_config(kind: ProviderKind, base: &str) -> ProviderConfig {
		let url = |path: &str| {
			Url::parse(&format!("{}{path}", base.trim_end_matches('/')))
				.expect("Test endpoint URL should parse.")
		};

		ProviderConfig::builder(kind, format!("{kind}-client-id"))
			.redirect_uri(url(&format!("/oauth2/{kind}")))
			.authorization_endpoint(url("/authorize"))
			.token_endpoint(url("/token"))
			.build()
			.expect("Test provider configuration should build.")
	}

	/// Signing material backed by the fixture key.
	pub fn test_signing_material() -> SigningMaterial {
		SigningMaterial::from_key_file(TEST_KEY_PATH, TEST_KEY_ID, TEST_TEAM_ID)
			.expect("Fixture signing key should be readable.")
	}

	/// Assertion signer backed by the fixture key.
	pub fn test_assertion_signer() -> AssertionSigner {
		AssertionSigner::new(test_signing_material()).expect("Fixture signing key should load.")
	}

	/// Builds a Google (static secret) and Apple (assertion) provider pair under `base`.
	pub fn test_relay_providers(base: &str) -> (RelayProvider, RelayProvider) {
		let google = RelayProvider::with_static_secret(
			test_provider_config(ProviderKind::Google, base),
			"google-static-secret",
		);
		let apple = RelayProvider::with_assertion_signer(
			test_provider_config(ProviderKind::Apple, base),
			test_assertion_signer(),
		);

		(google, apple)
	}

	/// Constructs a reqwest-backed relay pointed at `base`.
	pub fn build_reqwest_test_relay(base: &str) -> ReqwestTestRelay {
		let (google, apple) = test_relay_providers(base);

		Relay::with_http_client(
			google,
			apple,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.expect("Test relay should wire both providers.")
	}

	/// Constructs a relay whose transport records requests instead of sending them.
	pub fn build_recording_relay(http_client: RecordingHttpClient) -> RecordingRelay {
		let (google, apple) = test_relay_providers("https://provider.test");

		Relay::with_http_client(google, apple, http_client, Arc::new(DefaultTransportErrorMapper))
			.expect("Recording relay should wire both providers.")
	}

	/// Outbound request captured by [`RecordingHttpClient`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// HTTP method.
		pub method: String,
		/// Target URI.
		pub uri: String,
		/// Header pairs with lossy UTF-8 values.
		pub headers: Vec<(String, String)>,
		/// Raw request body.
		pub body: Vec<u8>,
	}
	impl RecordedRequest {
		fn capture(request: &HttpRequest) -> Self {
			Self {
				method: request.method().to_string(),
				uri: request.uri().to_string(),
				headers: request
					.headers()
					.iter()
					.map(|(name, value)| {
						(name.to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
					})
					.collect(),
				body: request.body().clone(),
			}
		}

		/// First value of the header called `name`.
		pub fn header(&self, name: &str) -> Option<&str> {
			self.headers
				.iter()
				.find(|(key, _)| key.eq_ignore_ascii_case(name))
				.map(|(_, value)| value.as_str())
		}

		/// Decoded form pairs of the body.
		pub fn form(&self) -> BTreeMap<String, String> {
			url::form_urlencoded::parse(&self.body).into_owned().collect()
		}
	}

	/// Fake transport that records every request and answers with a canned response.
	#[derive(Clone, Debug)]
	pub struct RecordingHttpClient {
		requests: Arc<Mutex<Vec<RecordedRequest>>>,
		reply: CannedReply,
	}
	impl RecordingHttpClient {
		/// Answers every request with `status` and `body` (served as JSON).
		pub fn responding(status: u16, body: impl Into<Vec<u8>>) -> Self {
			Self { requests: Default::default(), reply: CannedReply::Respond(status, body.into()) }
		}

		/// Fails every request with a connection error after recording it.
		pub fn failing() -> Self {
			Self { requests: Default::default(), reply: CannedReply::Refuse }
		}

		/// Records every request and never answers it.
		pub fn stalled() -> Self {
			Self { requests: Default::default(), reply: CannedReply::Stall }
		}

		/// Requests observed so far.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.requests.lock().clone()
		}
	}
	impl TokenHttpClient for RecordingHttpClient {
		type Handle = RecordingHandle;
		type TransportError = IoError;

		fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
			RecordingHandle { client: self.clone(), slot }
		}
	}

	#[derive(Clone, Debug)]
	enum CannedReply {
		Respond(u16, Vec<u8>),
		Refuse,
		Stall,
	}

	/// Handle produced by [`RecordingHttpClient`].
	pub struct RecordingHandle {
		client: RecordingHttpClient,
		slot: ResponseMetadataSlot,
	}
	impl<'c> AsyncHttpClient<'c> for RecordingHandle {
		type Error = HttpClientError<IoError>;
		type Future =
			Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			Box::pin(async move {
				self.slot.take();
				self.client.requests.lock().push(RecordedRequest::capture(&request));

				let (status, body) = match self.client.reply.clone() {
					CannedReply::Respond(status, body) => (status, body),
					CannedReply::Refuse =>
						return Err(HttpClientError::Reqwest(Box::new(IoError::new(
							IoErrorKind::ConnectionRefused,
							"recording transport refuses connections",
						)))),
					CannedReply::Stall => std::future::pending().await,
				};
				let status = HttpStatus::from_u16(status).map_err(|e| {
					HttpClientError::Other(format!("Invalid canned status code: {e}."))
				})?;

				self.slot.store(ResponseMetadata { status: Some(status.as_u16()), elapsed: None });

				let mut response = HttpResponse::new(body);

				*response.status_mut() = status;
				response.headers_mut().insert(
					oauth2::http::header::CONTENT_TYPE,
					oauth2::http::HeaderValue::from_static("application/json"),
				);

				Ok(response)
			})
		}
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tower as _};
