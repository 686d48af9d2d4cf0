//! HTTP adapter exposing the relay over axum.
//!
//! | Method | Path | Behaviour |
//! |---|---|---|
//! | GET | `/` | Liveness probe, `200` with an empty body. |
//! | GET | `/sign-in-with-google` | `302` to the Google authorization URL. |
//! | GET | `/sign-in-with-apple` | `302` to the Apple authorization URL. |
//! | GET | `/oauth2/google` | Exchanges the `code` query parameter. |
//! | POST | `/oauth2/google` | Exchanges the `code` field of a JSON or form body. |
//! | POST | `/oauth2/apple` | Exchanges the `code` field of a form (or JSON) body. |

pub mod callback;
pub mod handlers;
pub mod response;

pub use callback::*;
pub use response::*;

// std
use std::time::Duration as StdDuration;
// crates.io
use axum::{
	Router,
	routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
// self
use crate::{
	_prelude::*,
	auth::AssertionSigner,
	config::Config,
	error::ConfigError,
	flows::{Relay, RelayProvider, ReqwestRelay},
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{ReqwestTransportErrorMapper, TransportErrorMapper},
};

/// Shared, read-only state handed to every handler.
pub struct AppState<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Relay serving both providers.
	pub relay: Arc<Relay<C, M>>,
	/// What the callback routes return on success.
	pub response_mode: ResponseMode,
	/// Upper bound for a single token exchange, if any.
	pub exchange_timeout: Option<StdDuration>,
}
impl<C, M> AppState<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Wraps `relay` with the default response mode and no exchange timeout.
	pub fn new(relay: impl Into<Arc<Relay<C, M>>>) -> Self {
		Self { relay: relay.into(), response_mode: ResponseMode::default(), exchange_timeout: None }
	}

	/// Sets what the callback routes return on success.
	pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
		self.response_mode = mode;

		self
	}

	/// Bounds every token exchange by `timeout`.
	pub fn with_exchange_timeout(mut self, timeout: StdDuration) -> Self {
		self.exchange_timeout = Some(timeout);

		self
	}
}
impl AppState {
	/// Builds the production state: parses the Apple key, then wires a reqwest-backed relay.
	pub fn from_config(config: Config) -> Result<Self, ConfigError> {
		let signer = AssertionSigner::new(config.apple_signing)?;
		let google =
			RelayProvider::with_static_secret(config.google, config.google_client_secret.expose());
		let apple = RelayProvider::with_assertion_signer(config.apple, signer);
		let mut state = Self::new(ReqwestRelay::new(google, apple)?)
			.with_response_mode(config.response_mode);

		state.exchange_timeout = config.exchange_timeout;

		Ok(state)
	}
}
impl<C, M> Clone for AppState<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			relay: self.relay.clone(),
			response_mode: self.response_mode,
			exchange_timeout: self.exchange_timeout,
		}
	}
}
impl<C, M> Debug for AppState<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState")
			.field("relay", &self.relay)
			.field("response_mode", &self.response_mode)
			.field("exchange_timeout", &self.exchange_timeout)
			.finish()
	}
}

/// Builds the relay router with request tracing and permissive CORS.
pub fn router<C, M>(state: AppState<C, M>) -> Router
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	Router::new()
		.route("/", get(handlers::liveness))
		.route("/sign-in-with-google", get(handlers::sign_in_with_google::<C, M>))
		.route("/sign-in-with-apple", get(handlers::sign_in_with_apple::<C, M>))
		.route(
			"/oauth2/google",
			get(handlers::google_callback_query::<C, M>)
				.post(handlers::google_callback_body::<C, M>),
		)
		.route("/oauth2/apple", post(handlers::apple_callback::<C, M>))
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(state)
}
