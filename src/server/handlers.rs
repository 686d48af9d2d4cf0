//! Route handlers.

// crates.io
use axum::{
	body::Bytes,
	extract::{RawQuery, State},
	http::{HeaderMap, StatusCode, header::LOCATION},
	response::{IntoResponse, Response},
};
// self
use crate::{
	_prelude::*,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	provider::ProviderKind,
	server::{AppState, CallbackParams},
};

/// `GET /`.
pub async fn liveness() -> StatusCode {
	StatusCode::OK
}

/// `GET /sign-in-with-google`.
pub async fn sign_in_with_google<C, M>(State(state): State<AppState<C, M>>) -> Response
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	redirect_to_provider(&state, ProviderKind::Google)
}

/// `GET /sign-in-with-apple`.
pub async fn sign_in_with_apple<C, M>(State(state): State<AppState<C, M>>) -> Response
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	redirect_to_provider(&state, ProviderKind::Apple)
}

/// `GET /oauth2/google`, the browser redirect carrying `code` in the query string.
pub async fn google_callback_query<C, M>(
	State(state): State<AppState<C, M>>,
	RawQuery(query): RawQuery,
) -> Result<Response>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	relay_callback(&state, ProviderKind::Google, CallbackParams::from_query(query.as_deref()))
		.await
}

/// `POST /oauth2/google`, a client posting the code as JSON or a form.
pub async fn google_callback_body<C, M>(
	State(state): State<AppState<C, M>>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Response>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	relay_callback(&state, ProviderKind::Google, CallbackParams::from_body(&headers, &body)?).await
}

/// `POST /oauth2/apple`, Apple's `form_post` callback.
pub async fn apple_callback<C, M>(
	State(state): State<AppState<C, M>>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Response>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	relay_callback(&state, ProviderKind::Apple, CallbackParams::from_body(&headers, &body)?).await
}

fn redirect_to_provider<C, M>(state: &AppState<C, M>, kind: ProviderKind) -> Response
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	let url = state.relay.authorization_url(kind);

	(StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response()
}

async fn relay_callback<C, M>(
	state: &AppState<C, M>,
	kind: ProviderKind,
	params: CallbackParams,
) -> Result<Response>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	let code = params.into_code()?;
	let result = state.relay.exchange_code_within(kind, &code, state.exchange_timeout).await?;

	Ok(state.response_mode.respond(result))
}
