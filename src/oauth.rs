//! Provider-agnostic token exchange client and transport error mapping.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest,
	http::{
		HeaderValue, Method,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::{ConfigError, ExchangeError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{ProviderConfig, ProviderKind},
};

pub(crate) type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Maps HTTP transport failures into relay [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a relay error.
	fn map_transport_error(
		&self,
		provider: ProviderKind,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Mapper usable with any transport; every failure becomes [`ExchangeError::Transport`].
#[derive(Clone, Debug, Default)]
pub struct DefaultTransportErrorMapper;
impl<E> TransportErrorMapper<E> for DefaultTransportErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(
		&self,
		_: ProviderKind,
		_: Option<&ResponseMetadata>,
		err: HttpClientError<E>,
	) -> Error {
		map_common_transport_error(err, |inner| TransportError::network(inner).into())
	}
}

/// Mapper for reqwest-backed transports that recognises timeouts and builder failures.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		provider: ProviderKind,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		map_common_transport_error(err, |inner| map_reqwest_error(provider, meta, inner))
	}
}

/// Token endpoint response passed through to the caller untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenExchangeResult {
	/// HTTP status returned by the provider.
	pub status: u16,
	/// `Content-Type` of the provider response, when present.
	pub content_type: Option<String>,
	/// Verbatim response body.
	pub body: Vec<u8>,
}
impl TokenExchangeResult {
	/// Consumes the result, returning the raw body.
	pub fn into_body(self) -> Vec<u8> {
		self.body
	}
}

/// Performs the authorization-code exchange against a provider token endpoint.
///
/// The client never learns where the secret came from; static and derived secrets travel
/// through the same request path.
pub struct TokenExchangeClient<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client over the provided transport and mapper.
	pub fn new(http_client: impl Into<Arc<C>>, error_mapper: impl Into<Arc<M>>) -> Self {
		Self { http_client: http_client.into(), error_mapper: error_mapper.into() }
	}

	/// Exchanges `code` for tokens, sending exactly one POST and never retrying.
	pub fn exchange_code<'a>(
		&'a self,
		config: &'a ProviderConfig,
		code: &'a str,
		client_secret: &'a Secret,
	) -> FacadeFuture<'a, TokenExchangeResult> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let request = build_token_request(config, code, client_secret)?;
			let handle = self.http_client.with_metadata(meta.clone());
			let response = handle.call(request).await.map_err(|err| {
				self.error_mapper.map_transport_error(config.kind, meta.take().as_ref(), err)
			})?;
			let status = response.status();
			let content_type = response
				.headers()
				.get(CONTENT_TYPE)
				.and_then(|value| value.to_str().ok())
				.map(ToOwned::to_owned);
			let body = response.into_body();

			if !status.is_success() {
				return Err(
					ExchangeError::Rejected { status: status.as_u16(), content_type, body }.into()
				);
			}

			Ok(TokenExchangeResult { status: status.as_u16(), content_type, body })
		})
	}
}
impl<C, M> Debug for TokenExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenExchangeClient(..)")
	}
}

/// Encodes the `authorization_code` grant request for `config`.
pub fn build_token_request(
	config: &ProviderConfig,
	code: &str,
	client_secret: &Secret,
) -> Result<HttpRequest> {
	let body = Serializer::new(String::new())
		.append_pair("client_id", &config.client_id)
		.append_pair("client_secret", client_secret.expose())
		.append_pair("code", code)
		.append_pair("grant_type", "authorization_code")
		.append_pair("redirect_uri", config.redirect_uri.as_str())
		.finish();

	oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(config.endpoints.token.as_str())
		.header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
		.header(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE))
		.body(body.into_bytes())
		.map_err(|e| ConfigError::from(e).into())
}

fn map_common_transport_error<E>(
	err: HttpClientError<E>,
	on_transport: impl FnOnce(E) -> Error,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => on_transport(*inner),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Other { message }.into(),
		_ => TransportError::Other { message: "unrecognised transport failure".into() }.into(),
	}
}

fn map_reqwest_error(
	provider: ProviderKind,
	meta: Option<&ResponseMetadata>,
	err: ReqwestError,
) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		tracing::warn!(
			provider = provider.as_str(),
			status = meta.and_then(|m| m.status),
			"Token endpoint request timed out."
		);

		return Error::Timeout;
	}

	TransportError::from(err).into()
}
