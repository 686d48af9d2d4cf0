//! Authorization-code exchange orchestration.
//!
//! Each call resolves the provider's client secret (static, or a freshly minted assertion)
//! and hands it to the shared [`TokenExchangeClient`](crate::oauth::TokenExchangeClient).
//! Nothing is cached between calls.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	flows::Relay,
	http::TokenHttpClient,
	oauth::{FacadeFuture, TokenExchangeResult, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::ProviderKind,
};

impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges `code` with the `kind` provider's token endpoint.
	///
	/// A blank code fails with [`Error::MissingCode`] before any secret is minted or request
	/// is sent.
	pub fn exchange_code<'a>(
		&'a self,
		kind: ProviderKind,
		code: &'a str,
	) -> FacadeFuture<'a, TokenExchangeResult> {
		self.exchange_code_within(kind, code, None)
	}

	/// Same as [`Relay::exchange_code`], abandoning the exchange with [`Error::Timeout`] once
	/// `limit` elapses.
	///
	/// An abandoned exchange is recorded as a failed flow.
	pub fn exchange_code_within<'a>(
		&'a self,
		kind: ProviderKind,
		code: &'a str,
		limit: Option<StdDuration>,
	) -> FacadeFuture<'a, TokenExchangeResult> {
		const KIND: FlowKind = FlowKind::Exchange;

		let span = FlowSpan::new(KIND, kind, "exchange_code");

		obs::record_flow_outcome(KIND, kind, FlowOutcome::Attempt);

		Box::pin(span.instrument(async move {
			let exchange = self.exchange_code_once(kind, code);
			let result = match limit {
				Some(limit) => match tokio::time::timeout(limit, exchange).await {
					Ok(result) => result,
					Err(_) => {
						tracing::warn!(?limit, "Token exchange timed out.");

						Err(Error::Timeout)
					},
				},
				None => exchange.await,
			};

			match &result {
				Ok(response) => {
					tracing::info!(status = response.status, "Token exchange completed.");
					obs::record_flow_outcome(KIND, kind, FlowOutcome::Success);
				},
				Err(e) => {
					tracing::warn!(error = %e, "Token exchange failed.");
					obs::record_flow_outcome(KIND, kind, FlowOutcome::Failure);
				},
			}

			result
		}))
	}

	async fn exchange_code_once(
		&self,
		kind: ProviderKind,
		code: &str,
	) -> Result<TokenExchangeResult> {
		if code.trim().is_empty() {
			return Err(Error::MissingCode);
		}

		let provider = self.provider(kind);
		let secret = provider.credential.client_secret(&provider.config.client_id)?;

		tracing::debug!(credential = %provider.credential.kind(), "Client secret resolved.");

		self.exchange_client.exchange_code(&provider.config, code, &secret).await
	}
}
