//! Authorization redirect construction.

// self
use crate::{
	_prelude::*,
	flows::Relay,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{ProviderConfig, ProviderKind},
};

/// Builds the provider authorization URL for `config`.
///
/// Query pairs already present on the endpoint are kept; `client_id`, `redirect_uri`,
/// `response_type=code`, and `scope` follow, then the provider extras in declaration order.
/// Values are encoded with `application/x-www-form-urlencoded` rules.
pub fn build_authorization_url(config: &ProviderConfig) -> Url {
	let mut url = config.endpoints.authorization.clone();

	{
		let mut pairs = url.query_pairs_mut();

		pairs
			.append_pair("client_id", &config.client_id)
			.append_pair("redirect_uri", config.redirect_uri.as_str())
			.append_pair("response_type", "code")
			.append_pair("scope", &config.scope);

		for (key, value) in &config.authorization_extras {
			pairs.append_pair(key, value);
		}
	}

	url
}

impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns the URL the user agent should be redirected to for `kind`.
	pub fn authorization_url(&self, kind: ProviderKind) -> Url {
		const KIND: FlowKind = FlowKind::Authorize;

		let _guard = FlowSpan::new(KIND, kind, "authorization_url").entered();

		obs::record_flow_outcome(KIND, kind, FlowOutcome::Attempt);

		let url = build_authorization_url(&self.provider(kind).config);

		tracing::debug!(host = url.host_str(), "Authorization redirect built.");
		obs::record_flow_outcome(KIND, kind, FlowOutcome::Success);

		url
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	fn pairs(url: &Url) -> Vec<(String, String)> {
		url.query_pairs().into_owned().collect()
	}

	#[test]
	fn google_url_carries_code_flow_parameters() {
		let config = ProviderConfig::builder(ProviderKind::Google, "1234.apps.example.com")
			.redirect_uri(
				Url::parse("https://relay.example.com/oauth2/google")
					.expect("Redirect URI should parse."),
			)
			.build()
			.expect("Google configuration should build.");
		let url = build_authorization_url(&config);

		assert!(url.as_str().starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
		assert_eq!(
			pairs(&url),
			vec![
				("client_id".into(), "1234.apps.example.com".into()),
				("redirect_uri".into(), "https://relay.example.com/oauth2/google".into()),
				("response_type".into(), "code".into()),
				("scope".into(), "openid email profile".into()),
				("access_type".into(), "offline".into()),
				("prompt".into(), "consent".into()),
			]
		);
		assert!(url.as_str().contains("scope=openid+email+profile"));
		assert!(
			url.as_str()
				.contains("redirect_uri=https%3A%2F%2Frelay.example.com%2Foauth2%2Fgoogle")
		);
	}

	#[test]
	fn apple_url_requests_form_post_callbacks() {
		let url = build_authorization_url(&test_provider_config(
			ProviderKind::Apple,
			"https://provider.test",
		));
		let pairs = pairs(&url);

		assert_eq!(pairs.last(), Some(&("response_mode".into(), "form_post".into())));
		assert!(pairs.contains(&("scope".into(), "name email".into())));
		assert!(pairs.contains(&("client_id".into(), "apple-client-id".into())));
	}

	#[test]
	fn existing_query_pairs_are_preserved() {
		let config = ProviderConfig::builder(ProviderKind::Google, "client")
			.redirect_uri(
				Url::parse("https://relay.example.com/cb").expect("Redirect should parse."),
			)
			.authorization_endpoint(
				Url::parse("https://idp.example.com/authorize?tenant=acme")
					.expect("Endpoint should parse."),
			)
			.build()
			.expect("Configuration should build.");
		let url = build_authorization_url(&config);

		assert_eq!(pairs(&url)[0], ("tenant".into(), "acme".into()));
		assert_eq!(pairs(&url)[1], ("client_id".into(), "client".into()));
	}

	#[test]
	fn relay_builds_urls_per_provider() {
		let relay = build_recording_relay(RecordingHttpClient::failing());

		assert!(
			relay
				.authorization_url(ProviderKind::Google)
				.as_str()
				.starts_with("https://provider.test/authorize?client_id=google-client-id")
		);
		assert!(
			relay
				.authorization_url(ProviderKind::Apple)
				.as_str()
				.contains("response_mode=form_post")
		);
	}
}
