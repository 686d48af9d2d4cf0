//! Supported identity providers and their documented conventions.

// self
use crate::_prelude::*;

/// Identity providers the relay knows how to talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
	/// Google OpenID Connect; static client secret, code delivered in the query string.
	Google,
	/// Sign in with Apple; assertion client secret, code delivered by form POST.
	Apple,
}
impl ProviderKind {
	/// Every supported provider.
	pub const ALL: [ProviderKind; 2] = [ProviderKind::Google, ProviderKind::Apple];

	/// Returns a stable label suitable for routes, span fields, and metric labels.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProviderKind::Google => "google",
			ProviderKind::Apple => "apple",
		}
	}

	/// Production authorization endpoint.
	pub const fn authorization_endpoint(self) -> &'static str {
		match self {
			ProviderKind::Google => "https://accounts.google.com/o/oauth2/v2/auth",
			ProviderKind::Apple => "https://appleid.apple.com/auth/authorize",
		}
	}

	/// Production token endpoint.
	pub const fn token_endpoint(self) -> &'static str {
		match self {
			ProviderKind::Google => "https://oauth2.googleapis.com/token",
			ProviderKind::Apple => "https://appleid.apple.com/auth/token",
		}
	}

	/// Scope requested when the operator does not override it.
	pub const fn default_scope(self) -> &'static str {
		match self {
			ProviderKind::Google => "openid email profile",
			ProviderKind::Apple => "name email",
		}
	}

	/// Fixed authorization query parameters appended after the standard ones.
	pub const fn authorization_extras(self) -> &'static [(&'static str, &'static str)] {
		match self {
			ProviderKind::Google => &[("access_type", "offline"), ("prompt", "consent")],
			// Apple only posts `user` details back when the response mode is `form_post`.
			ProviderKind::Apple => &[("response_mode", "form_post")],
		}
	}

	/// How the provider hands the authorization code back to the redirect URI.
	pub const fn callback_transport(self) -> CallbackTransport {
		match self {
			ProviderKind::Google => CallbackTransport::Query,
			ProviderKind::Apple => CallbackTransport::FormPost,
		}
	}
}
impl Display for ProviderKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ProviderKind {
	type Err = UnknownProvider;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ProviderKind::ALL
			.into_iter()
			.find(|kind| kind.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| UnknownProvider(s.to_owned()))
	}
}

/// Raised when parsing a provider label the relay does not support.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Provider `{0}` is not supported.")]
pub struct UnknownProvider(pub String);

/// Channel a provider uses to return the authorization code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackTransport {
	/// `GET` redirect with `code` in the query string.
	Query,
	/// `POST` with an `application/x-www-form-urlencoded` body containing `code`.
	FormPost,
}
