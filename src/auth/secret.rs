//! The `client_secret` value presented to a token endpoint.

// self
use crate::_prelude::*;

/// A provider `client_secret`: either the operator-supplied Google secret or a freshly signed
/// Apple assertion.
///
/// Formatting never reveals the value, so secrets can sit inside configs and errors that get
/// logged. Only the token request body reads it through [`Secret::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);
impl Secret {
	/// Takes ownership of a client secret or signed assertion.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Raw value for the `client_secret` form field.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Secret(<redacted>)")
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
