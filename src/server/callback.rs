//! Authorization callback decoding.
//!
//! Google redirects the browser back with the code in the query string, Apple posts it as
//! `application/x-www-form-urlencoded`, and native clients forward it as JSON. All three
//! land in [`CallbackParams`].

// std
use std::borrow::Cow;
// crates.io
use axum::http::{HeaderMap, header::CONTENT_TYPE};
use url::form_urlencoded;
// self
use crate::_prelude::*;

/// Parameters a provider (or client) sends back after consent.
///
/// Unknown fields, such as Apple's `user` and `id_token`, are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
	/// Authorization code.
	pub code: Option<String>,
	/// Opaque state echoed by the provider.
	pub state: Option<String>,
	/// OAuth error code returned instead of a code.
	pub error: Option<String>,
	/// Human-readable description accompanying `error`.
	pub error_description: Option<String>,
}
impl CallbackParams {
	/// Decodes a raw query string; the first occurrence of each field wins.
	pub fn from_query(query: Option<&str>) -> Self {
		query
			.map(|raw| Self::from_pairs(form_urlencoded::parse(raw.as_bytes())))
			.unwrap_or_default()
	}

	/// Decodes a request body as JSON or as a form, based on `Content-Type`.
	///
	/// Bodies without a content type are sniffed: a leading `{` selects JSON.
	pub fn from_body(headers: &HeaderMap, body: &[u8]) -> Result<Self> {
		let content_type = headers
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.map(|value| value.trim().to_ascii_lowercase());
		let is_json = match &content_type {
			Some(value) => is_json_media_type(value),
			None => body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{'),
		};

		if is_json {
			return Self::from_json(body);
		}

		Ok(Self::from_pairs(form_urlencoded::parse(body)))
	}

	/// Returns the authorization code, or the reason none can be exchanged.
	///
	/// A provider `error` takes precedence over a code.
	pub fn into_code(self) -> Result<String> {
		let Self { code, error, error_description, .. } = self;

		if let Some(error) = error.filter(|value| !value.trim().is_empty()) {
			return Err(Error::ProviderDenied { error, description: error_description });
		}

		match code {
			Some(code) if !code.trim().is_empty() => Ok(code),
			_ => Err(Error::MissingCode),
		}
	}

	fn from_json(body: &[u8]) -> Result<Self> {
		let mut deserializer = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			let path = e.path().to_string();

			Error::InvalidCallback { reason: format!("{} at `{path}`", e.into_inner()) }
		})
	}

	fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Self {
		let mut params = Self::default();

		for (key, value) in pairs {
			let slot = match key.as_ref() {
				"code" => &mut params.code,
				"state" => &mut params.state,
				"error" => &mut params.error,
				"error_description" => &mut params.error_description,
				_ => continue,
			};

			slot.get_or_insert_with(|| value.into_owned());
		}

		params
	}
}

fn is_json_media_type(content_type: &str) -> bool {
	let essence = content_type.split(';').next().unwrap_or_default().trim();

	essence == "application/json" || essence.ends_with("+json")
}

#[cfg(test)]
mod tests {
	// crates.io
	use axum::http::HeaderValue;
	// self
	use super::*;

	fn headers(content_type: &'static str) -> HeaderMap {
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));

		headers
	}

	#[test]
	fn query_strings_decode_with_first_value_winning() {
		let params = CallbackParams::from_query(Some("code=4%2F0Ab&state=xyz&code=second"));

		assert_eq!(params.code.as_deref(), Some("4/0Ab"));
		assert_eq!(params.state.as_deref(), Some("xyz"));
		assert_eq!(CallbackParams::from_query(None), CallbackParams::default());
	}

	#[test]
	fn apple_form_posts_ignore_unknown_fields() {
		let body = b"state=s&code=abc123&id_token=x.y.z&user=%7B%22name%22%3A%7B%7D%7D";
		let params = CallbackParams::from_body(
			&headers("application/x-www-form-urlencoded"),
			body,
		)
		.expect("Form bodies should decode.");

		assert_eq!(params.code.as_deref(), Some("abc123"));
		assert_eq!(params.state.as_deref(), Some("s"));
	}

	#[test]
	fn json_bodies_decode_with_or_without_content_type() {
		let typed = CallbackParams::from_body(
			&headers("application/json; charset=utf-8"),
			br#"{"code":"abc123","platform":"ios"}"#,
		)
		.expect("JSON bodies should decode.");
		let sniffed = CallbackParams::from_body(&HeaderMap::new(), br#"  {"code":"abc123"}"#)
			.expect("Untyped JSON bodies should be sniffed.");

		assert_eq!(typed.code.as_deref(), Some("abc123"));
		assert_eq!(sniffed.code.as_deref(), Some("abc123"));
	}

	#[test]
	fn malformed_json_names_the_offending_field() {
		let err = CallbackParams::from_body(&headers("application/json"), br#"{"code":42}"#)
			.expect_err("Numeric codes should be rejected.");

		match err {
			Error::InvalidCallback { reason } => assert!(reason.contains("`code`"), "{reason}"),
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn provider_errors_take_precedence_over_codes() {
		let params = CallbackParams::from_query(Some(
			"error=access_denied&error_description=User+cancelled&code=abc",
		));

		match params.into_code() {
			Err(Error::ProviderDenied { error, description }) => {
				assert_eq!(error, "access_denied");
				assert_eq!(description.as_deref(), Some("User cancelled"));
			},
			other => panic!("Unexpected result: {other:?}."),
		}
	}

	#[test]
	fn blank_or_absent_codes_are_missing() {
		for query in [None, Some("state=xyz"), Some("code="), Some("code=%20%20")] {
			assert!(matches!(
				CallbackParams::from_query(query).into_code(),
				Err(Error::MissingCode)
			));
		}
	}
}
