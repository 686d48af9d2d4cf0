//! Success and error responses.

// crates.io
use axum::{
	Json,
	http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
	response::{IntoResponse, Response},
};
use serde_json::Value;
// self
use crate::{_prelude::*, error::ExchangeError, oauth::TokenExchangeResult};

/// Response mode parsing failure.
#[derive(Debug, ThisError)]
#[error("Unknown response mode `{0}`; expected `passthrough` or `acknowledge`.")]
pub struct UnknownResponseMode(pub String);

/// What the callback routes return after a successful exchange.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
	/// `200` carrying the provider's token response verbatim.
	#[default]
	Passthrough,
	/// `200` with an empty body.
	Acknowledge,
}
impl ResponseMode {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			ResponseMode::Passthrough => "passthrough",
			ResponseMode::Acknowledge => "acknowledge",
		}
	}

	/// Renders a successful exchange.
	pub fn respond(self, result: TokenExchangeResult) -> Response {
		match self {
			ResponseMode::Passthrough => {
				let content_type = result
					.content_type
					.as_deref()
					.and_then(|value| HeaderValue::from_str(value).ok())
					.unwrap_or(HeaderValue::from_static("application/json"));

				(StatusCode::OK, [(CONTENT_TYPE, content_type)], result.into_body())
					.into_response()
			},
			ResponseMode::Acknowledge => StatusCode::OK.into_response(),
		}
	}
}
impl Display for ResponseMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ResponseMode {
	type Err = UnknownResponseMode;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"passthrough" => Ok(ResponseMode::Passthrough),
			"acknowledge" => Ok(ResponseMode::Acknowledge),
			_ => Err(UnknownResponseMode(s.to_owned())),
		}
	}
}

/// JSON payload returned for every failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Stable machine-readable code.
	pub error: String,
	/// Human-readable message.
	pub message: String,
	/// Provider-supplied `error_description`, for denied authorizations.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_description: Option<String>,
	/// HTTP status the token endpoint answered with.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider_status: Option<u16>,
	/// Token endpoint body, as JSON when it parses and as a string otherwise.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider_response: Option<Value>,
}
impl ErrorBody {
	/// Builds the payload describing `error`.
	pub fn from_error(error: &Error) -> Self {
		let mut body = Self {
			error: error.code().into(),
			message: error.to_string(),
			error_description: None,
			provider_status: None,
			provider_response: None,
		};

		match error {
			Error::ProviderDenied { description, .. } =>
				body.error_description = description.clone(),
			Error::Exchange(exchange @ ExchangeError::Rejected { .. }) => {
				body.provider_status = exchange.provider_status();
				body.provider_response = exchange.provider_body().map(provider_response);
			},
			_ => {},
		}

		body
	}
}

/// HTTP status used for `error`.
pub fn status_for(error: &Error) -> StatusCode {
	match error {
		_ if error.is_client_error() => StatusCode::BAD_REQUEST,
		Error::Timeout => StatusCode::GATEWAY_TIMEOUT,
		_ => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = status_for(&self);

		if status.is_client_error() {
			tracing::warn!(code = self.code(), error = %self, "Rejected callback.");
		} else {
			tracing::error!(code = self.code(), error = ?self, "Relay request failed.");
		}

		(status, Json(ErrorBody::from_error(&self))).into_response()
	}
}

fn provider_response(body: &[u8]) -> Value {
	serde_json::from_slice(body)
		.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn statuses_follow_the_error_taxonomy() {
		assert_eq!(status_for(&Error::MissingCode), StatusCode::BAD_REQUEST);
		assert_eq!(
			status_for(&Error::InvalidCallback { reason: "bad".into() }),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(status_for(&Error::Timeout), StatusCode::GATEWAY_TIMEOUT);
		assert_eq!(
			status_for(&Error::from(ExchangeError::Rejected {
				status: 400,
				content_type: None,
				body: vec![]
			})),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[test]
	fn rejected_exchanges_embed_the_provider_body() {
		let json_body = ErrorBody::from_error(&Error::from(ExchangeError::Rejected {
			status: 400,
			content_type: Some("application/json".into()),
			body: br#"{"error":"invalid_grant"}"#.to_vec(),
		}));
		let text_body = ErrorBody::from_error(&Error::from(ExchangeError::Rejected {
			status: 502,
			content_type: Some("text/html".into()),
			body: b"<html>Bad Gateway</html>".to_vec(),
		}));

		assert_eq!(json_body.error, "exchange_failed");
		assert_eq!(json_body.provider_status, Some(400));
		assert_eq!(json_body.provider_response, Some(json!({ "error": "invalid_grant" })));
		assert_eq!(text_body.provider_response, Some(json!("<html>Bad Gateway</html>")));
	}

	#[test]
	fn client_errors_omit_provider_fields() {
		let body = serde_json::to_value(ErrorBody::from_error(&Error::MissingCode))
			.expect("Error bodies should serialize.");

		assert_eq!(
			body,
			json!({
				"error": "missing_code",
				"message": "Callback did not include an authorization code."
			})
		);
	}

	#[test]
	fn response_modes_parse_case_insensitively() {
		assert_eq!("Passthrough".parse::<ResponseMode>().ok(), Some(ResponseMode::Passthrough));
		assert_eq!(" acknowledge ".parse::<ResponseMode>().ok(), Some(ResponseMode::Acknowledge));
		assert!("echo".parse::<ResponseMode>().is_err());
	}

	#[test]
	fn acknowledge_mode_drops_the_body() {
		let result = TokenExchangeResult {
			status: 200,
			content_type: Some("application/json".into()),
			body: b"{}".to_vec(),
		};

		assert_eq!(ResponseMode::Acknowledge.respond(result.clone()).status(), StatusCode::OK);
		assert_eq!(
			ResponseMode::Passthrough.respond(result).headers()[CONTENT_TYPE],
			"application/json"
		);
	}
}
