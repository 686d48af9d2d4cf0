//! Signed client-secret assertions for providers that reject static secrets.
//!
//! Sign in with Apple authenticates clients with a short-lived JWT signed by a
//! developer-held P-256 key instead of a shared secret. [`SigningMaterial`] carries the
//! key bytes and identity parameters loaded at start-up, and [`AssertionSigner`] parses
//! the key once and mints a fresh token for every exchange: `iat` is the wall clock at
//! signing time and `exp` is `iat` plus the validity window.

// std
use std::path::Path;
// crates.io
use jsonwebtoken::{
	Algorithm, EncodingKey, Header,
	errors::{Error as JwtError, ErrorKind as JwtErrorKind},
};
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Audience Apple expects in client-secret assertions.
pub const APPLE_AUDIENCE: &str = "https://appleid.apple.com";
/// Longest validity Apple accepts for a client secret (about six months).
pub const MAX_ASSERTION_VALIDITY: Duration = Duration::seconds(15_777_000);

/// Failures raised while minting an assertion for a request.
#[derive(Debug, ThisError)]
pub enum AssertionError {
	/// Expiry would not land strictly after the issue time.
	#[error("Assertion expiry must be later than its issue time.")]
	EmptyWindow,
	/// Expiry overflows the timestamp range.
	#[error("Assertion expiry overflows the supported timestamp range.")]
	ExpiryOverflow,
	/// Signature could not be produced.
	#[error("Failed to sign the client assertion.")]
	Signing {
		/// Underlying JWT encoder failure.
		#[source]
		source: JwtError,
	},
}

/// Key and identity parameters used to sign client assertions.
#[derive(Clone)]
pub struct SigningMaterial {
	private_key: Vec<u8>,
	/// Key identifier embedded in the token header (`kid`).
	pub key_id: String,
	/// Issuer claim, the developer team identifier for Apple.
	pub issuer: String,
	/// Signing algorithm; ES256 for Apple.
	pub algorithm: Algorithm,
	/// Audience claim.
	pub audience: String,
	/// Distance between `iat` and `exp`.
	pub validity: Duration,
}
impl SigningMaterial {
	/// Creates material for an ES256 Apple client secret from PEM-encoded PKCS#8 key bytes.
	pub fn new(
		private_key_pem: impl Into<Vec<u8>>,
		key_id: impl Into<String>,
		issuer: impl Into<String>,
	) -> Self {
		Self {
			private_key: private_key_pem.into(),
			key_id: key_id.into(),
			issuer: issuer.into(),
			algorithm: Algorithm::ES256,
			audience: APPLE_AUDIENCE.into(),
			validity: MAX_ASSERTION_VALIDITY,
		}
	}

	/// Reads the key file once and builds material around it.
	pub fn from_key_file(
		path: impl AsRef<Path>,
		key_id: impl Into<String>,
		issuer: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let private_key = std::fs::read(path)
			.map_err(|source| ConfigError::KeyFile { path: path.to_path_buf(), source })?;

		Ok(Self::new(private_key, key_id, issuer))
	}

	/// Overrides the audience claim.
	pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = audience.into();

		self
	}

	/// Overrides the validity window.
	pub fn with_validity(mut self, validity: Duration) -> Self {
		self.validity = validity;

		self
	}

	/// Overrides the signing algorithm.
	pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
		self.algorithm = algorithm;

		self
	}

	fn encoding_key(&self) -> Result<EncodingKey, ConfigError> {
		let key = match self.algorithm {
			Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(&self.private_key),
			Algorithm::RS256
			| Algorithm::RS384
			| Algorithm::RS512
			| Algorithm::PS256
			| Algorithm::PS384
			| Algorithm::PS512 => EncodingKey::from_rsa_pem(&self.private_key),
			Algorithm::EdDSA => EncodingKey::from_ed_pem(&self.private_key),
			Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 =>
				Err(JwtError::from(JwtErrorKind::InvalidAlgorithm)),
		};

		key.map_err(|e| ConfigError::signing_key(self.algorithm, e))
	}
}
impl Debug for SigningMaterial {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SigningMaterial")
			.field("private_key", &"<redacted>")
			.field("key_id", &self.key_id)
			.field("issuer", &self.issuer)
			.field("algorithm", &self.algorithm)
			.field("audience", &self.audience)
			.field("validity", &self.validity)
			.finish()
	}
}

/// Claim set carried by a client assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer (team identifier).
	pub iss: String,
	/// Issued-at, in Unix seconds.
	pub iat: i64,
	/// Expiry, in Unix seconds.
	pub exp: i64,
	/// Audience.
	pub aud: String,
	/// Subject (client identifier).
	pub sub: String,
}

/// Mints signed client assertions from key material parsed once at start-up.
#[derive(Clone)]
pub struct AssertionSigner {
	header: Header,
	encoding_key: EncodingKey,
	issuer: String,
	audience: String,
	validity: Duration,
}
impl AssertionSigner {
	/// Parses the key and proves it can sign before any request is served.
	pub fn new(material: SigningMaterial) -> Result<Self, ConfigError> {
		if !material.validity.is_positive() || material.validity > MAX_ASSERTION_VALIDITY {
			return Err(ConfigError::AssertionWindow {
				window: material.validity,
				max: MAX_ASSERTION_VALIDITY,
			});
		}

		let encoding_key = material.encoding_key()?;
		let mut header = Header::new(material.algorithm);

		header.kid = Some(material.key_id.clone());

		let signer = Self {
			header,
			encoding_key,
			issuer: material.issuer,
			audience: material.audience,
			validity: material.validity,
		};

		// Malformed PEM bodies only surface when signing.
		signer.sign_assertion("startup-probe").map_err(|e| match e {
			AssertionError::Signing { source } =>
				ConfigError::signing_key(material.algorithm, source),
			other => ConfigError::signing_key(material.algorithm, other),
		})?;

		Ok(signer)
	}

	/// Key identifier placed in every token header.
	pub fn key_id(&self) -> Option<&str> {
		self.header.kid.as_deref()
	}

	/// Validity window applied to every assertion.
	pub fn validity(&self) -> Duration {
		self.validity
	}

	/// Builds the claim set for `subject` as of `issued_at`.
	pub fn claims_at(
		&self,
		subject: &str,
		issued_at: OffsetDateTime,
	) -> Result<AssertionClaims, AssertionError> {
		let iat = issued_at.unix_timestamp();
		let exp =
			iat.checked_add(self.validity.whole_seconds()).ok_or(AssertionError::ExpiryOverflow)?;

		if exp <= iat {
			return Err(AssertionError::EmptyWindow);
		}

		Ok(AssertionClaims {
			iss: self.issuer.clone(),
			iat,
			exp,
			aud: self.audience.clone(),
			sub: subject.to_owned(),
		})
	}

	/// Mints an assertion for `subject` issued now.
	pub fn sign_assertion(&self, subject: &str) -> Result<Secret, AssertionError> {
		self.sign_assertion_at(subject, OffsetDateTime::now_utc())
	}

	/// Mints an assertion for `subject` issued at `issued_at`.
	pub fn sign_assertion_at(
		&self,
		subject: &str,
		issued_at: OffsetDateTime,
	) -> Result<Secret, AssertionError> {
		let claims = self.claims_at(subject, issued_at)?;
		let token = jsonwebtoken::encode(&self.header, &claims, &self.encoding_key)
			.map_err(|source| AssertionError::Signing { source })?;

		Ok(Secret::new(token))
	}
}
impl Debug for AssertionSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AssertionSigner")
			.field("algorithm", &self.header.alg)
			.field("key_id", &self.header.kid)
			.field("issuer", &self.issuer)
			.field("audience", &self.audience)
			.field("validity", &self.validity)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::_preludet::*;

	const SUBJECT: &str = "com.example.service";

	fn verify(token: &str) -> AssertionClaims {
		verify_test_assertion(token).expect("Assertion should verify against the fixture key.")
	}

	#[test]
	fn expiry_is_issue_time_plus_window() {
		let signer = test_assertion_signer();
		let before = OffsetDateTime::now_utc().unix_timestamp();
		let secret = signer.sign_assertion(SUBJECT).expect("Assertion should sign.");
		let after = OffsetDateTime::now_utc().unix_timestamp();
		let claims = verify(secret.expose());

		assert_eq!(claims.exp - claims.iat, 15_777_000);
		assert!(claims.iat >= before - 2 && claims.iat <= after + 2);
		assert_eq!(claims.iss, TEST_TEAM_ID);
		assert_eq!(claims.aud, APPLE_AUDIENCE);
		assert_eq!(claims.sub, SUBJECT);
	}

	#[test]
	fn header_carries_algorithm_and_key_id() {
		let signer = test_assertion_signer();
		let secret = signer.sign_assertion(SUBJECT).expect("Assertion should sign.");
		let header = jsonwebtoken::decode_header(secret.expose()).expect("Header should decode.");

		assert_eq!(header.alg, Algorithm::ES256);
		assert_eq!(header.kid.as_deref(), Some(TEST_KEY_ID));
		assert_eq!(signer.key_id(), Some(TEST_KEY_ID));
	}

	#[test]
	fn same_instant_yields_distinct_signatures_over_equal_claims() {
		let signer = test_assertion_signer();
		let now = OffsetDateTime::now_utc();
		let first = signer.sign_assertion_at(SUBJECT, now).expect("First assertion should sign.");
		let second =
			signer.sign_assertion_at(SUBJECT, now).expect("Second assertion should sign.");

		assert_ne!(first.expose(), second.expose());
		assert_eq!(verify(first.expose()), verify(second.expose()));
	}

	#[test]
	fn claims_follow_the_supplied_issue_time() {
		let signer = test_assertion_signer();
		let claims = signer
			.claims_at(SUBJECT, datetime!(2025-01-01 0:00 UTC))
			.expect("Claims should build for a fixed instant.");

		assert_eq!(claims.iat, 1_735_689_600);
		assert_eq!(claims.exp, 1_735_689_600 + 15_777_000);
	}

	#[test]
	fn signer_rejects_out_of_range_windows() {
		let err = AssertionSigner::new(test_signing_material().with_validity(Duration::ZERO))
			.expect_err("Zero window should be rejected.");

		assert!(matches!(err, ConfigError::AssertionWindow { .. }));

		let err = AssertionSigner::new(
			test_signing_material().with_validity(MAX_ASSERTION_VALIDITY + Duration::SECOND),
		)
		.expect_err("Windows longer than Apple accepts should be rejected.");

		assert!(matches!(err, ConfigError::AssertionWindow { .. }));
	}

	#[test]
	fn signer_rejects_unusable_keys() {
		let err = AssertionSigner::new(SigningMaterial::new("not a key", TEST_KEY_ID, TEST_TEAM_ID))
			.expect_err("Garbage key bytes should be rejected.");

		assert!(matches!(err, ConfigError::SigningKey { .. }));

		let err = AssertionSigner::new(
			test_signing_material().with_algorithm(Algorithm::HS256),
		)
		.expect_err("Symmetric algorithms cannot sign with a private key file.");

		assert!(matches!(err, ConfigError::SigningKey { .. }));
	}

	#[test]
	fn missing_key_file_is_a_configuration_error() {
		let err = SigningMaterial::from_key_file("/nonexistent/AuthKey.p8", "kid", "team")
			.expect_err("Missing key file should be rejected.");

		assert!(matches!(err, ConfigError::KeyFile { .. }));
	}

	#[test]
	fn debug_output_redacts_key_bytes() {
		let rendered = format!("{:?}", test_signing_material());

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("PRIVATE KEY"));
	}
}
