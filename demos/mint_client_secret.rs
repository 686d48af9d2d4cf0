//! Mints an Apple client secret from the `APPLE_*` environment variables and prints it.
//!
//! Useful for checking a key file and team/key identifiers against Apple's token endpoint
//! with `curl` before deploying the relay.

// crates.io
use color_eyre::{
	Result,
	eyre::{WrapErr, eyre},
};
// self
use oauth2_relay::{
	auth::{AssertionSigner, SigningMaterial},
	config::{self, env},
};

fn main() -> Result<()> {
	color_eyre::install()?;
	config::load_dotenv()?;

	let var = |name: &'static str| {
		std::env::var(name)
			.ok()
			.filter(|value| !value.trim().is_empty())
			.ok_or_else(|| eyre!("Environment variable `{name}` is required."))
	};
	let client_id = var(env::APPLE_OAUTH_CLIENT_ID)?;
	let material = SigningMaterial::from_key_file(
		var(env::APPLE_OAUTH_CLIENT_SECRET_FILENAME)?,
		var(env::APPLE_KEY_ID)?,
		var(env::APPLE_DEVELOPER_TEAM_ID)?,
	)?;
	let signer = AssertionSigner::new(material).wrap_err("Signing key could not be loaded.")?;
	let secret = signer.sign_assertion(&client_id)?;

	eprintln!("kid: {}", signer.key_id().unwrap_or_default());
	eprintln!("sub: {client_id}");
	eprintln!("valid for: {}", signer.validity());
	println!("{}", secret.expose());

	Ok(())
}
