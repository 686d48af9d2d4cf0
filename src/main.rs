//! `oauth2-relay` binary: reads configuration, then serves the relay until Ctrl-C.

// crates.io
use color_eyre::eyre::Result;
use tokio::{net::TcpListener, signal};
// self
use oauth2_relay::{
	config::{self, Config},
	obs,
	server::{self, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
	let dotenv = config::load_dotenv()?;

	obs::init_tracing()?;

	if let Some(path) = dotenv {
		tracing::debug!(path = %path.display(), "Loaded environment file.");
	}

	let config = Config::from_env()?;
	let listen_addr = config.listen_addr;
	let state = AppState::from_config(config)?;

	tracing::info!(
		response_mode = %state.response_mode,
		exchange_timeout = ?state.exchange_timeout,
		"Relay configured."
	);

	let listener = TcpListener::bind(listen_addr).await?;

	tracing::info!(addr = %listener.local_addr()?, "Relay listening.");

	axum::serve(listener, server::router(state)).with_graceful_shutdown(shutdown_signal()).await?;

	tracing::info!("Relay stopped.");

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = signal::ctrl_c().await {
		tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
	}
}
