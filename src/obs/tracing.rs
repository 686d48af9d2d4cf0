// crates.io
use color_eyre::eyre::{Result as EyreResult, eyre};
use tracing::instrument::Instrumented;
use tracing_subscriber::EnvFilter;
// self
use crate::{_prelude::*, obs::FlowKind, provider::ProviderKind};

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,oauth2_relay=debug,tower_http=debug";

/// Installs the `color-eyre` report handler and a `tracing-subscriber` formatter.
///
/// The formatter honours `RUST_LOG` and falls back to [`DEFAULT_LOG_FILTER`].
pub fn init_tracing() -> EyreResult<()> {
	color_eyre::install()?;

	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
		.map_err(|e| eyre!(e))?;

	tracing_subscriber::fmt().with_env_filter(filter).try_init().map_err(|e| eyre!(e))
}

/// A span builder used by relay flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the flow kind, provider, and stage.
	pub fn new(kind: FlowKind, provider: ProviderKind, stage: &'static str) -> Self {
		let span = tracing::info_span!(
			"oauth2_relay.flow",
			flow = kind.as_str(),
			provider = provider.as_str(),
			stage
		);

		Self { span }
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		FlowSpanGuard { _guard: self.span.entered() }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		tracing::Instrument::instrument(fut, self.span.clone())
	}
}

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	_guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn entered_guard_without_a_subscriber() {
		let _guard = FlowSpan::new(FlowKind::Authorize, ProviderKind::Google, "test").entered();
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Exchange, ProviderKind::Apple, "instrument");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
