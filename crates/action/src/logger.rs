use std::error::Error;
use std::fmt;

/// Logging collaborator injected into each resolver.
pub trait ActionLogger: Send + Sync {
	fn info(&self, message: fmt::Arguments<'_>);

	fn warn(&self, message: fmt::Arguments<'_>);

	fn error(&self, error: &(dyn Error + 'static), message: fmt::Arguments<'_>);
}

/// Default logger forwarding to `tracing` under the `tether::action` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl ActionLogger for TracingLogger {
	fn info(&self, message: fmt::Arguments<'_>) {
		tracing::info!(target: "tether::action", "{message}");
	}

	fn warn(&self, message: fmt::Arguments<'_>) {
		tracing::warn!(target: "tether::action", "{message}");
	}

	fn error(&self, error: &(dyn Error + 'static), message: fmt::Arguments<'_>) {
		tracing::error!(target: "tether::action", error = %error, "{message}");
	}
}
