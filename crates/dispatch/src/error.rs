use thiserror::Error;

/// Errors returned when work cannot be marshaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
	/// The affinity loop has stopped; queued work will never run.
	#[error("dispatch loop is closed")]
	Closed,
}
