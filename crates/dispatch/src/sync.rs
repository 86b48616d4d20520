use crate::{DispatchError, Dispatcher, Job};

/// Dispatcher whose affinity thread is every thread.
///
/// `post` and `send` both run the job inline before returning, and
/// `is_current` is always `true`. Intended for headless and test contexts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncDispatcher;

impl SyncDispatcher {
	/// Creates a synchronous dispatcher.
	pub const fn new() -> Self {
		Self
	}
}

impl Dispatcher for SyncDispatcher {
	fn post(&self, job: Job) -> Result<(), DispatchError> {
		job();
		Ok(())
	}

	fn send(&self, job: Job) -> Result<(), DispatchError> {
		job();
		Ok(())
	}

	fn is_current(&self) -> bool {
		true
	}
}
