//! Affinity-thread dispatch for UI-bound work.
//!
//! A [`Dispatcher`] owns the identity of one affinity thread and marshals work
//! onto it. Two implementations are provided:
//!
//! * [`ThreadDispatcher`] - paired with a [`DispatchLoop`] that the host pumps
//!   on its UI thread (or on a dedicated thread via [`ThreadDispatcher::spawn`]).
//! * [`SyncDispatcher`] - headless variant for tests and tooling where every
//!   thread counts as the affinity thread.
//!
//! # Architecture
//!
//! ```text
//! caller thread ──post/send──► unbounded queue ──► DispatchLoop::run/drain ──► job()
//!       ▲                                                                   │
//!       └──────────────── completion channel (send only) ◄──────────────────┘
//! ```
//!
//! `send` from the affinity thread never touches the queue; the job runs
//! inline so reentrant marshaling cannot deadlock.

mod error;
mod panic;
mod sync;
mod thread;


use std::sync::mpsc;

pub use error::DispatchError;
pub use panic::panic_message;
pub use sync::SyncDispatcher;
pub use thread::{DispatchLoop, ThreadDispatcher};

/// Unit of work marshaled onto the affinity thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Marshals work onto a single affinity thread.
pub trait Dispatcher: Send + Sync {
	/// Schedules `job` without waiting for it to run.
	///
	/// Posted and sent jobs execute in FIFO order relative to each other.
	fn post(&self, job: Job) -> Result<(), DispatchError>;

	/// Runs `job` on the affinity thread and blocks until it has completed.
	///
	/// Runs inline when called from the affinity thread. A panic raised by
	/// `job` is resumed on the calling thread.
	fn send(&self, job: Job) -> Result<(), DispatchError>;

	/// Returns `true` when the calling thread is the affinity thread.
	fn is_current(&self) -> bool;
}

/// Value-returning helpers layered over [`Dispatcher::send`].
pub trait DispatcherExt: Dispatcher {
	/// Runs `f` on the affinity thread and returns its result.
	fn send_with<R, F>(&self, f: F) -> Result<R, DispatchError>
	where
		R: Send + 'static,
		F: FnOnce() -> R + Send + 'static,
	{
		let (tx, rx) = mpsc::sync_channel(1);
		self.send(Box::new(move || {
			let _ = tx.send(f());
		}))?;
		// send() returns only after the job ran, so the value is already queued.
		rx.try_recv().map_err(|_| DispatchError::Closed)
	}

	/// Posts `f` to the affinity thread.
	fn post_fn<F>(&self, f: F) -> Result<(), DispatchError>
	where
		F: FnOnce() + Send + 'static,
	{
		self.post(Box::new(f))
	}
}

impl<D: Dispatcher + ?Sized> DispatcherExt for D {}
