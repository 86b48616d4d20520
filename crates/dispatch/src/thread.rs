use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::mpsc;

use crate::{DispatchError, Dispatcher, Job, panic_message};

enum Envelope {
	Post(Job),
	Send { job: Job, done: std_mpsc::SyncSender<thread::Result<()>> },
}

/// Cloneable handle that marshals work onto a [`DispatchLoop`]'s thread.
#[derive(Clone)]
pub struct ThreadDispatcher {
	affinity: ThreadId,
	tx: mpsc::UnboundedSender<Envelope>,
}

impl fmt::Debug for ThreadDispatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ThreadDispatcher")
			.field("affinity", &self.affinity)
			.field("closed", &self.tx.is_closed())
			.finish()
	}
}

impl ThreadDispatcher {
	/// Spawns a named affinity thread running a [`DispatchLoop`].
	///
	/// The thread exits once every clone of the returned dispatcher is dropped.
	pub fn spawn(name: impl Into<String>) -> std::io::Result<(Self, JoinHandle<()>)> {
		let name = name.into();
		let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);
		tracing::trace!(thread = %name, "dispatch.spawn_affinity_thread");
		let handle = thread::Builder::new().name(name).spawn(move || {
			let (pump, dispatcher) = DispatchLoop::new();
			if ready_tx.send(dispatcher).is_ok() {
				pump.run();
			}
		})?;
		let dispatcher = ready_rx
			.recv()
			.map_err(|_| std::io::Error::other("affinity thread exited before publishing its dispatcher"))?;
		Ok((dispatcher, handle))
	}

	/// Returns the affinity thread id.
	pub fn affinity(&self) -> ThreadId {
		self.affinity
	}

	fn enqueue(&self, envelope: Envelope) -> Result<(), DispatchError> {
		self.tx.send(envelope).map_err(|_| DispatchError::Closed)
	}
}

impl Dispatcher for ThreadDispatcher {
	fn post(&self, job: Job) -> Result<(), DispatchError> {
		tracing::trace!(affinity = ?self.affinity, "dispatch.post");
		self.enqueue(Envelope::Post(job))
	}

	fn send(&self, job: Job) -> Result<(), DispatchError> {
		if self.is_current() {
			job();
			return Ok(());
		}

		tracing::trace!(affinity = ?self.affinity, "dispatch.send");
		let (done, wait) = std_mpsc::sync_channel(1);
		self.enqueue(Envelope::Send { job, done })?;
		match wait.recv() {
			Ok(Ok(())) => Ok(()),
			Ok(Err(payload)) => panic::resume_unwind(payload),
			// Loop dropped the envelope without running it.
			Err(_) => Err(DispatchError::Closed),
		}
	}

	fn is_current(&self) -> bool {
		thread::current().id() == self.affinity
	}
}

/// Work pump bound to the thread that created it.
///
/// The loop is `!Send`: the thread that calls [`DispatchLoop::new`] becomes the
/// affinity thread for every dispatcher it hands out.
pub struct DispatchLoop {
	affinity: ThreadId,
	rx: mpsc::UnboundedReceiver<Envelope>,
	_not_send: PhantomData<*const ()>,
}

impl fmt::Debug for DispatchLoop {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DispatchLoop").field("affinity", &self.affinity).finish_non_exhaustive()
	}
}

impl DispatchLoop {
	/// Creates a loop owned by the current thread and its first dispatcher.
	pub fn new() -> (Self, ThreadDispatcher) {
		let affinity = thread::current().id();
		let (tx, rx) = mpsc::unbounded_channel();
		let pump = Self {
			affinity,
			rx,
			_not_send: PhantomData,
		};
		(pump, ThreadDispatcher { affinity, tx })
	}

	/// Returns the affinity thread id.
	pub fn affinity(&self) -> ThreadId {
		self.affinity
	}

	/// Runs queued work until every dispatcher has been dropped.
	///
	/// Must not be called from inside an async runtime.
	pub fn run(mut self) {
		tracing::debug!(affinity = ?self.affinity, "dispatch.loop.start");
		while let Some(envelope) = self.rx.blocking_recv() {
			execute(envelope);
		}
		tracing::debug!(affinity = ?self.affinity, "dispatch.loop.stop");
	}

	/// Runs every job queued so far without blocking. Returns the number run.
	pub fn drain(&mut self) -> usize {
		let mut executed = 0usize;
		while let Ok(envelope) = self.rx.try_recv() {
			execute(envelope);
			executed = executed.wrapping_add(1);
		}
		executed
	}
}

fn execute(envelope: Envelope) {
	match envelope {
		Envelope::Post(job) => {
			if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
				tracing::error!(panic = %panic_message(&*payload), "posted dispatch job panicked");
			}
		}
		Envelope::Send { job, done } => {
			let result = panic::catch_unwind(AssertUnwindSafe(job));
			let _ = done.send(result);
		}
	}
}
