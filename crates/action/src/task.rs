//! Asynchronous action results and their supervision.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use tokio::task::JoinHandle;

use crate::failure::{self, FailureKind, UnhandledFailure};
use crate::logger::ActionLogger;

type BoxTask = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// What a handler produced.
pub enum ActionReturn {
	/// The action finished synchronously.
	Done,
	/// The action continues as an asynchronous unit of work.
	Task(BoxTask),
}

impl ActionReturn {
	/// Wraps a future as the action's asynchronous continuation.
	pub fn task<F>(fut: F) -> Self
	where
		F: Future<Output = anyhow::Result<()>> + Send + 'static,
	{
		Self::Task(Box::pin(fut))
	}
}

impl fmt::Debug for ActionReturn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Done => f.write_str("Done"),
			Self::Task(_) => f.write_str("Task(..)"),
		}
	}
}

/// Result of one invocation attempt.
#[derive(Debug)]
pub enum ActionOutcome {
	/// No action was bound; nothing ran.
	Skipped,
	/// The handler ran to completion.
	Completed,
	/// The handler returned asynchronous work, now running under supervision.
	Spawned(PendingTask),
}

impl ActionOutcome {
	pub fn is_skipped(&self) -> bool {
		matches!(self, Self::Skipped)
	}
}

/// Handle to a supervised asynchronous action.
///
/// Dropping it detaches: the work keeps running and failures are still
/// reported to the unhandled-failure sink.
#[derive(Debug)]
pub struct PendingTask {
	origin: Arc<TaskOrigin>,
	supervisor: JoinHandle<Result<(), UnhandledFailure>>,
}

impl PendingTask {
	/// Name of the action that produced this work.
	pub fn action(&self) -> &str {
		&self.origin.action
	}

	/// Waits for the work and its failure reporting to finish.
	pub async fn wait(self) -> Result<(), UnhandledFailure> {
		match self.supervisor.await {
			Ok(result) => result,
			Err(err) => Err(UnhandledFailure {
				action: self.origin.action.clone(),
				target: self.origin.target.clone(),
				kind: FailureKind::Cancelled,
				message: err.to_string(),
			}),
		}
	}

	pub fn is_finished(&self) -> bool {
		self.supervisor.is_finished()
	}
}

/// Identifies the invocation a supervised task belongs to.
#[derive(Debug, Clone)]
pub(crate) struct TaskOrigin {
	pub action: String,
	pub target: String,
	pub args: String,
}

/// Runtime owned by this crate for action continuations.
///
/// Work is never placed on the caller's runtime: a caller's runtime may be
/// shut down while the work is pending, which would cancel it before any
/// failure reached the sink.
fn supervision_runtime() -> &'static tokio::runtime::Runtime {
	static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	RUNTIME.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("tether-action")
			.build()
			.expect("failed to build tether-action supervision runtime")
	})
}

/// Spawns `work` and a supervisor that joins it and reports failures.
pub(crate) fn spawn_supervised(origin: TaskOrigin, work: BoxTask, logger: Arc<dyn ActionLogger>) -> PendingTask {
	let runtime = supervision_runtime();
	let origin = Arc::new(origin);
	tracing::trace!(target: "tether::action", action = %origin.action, "action.spawn");
	let work = runtime.spawn(work);
	let task_origin = Arc::clone(&origin);
	let supervisor = runtime.spawn(async move {
		let origin = task_origin;
		let (kind, message) = match work.await {
			Ok(Ok(())) => return Ok(()),
			Ok(Err(err)) => {
				logger.error(
					err.root_cause(),
					format_args!(
						"asynchronous action `{}` on {} with parameters {} failed",
						origin.action, origin.target, origin.args
					),
				);
				(FailureKind::Error, format!("{err:#}"))
			}
			Err(join) if join.is_panic() => {
				let panic = crate::ActionPanic::from_payload(&*join.into_panic());
				logger.error(
					&panic,
					format_args!(
						"asynchronous action `{}` on {} with parameters {} panicked",
						origin.action, origin.target, origin.args
					),
				);
				(FailureKind::Panic, panic.message)
			}
			Err(join) => (FailureKind::Cancelled, join.to_string()),
		};
		let failure = UnhandledFailure {
			action: origin.action.clone(),
			target: origin.target.clone(),
			kind,
			message,
		};
		failure::report_unhandled(&failure);
		Err(failure)
	});
	PendingTask { origin, supervisor }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn cancelled_supervisor_still_names_its_action() {
		let supervisor = supervision_runtime().spawn(std::future::pending::<Result<(), UnhandledFailure>>());
		supervisor.abort();
		let pending = PendingTask {
			origin: Arc::new(TaskOrigin {
				action: "Sync".into(),
				target: "instance of Editor".into(),
				args: "[]".into(),
			}),
			supervisor,
		};

		assert_eq!(pending.action(), "Sync");
		let failure = pending.wait().await.unwrap_err();
		assert_eq!(failure.kind, FailureKind::Cancelled);
		assert_eq!(failure.action, "Sync");
		assert_eq!(failure.target, "instance of Editor");
	}
}
