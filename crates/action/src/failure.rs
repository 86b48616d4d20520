//! Process-wide sink for failures nobody is awaiting.
//!
//! Asynchronous actions outlive the call that started them. When one fails,
//! the supervisor logs it and hands it to the hook installed here, so it is
//! never silently dropped.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// How a supervised action ended badly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
	/// The work returned an error.
	Error,
	/// The work panicked.
	Panic,
	/// The runtime dropped the work before it finished.
	Cancelled,
}

/// A failure surfaced outside the invoking call path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledFailure {
	pub action: String,
	pub target: String,
	pub kind: FailureKind,
	pub message: String,
}

impl fmt::Display for UnhandledFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "action `{}` on {} ended with {:?}: {}", self.action, self.target, self.kind, self.message)
	}
}

impl std::error::Error for UnhandledFailure {}

struct HookSlot(Box<dyn Fn(&UnhandledFailure) + Send + Sync>);

static HOOK: ArcSwapOption<HookSlot> = ArcSwapOption::const_empty();

/// Installs the process-wide hook, replacing any previous one.
pub fn set_unhandled_failure_hook(hook: impl Fn(&UnhandledFailure) + Send + Sync + 'static) {
	HOOK.store(Some(Arc::new(HookSlot(Box::new(hook)))));
}

/// Removes the process-wide hook; failures are then only logged.
pub fn clear_unhandled_failure_hook() {
	HOOK.store(None);
}

/// Logs `failure` and forwards it to the installed hook.
pub fn report_unhandled(failure: &UnhandledFailure) {
	tracing::error!(
		target: "tether::action",
		action = %failure.action,
		action_target = %failure.target,
		kind = ?failure.kind,
		"unhandled action failure: {}",
		failure.message
	);
	if let Some(slot) = HOOK.load_full() {
		(slot.0)(failure);
	}
}
