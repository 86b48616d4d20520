//! Action failure taxonomy.

use std::any::Any;

use thiserror::Error;

/// Errors raised while resolving or invoking an action.
#[derive(Debug, Error)]
pub enum ActionError {
	/// Target was set to null under [`crate::UnavailableBehavior::Throw`].
	#[error("target of action `{action}` is null")]
	TargetNull { action: String },

	/// No action of this name exists on the target under
	/// [`crate::UnavailableBehavior::Throw`].
	#[error("no action `{action}` on {target}")]
	ActionNotFound { action: String, target: String },

	/// The name matches several registered overloads.
	#[error("action `{action}` is ambiguous on {target}: {candidates} overloads")]
	AmbiguousMethod { action: String, target: String, candidates: usize },

	/// The registered handler's arity is not accepted by the call site.
	#[error("action `{action}` on {target} takes {arity} parameter(s), call site accepts {accepted}")]
	SignatureInvalid {
		action: String,
		target: String,
		arity: usize,
		accepted: String,
	},

	/// The target never progressed past [`crate::ActionTarget::Unassigned`].
	#[error("target of action `{action}` was never assigned")]
	ActionNotSet { action: String },

	/// The handler failed; carries the handler's own error unchanged.
	#[error(transparent)]
	InvocationFailure(anyhow::Error),
}

impl ActionError {
	/// Returns the handler error for [`ActionError::InvocationFailure`].
	pub fn invocation_cause(&self) -> Option<&anyhow::Error> {
		match self {
			Self::InvocationFailure(err) => Some(err),
			_ => None,
		}
	}
}

/// Panic raised by an action handler, captured for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("action handler panicked: {message}")]
pub struct ActionPanic {
	pub message: String,
}

impl ActionPanic {
	pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
		Self {
			message: tether_dispatch::panic_message(payload),
		}
	}
}
