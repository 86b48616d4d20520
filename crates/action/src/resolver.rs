//! Binds an action name against a changing target and invokes it.
//!
//! # State machine
//!
//! ```text
//!            set_target(instance/type with action)
//!   Unbound ─────────────────────────────────────────► Bound
//!      ▲                                                 │
//!      └──── set_target(null / missing / ambiguous) ─────┘
//! ```
//!
//! `set_target(Unassigned)` is ignored: the view has not been wired yet.
//! Target and binding are swapped together as one snapshot, so readers never
//! see a binding that belongs to a previous target.

use std::fmt;
use std::ops::RangeInclusive;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::RwLock;

use crate::args::ActionArgs;
use crate::error::{ActionError, ActionPanic};
use crate::logger::{ActionLogger, TracingLogger};
use crate::policy::{ActionPolicies, UnavailableBehavior};
use crate::registry::{ActionEntry, ActionRegistry, ActionScope, GuardFn, Lookup};
use crate::target::ActionTarget;
use crate::task::{ActionOutcome, ActionReturn, TaskOrigin, spawn_supervised};


/// Whether the resolver currently has an action to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
	Unbound,
	Bound,
}

/// Action resolved against the current target.
#[derive(Clone)]
pub struct BoundAction {
	entry: ActionEntry,
	guard: Option<Arc<GuardFn>>,
}

impl BoundAction {
	pub fn entry(&self) -> &ActionEntry {
		&self.entry
	}

	pub fn arity(&self) -> usize {
		self.entry.arity()
	}

	pub fn has_guard(&self) -> bool {
		self.guard.is_some()
	}

	/// Evaluates the availability guard; `true` when none is registered.
	pub(crate) fn guard_allows(&self, target: &ActionTarget) -> bool {
		match (&self.guard, target) {
			(None, _) => true,
			(Some(guard), ActionTarget::Instance(receiver)) => guard(receiver),
			(Some(_), _) => false,
		}
	}
}

impl fmt::Debug for BoundAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BoundAction")
			.field("entry", &self.entry)
			.field("guard", &self.guard.is_some())
			.finish()
	}
}

/// Passed to transition hooks after every target change.
#[derive(Debug)]
pub struct TargetTransition<'a> {
	pub old: &'a ActionTarget,
	pub new: &'a ActionTarget,
	pub state: ActionState,
}

type TransitionHook = Arc<dyn Fn(&TargetTransition<'_>) + Send + Sync>;

/// Construction-time settings for a resolver.
#[derive(Clone)]
pub struct ResolverOptions {
	pub policies: ActionPolicies,
	pub logger: Arc<dyn ActionLogger>,
}

impl Default for ResolverOptions {
	fn default() -> Self {
		Self {
			policies: ActionPolicies::default(),
			logger: Arc::new(TracingLogger),
		}
	}
}

impl fmt::Debug for ResolverOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolverOptions").field("policies", &self.policies).finish_non_exhaustive()
	}
}

impl ResolverOptions {
	pub fn policies(mut self, policies: ActionPolicies) -> Self {
		self.policies = policies;
		self
	}

	pub fn logger(mut self, logger: Arc<dyn ActionLogger>) -> Self {
		self.logger = logger;
		self
	}
}

pub(crate) struct Binding {
	pub target: ActionTarget,
	pub action: Option<BoundAction>,
}

impl Binding {
	fn state(&self) -> ActionState {
		if self.action.is_some() { ActionState::Bound } else { ActionState::Unbound }
	}
}

/// Keeps one action name bound against the current target.
pub struct ActionResolver {
	name: Arc<str>,
	registry: ActionRegistry,
	arity: RangeInclusive<usize>,
	policies: ActionPolicies,
	logger: Arc<dyn ActionLogger>,
	binding: ArcSwap<Binding>,
	hooks: RwLock<Vec<TransitionHook>>,
}

impl fmt::Debug for ActionResolver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let binding = self.binding.load();
		f.debug_struct("ActionResolver")
			.field("name", &self.name)
			.field("target", &binding.target)
			.field("state", &binding.state())
			.field("policies", &self.policies)
			.finish_non_exhaustive()
	}
}

impl ActionResolver {
	/// Creates an unwired resolver; the target starts as [`ActionTarget::Unassigned`].
	///
	/// `arity` is the range of handler arities the call site can supply.
	pub fn new(registry: &ActionRegistry, name: impl Into<Arc<str>>, arity: RangeInclusive<usize>, options: ResolverOptions) -> Self {
		Self {
			name: name.into(),
			registry: registry.clone(),
			arity,
			policies: options.policies,
			logger: options.logger,
			binding: ArcSwap::from_pointee(Binding {
				target: ActionTarget::Unassigned,
				action: None,
			}),
			hooks: RwLock::new(Vec::new()),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn policies(&self) -> ActionPolicies {
		self.policies
	}

	pub fn target(&self) -> ActionTarget {
		self.binding.load().target.clone()
	}

	pub fn state(&self) -> ActionState {
		self.binding.load().state()
	}

	pub fn bound_action(&self) -> Option<BoundAction> {
		self.binding.load().action.clone()
	}

	pub(crate) fn load(&self) -> Arc<Binding> {
		self.binding.load_full()
	}

	/// Registers a hook fired after every target transition.
	pub fn on_transition(&self, hook: impl Fn(&TargetTransition<'_>) + Send + Sync + 'static) {
		self.hooks.write().push(Arc::new(hook));
	}

	/// Rebinds against `target`.
	///
	/// Fatal conditions are logged and returned after the new (unbound) state
	/// is stored and the transition hooks have run.
	pub fn set_target(&self, target: ActionTarget) -> Result<(), ActionError> {
		if target.is_unassigned() {
			tracing::trace!(target: "tether::action", action = %self.name, "action.target.unassigned_ignored");
			return Ok(());
		}

		let (action, outcome) = self.resolve(&target);
		let next = Arc::new(Binding { target, action });
		let previous = self.binding.swap(Arc::clone(&next));
		tracing::debug!(
			target: "tether::action",
			action = %self.name,
			action_target = %next.target.describe(),
			state = ?next.state(),
			"action.target.changed"
		);

		let hooks: Vec<TransitionHook> = self.hooks.read().clone();
		let transition = TargetTransition {
			old: &previous.target,
			new: &next.target,
			state: next.state(),
		};
		for hook in &hooks {
			hook(&transition);
		}
		outcome
	}

	fn resolve(&self, target: &ActionTarget) -> (Option<BoundAction>, Result<(), ActionError>) {
		let (key, scope) = match target {
			ActionTarget::Unassigned => return (None, Ok(())),
			ActionTarget::Null => return (None, self.null_target()),
			ActionTarget::Static(key) => (*key, ActionScope::Static),
			ActionTarget::Instance(instance) => (instance.type_key(), ActionScope::Instance),
		};

		let entry = match self.registry.lookup(key, scope, &self.name) {
			Lookup::Found(entry) => entry,
			Lookup::Ambiguous(candidates) => {
				let err = ActionError::AmbiguousMethod {
					action: self.name.to_string(),
					target: target.describe(),
					candidates,
				};
				self.logger.error(&err, format_args!("unable to resolve action `{}` on {}", self.name, target.describe()));
				return (None, Err(err));
			}
			Lookup::Missing => {
				match self.policies.action_not_found {
					UnavailableBehavior::Throw => self
						.logger
						.warn(format_args!("no action `{}` on {}; invoking it will fail", self.name, target.describe())),
					UnavailableBehavior::Continue => self
						.logger
						.warn(format_args!("no action `{}` on {}; action is inert", self.name, target.describe())),
				}
				return (None, Ok(()));
			}
		};

		if !self.arity.contains(&entry.arity()) {
			let err = ActionError::SignatureInvalid {
				action: self.name.to_string(),
				target: target.describe(),
				arity: entry.arity(),
				accepted: format!("{}..={}", self.arity.start(), self.arity.end()),
			};
			self.logger.error(&err, format_args!("unable to bind action `{}` on {}", self.name, target.describe()));
			return (None, Err(err));
		}

		let guard = match scope {
			ActionScope::Instance => self.registry.guard(key, &self.name),
			ActionScope::Static => None,
		};
		(Some(BoundAction { entry: entry.clone(), guard }), Ok(()))
	}

	fn null_target(&self) -> Result<(), ActionError> {
		match self.policies.null_target {
			UnavailableBehavior::Throw => {
				let err = ActionError::TargetNull {
					action: self.name.to_string(),
				};
				self.logger.error(&err, format_args!("target of action `{}` is null", self.name));
				Err(err)
			}
			UnavailableBehavior::Continue => {
				self.logger.info(format_args!("target of action `{}` is null; action is inert", self.name));
				Ok(())
			}
		}
	}

	/// Checks that the action is wired and, under Throw policies, available.
	pub fn assert_target_set(&self) -> Result<(), ActionError> {
		let binding = self.binding.load();
		if binding.action.is_some() {
			return Ok(());
		}

		let err = match &binding.target {
			ActionTarget::Unassigned => ActionError::ActionNotSet {
				action: self.name.to_string(),
			},
			ActionTarget::Null => match self.policies.null_target {
				UnavailableBehavior::Throw => ActionError::TargetNull {
					action: self.name.to_string(),
				},
				UnavailableBehavior::Continue => return Ok(()),
			},
			other => match self.policies.action_not_found {
				UnavailableBehavior::Throw => ActionError::ActionNotFound {
					action: self.name.to_string(),
					target: other.describe(),
				},
				UnavailableBehavior::Continue => return Ok(()),
			},
		};
		self.logger
			.error(&err, format_args!("action `{}` cannot run against {}", self.name, binding.target.describe()));
		Err(err)
	}

	/// Invokes the bound action; a no-op returning [`ActionOutcome::Skipped`]
	/// while unbound.
	pub fn invoke(&self, args: ActionArgs) -> Result<ActionOutcome, ActionError> {
		self.invoke_binding(&self.load(), args)
	}

	pub(crate) fn invoke_binding(&self, binding: &Binding, args: ActionArgs) -> Result<ActionOutcome, ActionError> {
		let Some(bound) = &binding.action else {
			tracing::trace!(target: "tether::action", action = %self.name, "action.invoke.skipped");
			return Ok(ActionOutcome::Skipped);
		};

		tracing::trace!(target: "tether::action", action = %self.name, args = %args.describe(), "action.invoke");
		let call = panic::catch_unwind(AssertUnwindSafe(|| bound.entry.call(&binding.target, &args)));
		match call {
			Ok(Ok(ActionReturn::Done)) => Ok(ActionOutcome::Completed),
			Ok(Ok(ActionReturn::Task(work))) => {
				let origin = TaskOrigin {
					action: self.name.to_string(),
					target: binding.target.describe(),
					args: args.describe(),
				};
				Ok(ActionOutcome::Spawned(spawn_supervised(origin, work, Arc::clone(&self.logger))))
			}
			Ok(Err(err)) => {
				self.logger.error(
					err.root_cause(),
					format_args!(
						"action `{}` on {} with parameters {} failed",
						self.name,
						binding.target.describe(),
						args.describe()
					),
				);
				Err(ActionError::InvocationFailure(err))
			}
			Err(payload) => {
				let panic = ActionPanic::from_payload(&*payload);
				self.logger.error(
					&panic,
					format_args!(
						"action `{}` on {} with parameters {} panicked",
						self.name,
						binding.target.describe(),
						args.describe()
					),
				);
				panic::resume_unwind(payload)
			}
		}
	}
}
