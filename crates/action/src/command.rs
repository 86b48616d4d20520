use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::args::{ActionArg, ActionArgs};
use crate::error::ActionError;
use crate::registry::ActionRegistry;
use crate::resolver::{ActionResolver, ActionState, ResolverOptions};
use crate::target::ActionTarget;
use crate::task::ActionOutcome;

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Command-style call site: bound to a button or menu item.
///
/// Handlers take zero parameters or the single command parameter. An unbound
/// command reports `can_execute() == false`, so `Continue` policies surface as
/// a disabled control rather than an error.
pub struct CommandAction {
	resolver: ActionResolver,
	listeners: Arc<RwLock<Vec<Listener>>>,
}

impl fmt::Debug for CommandAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CommandAction").field("resolver", &self.resolver).finish_non_exhaustive()
	}
}

impl CommandAction {
	/// Handler arities a command can supply.
	pub const ARITY: RangeInclusive<usize> = 0..=1;

	/// Creates the command and resolves it against `target`.
	pub fn new(registry: &ActionRegistry, name: impl Into<Arc<str>>, target: ActionTarget, options: ResolverOptions) -> Result<Self, ActionError> {
		let resolver = ActionResolver::new(registry, name, Self::ARITY, options);
		let listeners: Arc<RwLock<Vec<Listener>>> = Arc::new(RwLock::new(Vec::new()));

		let notify = Arc::clone(&listeners);
		resolver.on_transition(move |_| {
			let snapshot: Vec<Listener> = notify.read().clone();
			for listener in snapshot {
				listener();
			}
		});

		resolver.set_target(target)?;
		Ok(Self { resolver, listeners })
	}

	pub fn resolver(&self) -> &ActionResolver {
		&self.resolver
	}

	pub fn state(&self) -> ActionState {
		self.resolver.state()
	}

	/// Rebinds the command; `can_execute` listeners fire afterwards.
	pub fn set_target(&self, target: ActionTarget) -> Result<(), ActionError> {
		self.resolver.set_target(target)
	}

	/// Registers a listener fired whenever `can_execute` may have changed.
	pub fn subscribe_can_execute_changed(&self, listener: impl Fn() + Send + Sync + 'static) {
		self.listeners.write().push(Arc::new(listener));
	}

	/// Bound, and the availability guard (if any) allows it.
	pub fn can_execute(&self) -> bool {
		let binding = self.resolver.load();
		binding
			.action
			.as_ref()
			.is_some_and(|bound| bound.guard_allows(&binding.target))
	}

	/// Runs the command with an optional command parameter.
	///
	/// The parameter is passed only to one-parameter handlers.
	pub fn execute(&self, parameter: Option<ActionArg>) -> Result<ActionOutcome, ActionError> {
		self.resolver.assert_target_set()?;

		let binding = self.resolver.load();
		let args = match &binding.action {
			Some(bound) if bound.arity() == 1 => parameter.into_iter().collect(),
			_ => ActionArgs::empty(),
		};
		self.resolver.invoke_binding(&binding, args)
	}
}
