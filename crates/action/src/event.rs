use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::args::{ActionArg, ActionArgs};
use crate::error::ActionError;
use crate::registry::ActionRegistry;
use crate::resolver::{ActionResolver, ResolverOptions};
use crate::target::ActionTarget;
use crate::task::ActionOutcome;

/// Event-style call site: bound to a UI event such as a click or key press.
///
/// Handlers take no parameters, the event payload, or `(sender, event)`.
#[derive(Debug)]
pub struct EventAction {
	resolver: ActionResolver,
}

impl EventAction {
	pub const ARITY: RangeInclusive<usize> = 0..=2;

	pub fn new(registry: &ActionRegistry, name: impl Into<Arc<str>>, target: ActionTarget, options: ResolverOptions) -> Result<Self, ActionError> {
		let resolver = ActionResolver::new(registry, name, Self::ARITY, options);
		resolver.set_target(target)?;
		Ok(Self { resolver })
	}

	pub fn resolver(&self) -> &ActionResolver {
		&self.resolver
	}

	pub fn set_target(&self, target: ActionTarget) -> Result<(), ActionError> {
		self.resolver.set_target(target)
	}

	/// Handles one raised event.
	pub fn invoke(&self, sender: ActionArg, event: ActionArg) -> Result<ActionOutcome, ActionError> {
		self.resolver.assert_target_set()?;

		let binding = self.resolver.load();
		let args = match binding.action.as_ref().map(|bound| bound.arity()) {
			Some(2) => ActionArgs::new(vec![sender, event]),
			Some(1) => ActionArgs::new(vec![event]),
			_ => ActionArgs::empty(),
		};
		self.resolver.invoke_binding(&binding, args)
	}
}
