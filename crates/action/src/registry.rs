//! Explicit action registration table.
//!
//! Each view-model type registers its actions once at startup. Lookup is by
//! `(type, scope, name)` with an exact, case-sensitive name. Two registrations
//! sharing name, scope, and arity are rejected by [`ActionRegistryBuilder::build`];
//! overloads that differ in arity are kept and reported as ambiguous when a
//! resolver looks the name up.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::anyhow;
use rustc_hash::FxHashMap;

use crate::args::ActionArgs;
use crate::error::ActionError;
use crate::target::{ActionTarget, TargetInstance, TypeKey};
use crate::task::ActionReturn;

/// Return type of every action handler.
pub type ActionResult = anyhow::Result<ActionReturn>;

type StaticFn = dyn Fn(&ActionArgs) -> ActionResult + Send + Sync;
type InstanceFn = dyn Fn(&TargetInstance, &ActionArgs) -> ActionResult + Send + Sync;
pub(crate) type GuardFn = dyn Fn(&TargetInstance) -> bool + Send + Sync;

/// Member scope an action is registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionScope {
	/// Called without a receiver; resolved for [`ActionTarget::Static`].
	Static,
	/// Called with the target instance; resolved for [`ActionTarget::Instance`].
	Instance,
}

impl fmt::Display for ActionScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Static => "static",
			Self::Instance => "instance",
		})
	}
}

#[derive(Clone)]
enum Handler {
	Static(Arc<StaticFn>),
	Instance(Arc<InstanceFn>),
}

/// One registered action.
#[derive(Clone)]
pub struct ActionEntry {
	name: Arc<str>,
	owner: TypeKey,
	arity: usize,
	handler: Handler,
}

impl ActionEntry {
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Type the action was registered on.
	pub fn owner(&self) -> TypeKey {
		self.owner
	}

	pub fn scope(&self) -> ActionScope {
		match self.handler {
			Handler::Static(_) => ActionScope::Static,
			Handler::Instance(_) => ActionScope::Instance,
		}
	}

	/// Number of parameters the handler expects.
	pub fn arity(&self) -> usize {
		self.arity
	}

	pub(crate) fn call(&self, target: &ActionTarget, args: &ActionArgs) -> ActionResult {
		match (&self.handler, target) {
			(Handler::Static(f), _) => f(args),
			(Handler::Instance(f), ActionTarget::Instance(receiver)) => f(receiver, args),
			(Handler::Instance(_), other) => Err(anyhow!("instance action `{}` called without a receiver ({})", self.name, other.describe())),
		}
	}
}

impl fmt::Debug for ActionEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActionEntry")
			.field("name", &self.name)
			.field("owner", &self.owner)
			.field("scope", &self.scope())
			.field("arity", &self.arity)
			.finish()
	}
}

/// Result of a name lookup.
#[derive(Debug)]
pub enum Lookup<'a> {
	Found(&'a ActionEntry),
	/// Several overloads share the name.
	Ambiguous(usize),
	Missing,
}

#[derive(Default)]
struct TypeActions {
	statics: FxHashMap<Box<str>, Vec<ActionEntry>>,
	instances: FxHashMap<Box<str>, Vec<ActionEntry>>,
	guards: FxHashMap<Box<str>, Arc<GuardFn>>,
}

impl TypeActions {
	fn scope(&self, scope: ActionScope) -> &FxHashMap<Box<str>, Vec<ActionEntry>> {
		match scope {
			ActionScope::Static => &self.statics,
			ActionScope::Instance => &self.instances,
		}
	}

	fn scope_mut(&mut self, scope: ActionScope) -> &mut FxHashMap<Box<str>, Vec<ActionEntry>> {
		match scope {
			ActionScope::Static => &mut self.statics,
			ActionScope::Instance => &mut self.instances,
		}
	}
}

/// Immutable action table shared by every resolver.
#[derive(Clone, Default)]
pub struct ActionRegistry {
	types: Arc<FxHashMap<TypeId, TypeActions>>,
}

impl fmt::Debug for ActionRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActionRegistry").field("types", &self.types.len()).finish()
	}
}

impl ActionRegistry {
	pub fn builder() -> ActionRegistryBuilder {
		ActionRegistryBuilder::new()
	}

	/// Looks up `name` in `scope` of type `key`.
	pub fn lookup(&self, key: TypeKey, scope: ActionScope, name: &str) -> Lookup<'_> {
		let Some(actions) = self.types.get(&key.id()) else {
			return Lookup::Missing;
		};
		match actions.scope(scope).get(name).map(Vec::as_slice) {
			None | Some([]) => Lookup::Missing,
			Some([entry]) => Lookup::Found(entry),
			Some(overloads) => Lookup::Ambiguous(overloads.len()),
		}
	}

	pub(crate) fn guard(&self, key: TypeKey, name: &str) -> Option<Arc<GuardFn>> {
		self.types.get(&key.id())?.guards.get(name).cloned()
	}

	/// Returns `true` when `key` has at least one registered action.
	pub fn contains_type(&self, key: TypeKey) -> bool {
		self.types.contains_key(&key.id())
	}

	/// Names registered in `scope` of `key`, sorted.
	pub fn action_names(&self, key: TypeKey, scope: ActionScope) -> Vec<&str> {
		let mut names: Vec<&str> = self
			.types
			.get(&key.id())
			.map(|actions| actions.scope(scope).keys().map(|name| &**name).collect())
			.unwrap_or_default();
		names.sort_unstable();
		names
	}
}

/// Collects registrations and freezes them into an [`ActionRegistry`].
#[derive(Default)]
pub struct ActionRegistryBuilder {
	types: FxHashMap<TypeId, (TypeKey, TypeActions)>,
}

impl ActionRegistryBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers actions for `T`. May be called repeatedly for the same type.
	pub fn register<T>(mut self, f: impl FnOnce(TypeActionsBuilder<T>) -> TypeActionsBuilder<T>) -> Self
	where
		T: Any + Send + Sync,
	{
		let key = TypeKey::of::<T>();
		let built = f(TypeActionsBuilder::new());
		let (_, actions) = self.types.entry(key.id()).or_insert_with(|| (key, TypeActions::default()));
		for entry in built.entries {
			actions.scope_mut(entry.scope()).entry(entry.name().into()).or_default().push(entry);
		}
		actions.guards.extend(built.guards);
		self
	}

	/// Freezes the table, rejecting duplicate registrations.
	pub fn build(self) -> Result<ActionRegistry, ActionError> {
		let mut types = FxHashMap::default();
		for (id, (key, actions)) in self.types {
			for scope in [ActionScope::Static, ActionScope::Instance] {
				for (name, overloads) in actions.scope(scope) {
					let mut arities: Vec<usize> = overloads.iter().map(ActionEntry::arity).collect();
					arities.sort_unstable();
					if arities.windows(2).any(|pair| pair[0] == pair[1]) {
						return Err(ActionError::AmbiguousMethod {
							action: name.to_string(),
							target: format!("{scope} {}", key.name()),
							candidates: overloads.len(),
						});
					}
				}
			}
			tracing::trace!(target: "tether::action", ty = key.name(), statics = actions.statics.len(), instances = actions.instances.len(), "action.registry.type");
			types.insert(id, actions);
		}
		Ok(ActionRegistry { types: Arc::new(types) })
	}
}

/// Registration surface for one view-model type.
pub struct TypeActionsBuilder<T> {
	key: TypeKey,
	entries: Vec<ActionEntry>,
	guards: Vec<(Box<str>, Arc<GuardFn>)>,
	_marker: PhantomData<fn(&T)>,
}

impl<T> TypeActionsBuilder<T>
where
	T: Any + Send + Sync,
{
	fn new() -> Self {
		Self {
			key: TypeKey::of::<T>(),
			entries: Vec::new(),
			guards: Vec::new(),
			_marker: PhantomData,
		}
	}

	/// Registers an instance action taking `arity` parameters.
	pub fn instance<F>(mut self, name: &str, arity: usize, handler: F) -> Self
	where
		F: Fn(&T, &ActionArgs) -> ActionResult + Send + Sync + 'static,
	{
		let owner = self.key;
		let f: Arc<InstanceFn> = Arc::new(move |receiver: &TargetInstance, args: &ActionArgs| {
			let receiver = receiver
				.downcast_ref::<T>()
				.ok_or_else(|| anyhow!("receiver is not a {}", owner.name()))?;
			handler(receiver, args)
		});
		self.entries.push(ActionEntry {
			name: name.into(),
			owner,
			arity,
			handler: Handler::Instance(f),
		});
		self
	}

	/// Registers a static action taking `arity` parameters.
	pub fn static_action<F>(mut self, name: &str, arity: usize, handler: F) -> Self
	where
		F: Fn(&ActionArgs) -> ActionResult + Send + Sync + 'static,
	{
		self.entries.push(ActionEntry {
			name: name.into(),
			owner: self.key,
			arity,
			handler: Handler::Static(Arc::new(handler)),
		});
		self
	}

	/// Registers the availability guard for instance action `name`.
	///
	/// Command call sites report `can_execute() == false` while the guard
	/// returns `false`.
	pub fn instance_guard<G>(mut self, name: &str, guard: G) -> Self
	where
		G: Fn(&T) -> bool + Send + Sync + 'static,
	{
		let f: Arc<GuardFn> = Arc::new(move |receiver: &TargetInstance| receiver.downcast_ref::<T>().is_some_and(&guard));
		self.guards.push((name.into(), f));
		self
	}
}
