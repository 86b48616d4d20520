//! View-model actions: registration, target resolution, and invocation.
//!
//! Views name an action (`"Save"`) and supply a target: either a view-model
//! instance or a type marker for static actions. The [`ActionResolver`] keeps
//! the name bound against the *current* target as it changes, applying the
//! configured [`UnavailableBehavior`] when the target is null or the action
//! is missing, and invokes the bound handler with failures surfaced to the
//! caller or, for asynchronous handlers, to the process-wide failure sink.
//!
//! # Registration
//!
//! Actions are registered once per view-model type with
//! [`ActionRegistryBuilder`]; lookup is an exact, case-sensitive name match
//! in the static or instance scope of the target's type.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use tether_action::{ActionArgs, ActionRegistryBuilder, ActionReturn, ActionTarget, CommandAction, ResolverOptions};
//!
//! #[derive(Default)]
//! struct Counter {
//! 	clicks: AtomicUsize,
//! }
//!
//! let registry = ActionRegistryBuilder::new()
//! 	.register::<Counter>(|actions| {
//! 		actions.instance("Click", 0, |vm: &Counter, _args: &ActionArgs| {
//! 			vm.clicks.fetch_add(1, Ordering::SeqCst);
//! 			Ok(ActionReturn::Done)
//! 		})
//! 	})
//! 	.build()
//! 	.unwrap();
//!
//! let vm = Arc::new(Counter::default());
//! let command = CommandAction::new(&registry, "Click", ActionTarget::instance(Arc::clone(&vm)), ResolverOptions::default()).unwrap();
//! assert!(command.can_execute());
//! command.execute(None).unwrap();
//! assert_eq!(vm.clicks.load(Ordering::SeqCst), 1);
//! ```

mod args;
mod command;
mod error;
mod event;
pub mod failure;
mod logger;
mod policy;
mod registry;
mod resolver;
mod target;
mod task;

pub use args::{ActionArg, ActionArgs};
pub use command::CommandAction;
pub use error::{ActionError, ActionPanic};
pub use event::EventAction;
pub use failure::{FailureKind, UnhandledFailure};
pub use logger::{ActionLogger, TracingLogger};
pub use policy::{ActionPolicies, UnavailableBehavior};
pub use registry::{ActionEntry, ActionRegistry, ActionRegistryBuilder, ActionResult, ActionScope, Lookup, TypeActionsBuilder};
pub use resolver::{ActionResolver, ActionState, BoundAction, ResolverOptions, TargetTransition};
pub use target::{ActionTarget, TargetInstance, TypeKey};
pub use task::{ActionOutcome, ActionReturn, PendingTask};
