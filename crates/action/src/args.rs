use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

/// One caller-supplied action parameter.
///
/// Keeps a `Debug` rendering captured at construction so failures can be
/// logged with their parameter values.
#[derive(Clone)]
pub struct ActionArg {
	value: Arc<dyn Any + Send + Sync>,
	rendered: Arc<str>,
}

impl ActionArg {
	pub fn new<T: Any + fmt::Debug + Send + Sync>(value: T) -> Self {
		let rendered = format!("{value:?}");
		Self {
			value: Arc::new(value),
			rendered: rendered.into(),
		}
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		(*self.value).downcast_ref::<T>()
	}

	pub fn is<T: Any>(&self) -> bool {
		(*self.value).is::<T>()
	}
}

impl fmt::Debug for ActionArg {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.rendered)
	}
}

/// Ordered parameter list handed to an action handler.
///
/// Arity is validated by the call site against the registered action; the
/// handler only extracts typed values.
#[derive(Clone, Debug, Default)]
pub struct ActionArgs {
	items: Vec<ActionArg>,
}

impl ActionArgs {
	pub fn new(items: Vec<ActionArg>) -> Self {
		Self { items }
	}

	pub fn empty() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, ActionArg> {
		self.items.iter()
	}

	/// Returns parameter `index` as `T`, failing when it is missing or of
	/// another type.
	pub fn get<T: Any>(&self, index: usize) -> anyhow::Result<&T> {
		let arg = self
			.items
			.get(index)
			.ok_or_else(|| anyhow!("missing action parameter {index} (got {})", self.items.len()))?;
		arg.downcast_ref::<T>()
			.ok_or_else(|| anyhow!("action parameter {index} ({arg:?}) is not a {}", type_name::<T>()))
	}

	/// Renders the parameter values for diagnostics, e.g. `[1, "a"]`.
	pub fn describe(&self) -> String {
		format!("{:?}", self.items)
	}
}

impl From<Vec<ActionArg>> for ActionArgs {
	fn from(items: Vec<ActionArg>) -> Self {
		Self::new(items)
	}
}

impl FromIterator<ActionArg> for ActionArgs {
	fn from_iter<I: IntoIterator<Item = ActionArg>>(iter: I) -> Self {
		Self::new(iter.into_iter().collect())
	}
}
