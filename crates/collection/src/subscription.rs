use std::fmt;
use std::sync::Weak;

pub(crate) trait Unsubscribe: Send + Sync {
	fn unsubscribe(&self, id: u64);
}

/// Keeps a list handler registered; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
	list: Option<Weak<dyn Unsubscribe>>,
	id: u64,
}

impl Subscription {
	pub(crate) fn new(list: Weak<dyn Unsubscribe>, id: u64) -> Self {
		Self { list: Some(list), id }
	}

	/// Keeps the handler registered for the lifetime of the list.
	pub fn detach(mut self) {
		self.list = None;
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(list) = self.list.take().and_then(|list| list.upgrade()) {
			list.unsubscribe(self.id);
		}
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("attached", &self.list.is_some())
			.finish()
	}
}
