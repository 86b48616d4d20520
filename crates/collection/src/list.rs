use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tether_dispatch::{Dispatcher, DispatcherExt};

use crate::change::{CollectionChange, ListEvent, ListProperty};
use crate::error::CollectionError;
use crate::subscription::{Subscription, Unsubscribe};

type Handler<T> = Arc<dyn Fn(&ListEvent<T>) + Send + Sync>;

/// Ordered list whose mutations run on one affinity thread and raise change
/// notifications.
///
/// Cloning yields another handle to the same list. Reads take the item lock
/// directly and may happen from any thread; mutations are marshaled through
/// [`Dispatcher::send`] and block until applied.
pub struct NotifyingList<T> {
	inner: Arc<ListInner<T>>,
	dispatcher: Arc<dyn Dispatcher>,
}

impl<T> Clone for NotifyingList<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
			dispatcher: Arc::clone(&self.dispatcher),
		}
	}
}

impl<T> fmt::Debug for NotifyingList<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NotifyingList")
			.field("len", &self.inner.items.lock().len())
			.field("notifying", &self.inner.notifying.load(Ordering::Acquire))
			.field("subscribers", &self.inner.handlers.lock().len())
			.finish_non_exhaustive()
	}
}

impl<T: Clone + Send + Sync + 'static> NotifyingList<T> {
	pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
		Self::with_items(dispatcher, Vec::new())
	}

	/// Creates a list seeded with `items`; no events are raised for them.
	pub fn with_items(dispatcher: Arc<dyn Dispatcher>, items: impl IntoIterator<Item = T>) -> Self {
		Self {
			inner: Arc::new(ListInner {
				serial: ReentrantMutex::new(()),
				items: Mutex::new(items.into_iter().collect()),
				notifying: AtomicBool::new(true),
				delivering: AtomicUsize::new(0),
				handlers: Mutex::new(Vec::new()),
				next_id: AtomicU64::new(0),
			}),
			dispatcher,
		}
	}

	pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
		&self.dispatcher
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, index: usize) -> Option<T> {
		self.inner.item_at(index)
	}

	/// Copies the current contents.
	pub fn snapshot(&self) -> Vec<T> {
		self.inner.items.lock().clone()
	}

	/// Whether mutations currently raise events.
	pub fn is_notifying(&self) -> bool {
		self.inner.notifying.load(Ordering::Acquire)
	}

	/// Enables or silences notifications. Batch operations restore whatever
	/// value was set here when they finish.
	pub fn set_notifying(&self, enabled: bool) {
		self.inner.notifying.store(enabled, Ordering::Release);
	}

	/// Registers `handler` for every event raised by this list.
	///
	/// Handlers run on the affinity thread. They may read the list and
	/// (un)subscribe; they may mutate it from `Changing` and `PropertyChanged`
	/// but not from `Changed`.
	pub fn subscribe(&self, handler: impl Fn(&ListEvent<T>) + Send + Sync + 'static) -> Subscription {
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		self.inner.handlers.lock().push((id, Arc::new(handler)));
		let list: Weak<ListInner<T>> = Arc::downgrade(&self.inner);
		Subscription::new(list, id)
	}

	pub fn push(&self, item: T) -> Result<(), CollectionError> {
		self.marshal(move |inner| inner.insert(inner.len(), item))
	}

	/// Inserts `item` at `index`; `index == len()` appends.
	pub fn insert(&self, index: usize, item: T) -> Result<(), CollectionError> {
		self.marshal(move |inner| inner.insert(index, item))
	}

	/// Replaces the item at `index`, returning the previous one.
	pub fn set(&self, index: usize, item: T) -> Result<T, CollectionError> {
		self.marshal(move |inner| inner.set(index, item))
	}

	pub fn remove_at(&self, index: usize) -> Result<T, CollectionError> {
		self.marshal(move |inner| inner.remove_at(index))
	}

	pub fn clear(&self) -> Result<(), CollectionError> {
		self.marshal(|inner| inner.clear())
	}

	/// Appends `items` in iteration order, raising one `Reset` pair.
	pub fn add_range(&self, items: impl IntoIterator<Item = T>) -> Result<(), CollectionError> {
		let items: Vec<T> = items.into_iter().collect();
		self.marshal(move |inner| inner.add_range(items))
	}

	/// Raises a `Reset` pair without changing the contents.
	pub fn refresh(&self) -> Result<(), CollectionError> {
		self.marshal(|inner| inner.refresh())
	}

	fn marshal<R, F>(&self, apply: F) -> Result<R, CollectionError>
	where
		R: Send + 'static,
		F: FnOnce(&ListInner<T>) -> Result<R, CollectionError> + Send + 'static,
	{
		let inner = Arc::clone(&self.inner);
		self.dispatcher.send_with(move || {
			let _serial = inner.serial.lock();
			apply(&inner)
		})?
	}
}

impl<T: Clone + PartialEq + Send + Sync + 'static> NotifyingList<T> {
	pub fn contains(&self, item: &T) -> bool {
		self.index_of(item).is_some()
	}

	pub fn index_of(&self, item: &T) -> Option<usize> {
		self.inner.index_of(item)
	}

	/// Removes the first occurrence of `item`; `Ok(false)` when absent.
	pub fn remove(&self, item: &T) -> Result<bool, CollectionError> {
		let item = item.clone();
		self.marshal(move |inner| match inner.index_of(&item) {
			Some(index) => inner.remove_at(index).map(|_| true),
			None => Ok(false),
		})
	}

	/// Removes the first occurrence of each of `items`, skipping absent ones,
	/// raising one `Reset` pair.
	pub fn remove_range(&self, items: impl IntoIterator<Item = T>) -> Result<(), CollectionError> {
		let items: Vec<T> = items.into_iter().collect();
		self.marshal(move |inner| inner.remove_range(items))
	}
}

/// Shared list state. Every method below runs on the affinity thread.
struct ListInner<T> {
	/// Held for the whole of each marshaled operation, delivery included.
	/// Uncontended on a real affinity thread; with a dispatcher that runs work
	/// inline on every caller it keeps concurrent operations from interleaving.
	/// Reentrant so handlers may still mutate the list from their own thread.
	serial: ReentrantMutex<()>,
	items: Mutex<Vec<T>>,
	notifying: AtomicBool,
	delivering: AtomicUsize,
	handlers: Mutex<Vec<(u64, Handler<T>)>>,
	next_id: AtomicU64,
}

impl<T: Send + Sync> Unsubscribe for ListInner<T> {
	fn unsubscribe(&self, id: u64) {
		self.handlers.lock().retain(|(handler_id, _)| *handler_id != id);
	}
}

impl<T: Clone + Send + Sync + 'static> ListInner<T> {
	fn len(&self) -> usize {
		self.items.lock().len()
	}

	fn item_at(&self, index: usize) -> Option<T> {
		self.items.lock().get(index).cloned()
	}

	fn out_of_range(&self, index: usize) -> CollectionError {
		CollectionError::IndexOutOfRange { index, len: self.len() }
	}

	fn check_reentrancy(&self) -> Result<(), CollectionError> {
		if self.delivering.load(Ordering::Acquire) > 0 {
			tracing::warn!(target: "tether::collection", "collection.mutation.reentrant");
			return Err(CollectionError::Reentrancy);
		}
		Ok(())
	}

	fn insert(&self, index: usize, item: T) -> Result<(), CollectionError> {
		self.check_reentrancy()?;
		if index > self.len() {
			return Err(self.out_of_range(index));
		}

		self.emit(|| ListEvent::Changing(CollectionChange::Add { index, item: item.clone() }));
		{
			let mut items = self.items.lock();
			if index > items.len() {
				return Err(CollectionError::IndexOutOfRange { index, len: items.len() });
			}
			items.insert(index, item.clone());
		}
		self.emit_properties(true);
		self.emit(|| ListEvent::Changed(CollectionChange::Add { index, item }));
		Ok(())
	}

	fn set(&self, index: usize, item: T) -> Result<T, CollectionError> {
		self.check_reentrancy()?;
		let Some(current) = self.item_at(index) else {
			return Err(self.out_of_range(index));
		};

		self.emit(|| {
			ListEvent::Changing(CollectionChange::Replace {
				index,
				old: current,
				new: item.clone(),
			})
		});
		let old = {
			let mut items = self.items.lock();
			if index >= items.len() {
				return Err(CollectionError::IndexOutOfRange { index, len: items.len() });
			}
			mem::replace(&mut items[index], item.clone())
		};
		self.emit_properties(false);
		self.emit(|| {
			ListEvent::Changed(CollectionChange::Replace {
				index,
				old: old.clone(),
				new: item,
			})
		});
		Ok(old)
	}

	fn remove_at(&self, index: usize) -> Result<T, CollectionError> {
		self.check_reentrancy()?;
		let Some(current) = self.item_at(index) else {
			return Err(self.out_of_range(index));
		};

		self.emit(|| ListEvent::Changing(CollectionChange::Remove { index, item: current }));
		let removed = {
			let mut items = self.items.lock();
			if index >= items.len() {
				return Err(CollectionError::IndexOutOfRange { index, len: items.len() });
			}
			items.remove(index)
		};
		self.emit_properties(true);
		self.emit(|| ListEvent::Changed(CollectionChange::Remove { index, item: removed.clone() }));
		Ok(removed)
	}

	fn clear(&self) -> Result<(), CollectionError> {
		self.check_reentrancy()?;
		self.emit(|| ListEvent::Changing(CollectionChange::Reset));
		self.items.lock().clear();
		self.emit_properties(true);
		self.emit(|| ListEvent::Changed(CollectionChange::Reset));
		Ok(())
	}

	fn add_range(&self, items: Vec<T>) -> Result<(), CollectionError> {
		self.check_reentrancy()?;
		tracing::trace!(target: "tether::collection", count = items.len(), "collection.add_range");
		self.batch(|| {
			for item in items {
				self.insert(self.len(), item)?;
			}
			Ok(())
		})
	}

	fn refresh(&self) -> Result<(), CollectionError> {
		self.check_reentrancy()?;
		tracing::trace!(target: "tether::collection", "collection.refresh");
		self.batch(|| Ok(()))
	}

	/// Runs `apply` with notifications silenced, bracketed by one `Reset` pair.
	///
	/// The bracket is closed even when `apply` fails or unwinds partway, since
	/// earlier steps may already have changed the contents.
	fn batch(&self, apply: impl FnOnce() -> Result<(), CollectionError>) -> Result<(), CollectionError> {
		self.emit(|| ListEvent::Changing(CollectionChange::Reset));
		let applied = {
			let _quiet = QuietScope::enter(&self.notifying);
			panic::catch_unwind(AssertUnwindSafe(apply))
		};
		self.emit_properties(true);
		self.emit(|| ListEvent::Changed(CollectionChange::Reset));
		match applied {
			Ok(result) => result,
			Err(payload) => {
				tracing::warn!(target: "tether::collection", "collection.batch.unwound");
				panic::resume_unwind(payload)
			}
		}
	}

	fn emit_properties(&self, count_changed: bool) {
		if count_changed {
			self.emit(|| ListEvent::PropertyChanged(ListProperty::Count));
		}
		self.emit(|| ListEvent::PropertyChanged(ListProperty::Indexer));
	}

	/// Delivers the event to a snapshot of the handlers, if notifying.
	fn emit(&self, event: impl FnOnce() -> ListEvent<T>) {
		if !self.notifying.load(Ordering::Acquire) {
			return;
		}

		let event = event();
		let handlers: Vec<Handler<T>> = self.handlers.lock().iter().map(|(_, handler)| Arc::clone(handler)).collect();
		let _delivery = matches!(event, ListEvent::Changed(_)).then(|| DeliveryGuard::enter(&self.delivering));
		for handler in &handlers {
			handler(&event);
		}
	}
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ListInner<T> {
	fn index_of(&self, item: &T) -> Option<usize> {
		self.items.lock().iter().position(|candidate| candidate == item)
	}

	fn remove_range(&self, items: Vec<T>) -> Result<(), CollectionError> {
		self.check_reentrancy()?;
		tracing::trace!(target: "tether::collection", count = items.len(), "collection.remove_range");
		self.batch(|| {
			for item in &items {
				if let Some(index) = self.index_of(item) {
					self.remove_at(index)?;
				}
			}
			Ok(())
		})
	}
}

/// Silences notifications and restores the previous flag on drop, including
/// during unwinding.
struct QuietScope<'a> {
	flag: &'a AtomicBool,
	saved: bool,
}

impl<'a> QuietScope<'a> {
	fn enter(flag: &'a AtomicBool) -> Self {
		let saved = flag.swap(false, Ordering::AcqRel);
		Self { flag, saved }
	}
}

impl Drop for QuietScope<'_> {
	fn drop(&mut self) {
		self.flag.store(self.saved, Ordering::Release);
	}
}

/// Marks a `Changed` delivery in progress.
struct DeliveryGuard<'a>(&'a AtomicUsize);

impl<'a> DeliveryGuard<'a> {
	fn enter(depth: &'a AtomicUsize) -> Self {
		depth.fetch_add(1, Ordering::AcqRel);
		Self(depth)
	}
}

impl Drop for DeliveryGuard<'_> {
	fn drop(&mut self) {
		let prev = self.0.fetch_sub(1, Ordering::AcqRel);
		debug_assert!(prev > 0, "delivery depth underflow");
	}
}
