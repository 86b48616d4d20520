use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tether_dispatch::{Dispatcher, SyncDispatcher, ThreadDispatcher};

use super::*;

fn list<T: Clone + Send + Sync + 'static>(items: impl IntoIterator<Item = T>) -> NotifyingList<T> {
	NotifyingList::with_items(Arc::new(SyncDispatcher::new()), items)
}

fn record<T: Clone + Send + Sync + 'static>(list: &NotifyingList<T>) -> (Arc<Mutex<Vec<ListEvent<T>>>>, Subscription) {
	let events = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&events);
	let subscription = list.subscribe(move |event| sink.lock().push(event.clone()));
	(events, subscription)
}

fn reset_pair<T>() -> Vec<ListEvent<T>> {
	vec![
		ListEvent::Changing(CollectionChange::Reset),
		ListEvent::PropertyChanged(ListProperty::Count),
		ListEvent::PropertyChanged(ListProperty::Indexer),
		ListEvent::Changed(CollectionChange::Reset),
	]
}

#[test]
fn insert_raises_changing_properties_then_changed() {
	let list = list(["a", "c"]);
	let (events, _sub) = record(&list);

	list.insert(1, "b").unwrap();

	assert_eq!(list.snapshot(), vec!["a", "b", "c"]);
	assert_eq!(
		*events.lock(),
		vec![
			ListEvent::Changing(CollectionChange::Add { index: 1, item: "b" }),
			ListEvent::PropertyChanged(ListProperty::Count),
			ListEvent::PropertyChanged(ListProperty::Indexer),
			ListEvent::Changed(CollectionChange::Add { index: 1, item: "b" }),
		]
	);
}

#[test]
fn replace_only_touches_indexer() {
	let list = list([1, 2, 3]);
	let (events, _sub) = record(&list);

	assert_eq!(list.set(1, 20).unwrap(), 2);

	assert_eq!(
		*events.lock(),
		vec![
			ListEvent::Changing(CollectionChange::Replace { index: 1, old: 2, new: 20 }),
			ListEvent::PropertyChanged(ListProperty::Indexer),
			ListEvent::Changed(CollectionChange::Replace { index: 1, old: 2, new: 20 }),
		]
	);
}

#[test]
fn remove_and_clear_report_their_deltas() {
	let list = list(['x', 'y', 'x']);
	let (events, _sub) = record(&list);

	assert!(list.remove(&'x').unwrap());
	assert!(!list.remove(&'q').unwrap());
	assert_eq!(list.snapshot(), vec!['y', 'x']);
	assert_eq!(
		events.lock()[0],
		ListEvent::Changing(CollectionChange::Remove { index: 0, item: 'x' })
	);
	assert_eq!(events.lock().len(), 4, "absent item must raise nothing");

	events.lock().clear();
	list.clear().unwrap();
	assert!(list.is_empty());
	assert_eq!(*events.lock(), reset_pair());
}

#[test]
fn bad_index_is_rejected_before_any_event() {
	let list = list([1, 2]);
	let (events, _sub) = record(&list);

	assert_eq!(list.insert(3, 9), Err(CollectionError::IndexOutOfRange { index: 3, len: 2 }));
	assert_eq!(list.set(2, 9), Err(CollectionError::IndexOutOfRange { index: 2, len: 2 }));
	assert_eq!(list.remove_at(5), Err(CollectionError::IndexOutOfRange { index: 5, len: 2 }));
	assert!(events.lock().is_empty());
	assert_eq!(list.snapshot(), vec![1, 2]);
}

#[test]
fn add_range_raises_a_single_reset_pair() {
	let list = list([1]);
	let (events, _sub) = record(&list);

	list.add_range([2, 3, 4]).unwrap();

	assert_eq!(list.snapshot(), vec![1, 2, 3, 4]);
	assert_eq!(*events.lock(), reset_pair());
	assert!(list.is_notifying());
}

#[test]
fn remove_range_removes_first_occurrences_only() {
	let list = list(["x", "y", "y", "z"]);
	let (events, _sub) = record(&list);

	list.remove_range(["x", "y", "absent"]).unwrap();

	assert_eq!(list.snapshot(), vec!["y", "z"]);
	assert_eq!(*events.lock(), reset_pair());
}

#[test]
fn refresh_keeps_contents_and_identity() {
	let items: Vec<Arc<String>> = ["alpha", "beta"].into_iter().map(|s| Arc::new(s.to_owned())).collect();
	let list = list(items.clone());
	let (events, _sub) = record(&list);

	list.refresh().unwrap();

	let after = list.snapshot();
	assert_eq!(after.len(), items.len());
	for (before, after) in items.iter().zip(&after) {
		assert!(Arc::ptr_eq(before, after));
	}
	assert_eq!(*events.lock(), reset_pair());
}

#[test]
fn silenced_list_stays_silent_after_batch() {
	let list = list([1, 2]);
	let (events, _sub) = record(&list);
	list.set_notifying(false);

	list.add_range([3, 4]).unwrap();
	list.remove_range([1]).unwrap();
	list.push(5).unwrap();

	assert!(!list.is_notifying());
	assert!(events.lock().is_empty());
	assert_eq!(list.snapshot(), vec![2, 3, 4, 5]);
}

#[test]
fn nested_batch_from_changing_handler_restores_flag() {
	let list = list([1, 2, 3]);
	let (events, _sub) = record(&list);

	let nested = list.clone();
	let fired = Arc::new(AtomicBool::new(false));
	let f = Arc::clone(&fired);
	let _nest = list.subscribe(move |event| {
		if matches!(event, ListEvent::Changing(CollectionChange::Reset)) && !f.swap(true, Ordering::SeqCst) {
			nested.remove_range([1]).unwrap();
		}
	});

	list.add_range([4]).unwrap();

	assert!(list.is_notifying());
	assert_eq!(list.snapshot(), vec![2, 3, 4]);
	let pair = reset_pair::<i32>();
	let expected: Vec<ListEvent<i32>> = [&pair[..1], &pair[..], &pair[1..]].concat();
	assert_eq!(*events.lock(), expected);
}

#[derive(Debug, Clone)]
struct Fragile(&'static str);

impl PartialEq for Fragile {
	fn eq(&self, other: &Self) -> bool {
		if self.0 == "poison" || other.0 == "poison" {
			panic!("comparison failed");
		}
		self.0 == other.0
	}
}

#[test]
fn flag_is_restored_when_batch_unwinds() {
	let list = list([Fragile("a"), Fragile("b")]);

	let outcome = panic::catch_unwind(AssertUnwindSafe(|| list.remove_range([Fragile("poison")])));

	assert!(outcome.is_err());
	assert!(list.is_notifying());
	assert_eq!(list.len(), 2);
}

#[test]
fn flag_is_restored_when_nested_batch_unwinds() {
	let list = list([Fragile("a"), Fragile("b")]);
	let (events, _sub) = record(&list);

	let nested = list.clone();
	let fired = Arc::new(AtomicBool::new(false));
	let f = Arc::clone(&fired);
	let _nest = list.subscribe(move |event| {
		if matches!(event, ListEvent::Changing(CollectionChange::Reset)) && !f.swap(true, Ordering::SeqCst) {
			let unwound = panic::catch_unwind(AssertUnwindSafe(|| nested.remove_range([Fragile("poison")])));
			assert!(unwound.is_err());
		}
	});

	list.add_range([Fragile("c")]).unwrap();

	assert!(list.is_notifying());
	assert_eq!(list.len(), 3);
	let pair = reset_pair::<Fragile>();
	let expected: Vec<ListEvent<Fragile>> = [&pair[..1], &pair[..], &pair[1..]].concat();
	assert_eq!(*events.lock(), expected);
}

#[test]
fn batch_that_unwinds_midway_still_closes_reset() {
	let list = list([Fragile("a"), Fragile("b"), Fragile("c")]);
	let (events, _sub) = record(&list);

	let outcome = panic::catch_unwind(AssertUnwindSafe(|| list.remove_range([Fragile("a"), Fragile("poison")])));

	assert!(outcome.is_err());
	assert_eq!(list.len(), 2, "the first removal was applied before the failure");
	assert!(list.is_notifying());
	let kinds: Vec<_> = events.lock().iter().map(|event| event.change().map(CollectionChange::kind)).collect();
	assert_eq!(kinds, vec![Some(ChangeKind::Reset), None, None, Some(ChangeKind::Reset)]);
	assert!(matches!(events.lock().last(), Some(ListEvent::Changed(CollectionChange::Reset))));
}

#[test]
fn changed_handler_cannot_mutate() {
	let list = list([1]);
	let outcome = Arc::new(Mutex::new(None));

	let nested = list.clone();
	let o = Arc::clone(&outcome);
	let _sub = list.subscribe(move |event| {
		if let ListEvent::Changed(_) = event {
			*o.lock() = Some(nested.push(99));
		}
	});

	list.push(2).unwrap();

	assert_eq!(*outcome.lock(), Some(Err(CollectionError::Reentrancy)));
	assert_eq!(list.snapshot(), vec![1, 2]);
}

#[test]
fn changing_handler_may_mutate() {
	let list = list([1]);

	let nested = list.clone();
	let fired = Arc::new(AtomicBool::new(false));
	let f = Arc::clone(&fired);
	let _sub = list.subscribe(move |event| {
		if let ListEvent::Changing(CollectionChange::Add { item: 2, .. }) = event
			&& !f.swap(true, Ordering::SeqCst)
		{
			nested.push(10).unwrap();
		}
	});

	list.push(2).unwrap();

	// The outer insert keeps its index, so the nested push lands after it.
	assert_eq!(list.snapshot(), vec![1, 2, 10]);
}

#[test]
fn dropping_subscription_unsubscribes() {
	let list = list([0]);
	let (events, sub) = record(&list);
	let (kept, kept_sub) = record(&list);
	kept_sub.detach();

	list.push(1).unwrap();
	drop(sub);
	list.push(2).unwrap();

	assert_eq!(events.lock().len(), 4);
	assert_eq!(kept.lock().len(), 8);
}

#[test]
fn handler_may_unsubscribe_itself_during_delivery() {
	let list = list([0]);
	let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
	let hits = Arc::new(Mutex::new(0));

	let s = Arc::clone(&slot);
	let h = Arc::clone(&hits);
	let sub = list.subscribe(move |_| {
		*h.lock() += 1;
		s.lock().take();
	});
	*slot.lock() = Some(sub);

	list.push(1).unwrap();

	assert_eq!(*hits.lock(), 1);
}

#[test]
fn mutations_are_marshaled_to_affinity_thread() {
	let (dispatcher, _thread) = ThreadDispatcher::spawn("tether-list-ui").unwrap();
	let dispatcher: Arc<dyn Dispatcher> = Arc::new(dispatcher);
	let list: NotifyingList<u32> = NotifyingList::new(Arc::clone(&dispatcher));
	assert!(!dispatcher.is_current());

	let observed = Arc::new(Mutex::new(Vec::new()));
	let o = Arc::clone(&observed);
	let affinity = Arc::clone(&dispatcher);
	let _sub = list.subscribe(move |_| {
		o.lock().push((affinity.is_current(), std::thread::current().name().map(str::to_owned)));
	});

	list.push(1).unwrap();
	list.add_range([2, 3]).unwrap();

	assert_eq!(list.snapshot(), vec![1, 2, 3]);
	let observed = observed.lock();
	assert_eq!(observed.len(), 8);
	assert!(
		observed
			.iter()
			.all(|(current, name)| *current && name.as_deref() == Some("tether-list-ui"))
	);
}

#[test]
fn closed_dispatcher_surfaces_as_collection_error() {
	let dispatcher = std::thread::spawn(|| {
		let (pump, dispatcher) = tether_dispatch::DispatchLoop::new();
		drop(pump);
		dispatcher
	})
	.join()
	.unwrap();
	let list = NotifyingList::new(Arc::new(dispatcher));

	assert_eq!(list.push(1), Err(CollectionError::Dispatch(tether_dispatch::DispatchError::Closed)));
}

#[test]
fn inline_dispatcher_serializes_concurrent_callers() {
	let list: NotifyingList<u32> = list([]);
	let (events, _sub) = record(&list);

	let writers: Vec<_> = (0..8u32)
		.map(|worker| {
			let list = list.clone();
			std::thread::spawn(move || {
				for n in 0..50 {
					list.push(worker * 1000 + n).unwrap();
				}
			})
		})
		.collect();
	for writer in writers {
		writer.join().unwrap();
	}
	assert_eq!(list.len(), 400);

	let removers: Vec<_> = (0..8u32)
		.map(|worker| {
			let list = list.clone();
			std::thread::spawn(move || (0..50).all(|n| list.remove(&(worker * 1000 + n)) == Ok(true)))
		})
		.collect();
	for remover in removers {
		assert!(remover.join().unwrap(), "every caller removes exactly its own items");
	}
	assert!(list.is_empty());

	// Each push and each remove raised its own complete four-event sequence.
	let events = events.lock();
	assert_eq!(events.len(), 800 * 4);
	for chunk in events.chunks(4) {
		assert!(matches!(chunk[0], ListEvent::Changing(_)));
		assert!(matches!(chunk[3], ListEvent::Changed(_)));
		assert_eq!(chunk[0].change().map(CollectionChange::kind), chunk[3].change().map(CollectionChange::kind));
	}
}
