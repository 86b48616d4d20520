/// Shape of a list mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
	Add,
	Remove,
	Replace,
	Reset,
}

/// Delta carried by `Changing` and `Changed` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionChange<T> {
	Add { index: usize, item: T },
	Remove { index: usize, item: T },
	Replace { index: usize, old: T, new: T },
	/// Treat the whole list as changed and re-read it.
	Reset,
}

impl<T> CollectionChange<T> {
	pub fn kind(&self) -> ChangeKind {
		match self {
			Self::Add { .. } => ChangeKind::Add,
			Self::Remove { .. } => ChangeKind::Remove,
			Self::Replace { .. } => ChangeKind::Replace,
			Self::Reset => ChangeKind::Reset,
		}
	}

	/// Index the delta applies to; `None` for [`CollectionChange::Reset`].
	pub fn index(&self) -> Option<usize> {
		match self {
			Self::Add { index, .. } | Self::Remove { index, .. } | Self::Replace { index, .. } => Some(*index),
			Self::Reset => None,
		}
	}
}

/// Derived list property that bindings may observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListProperty {
	Count,
	Indexer,
}

impl ListProperty {
	/// Binding path name of the property.
	pub const fn name(self) -> &'static str {
		match self {
			Self::Count => "Count",
			Self::Indexer => "Item[]",
		}
	}
}

/// Notification delivered to list subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent<T> {
	/// Raised before the mutation is applied.
	Changing(CollectionChange<T>),
	/// Raised after the mutation is applied. The list rejects mutations while
	/// this is being delivered.
	Changed(CollectionChange<T>),
	PropertyChanged(ListProperty),
}

impl<T> ListEvent<T> {
	pub fn change(&self) -> Option<&CollectionChange<T>> {
		match self {
			Self::Changing(change) | Self::Changed(change) => Some(change),
			Self::PropertyChanged(_) => None,
		}
	}
}
