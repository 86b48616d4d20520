use tether_dispatch::DispatchError;
use thiserror::Error;

/// Errors returned by [`NotifyingList`](crate::NotifyingList) mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
	#[error("index {index} is out of range for a list of length {len}")]
	IndexOutOfRange { index: usize, len: usize },
	/// A subscriber tried to mutate the list while a `Changed` event was being delivered.
	#[error("cannot change the list while a change notification is being delivered")]
	Reentrancy,
	#[error(transparent)]
	Dispatch(#[from] DispatchError),
}
