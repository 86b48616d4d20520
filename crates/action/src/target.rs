use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Runtime identity of a view-model type.
#[derive(Clone, Copy)]
pub struct TypeKey {
	id: TypeId,
	name: &'static str,
}

impl TypeKey {
	/// Returns the key for `T`.
	pub fn of<T: Any + ?Sized>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	/// Fully qualified type name, for diagnostics only.
	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl PartialEq for TypeKey {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// Shared view-model instance used as an action receiver.
#[derive(Clone)]
pub struct TargetInstance {
	value: Arc<dyn Any + Send + Sync>,
	type_key: TypeKey,
}

impl TargetInstance {
	pub fn new<T: Any + Send + Sync>(value: Arc<T>) -> Self {
		Self {
			value,
			type_key: TypeKey::of::<T>(),
		}
	}

	/// Key of the instance's runtime type.
	pub fn type_key(&self) -> TypeKey {
		self.type_key
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		(*self.value).downcast_ref::<T>()
	}

	/// Returns `true` when both handles point at the same instance.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		std::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(&other.value))
	}
}

impl fmt::Debug for TargetInstance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}@{:p}", self.type_key.name, Arc::as_ptr(&self.value))
	}
}

/// Current target of an action.
///
/// `Unassigned` means the owning view has not been wired to a target yet and
/// is distinct from an explicit `Null`.
#[derive(Clone, Debug, Default)]
pub enum ActionTarget {
	#[default]
	Unassigned,
	Null,
	/// Static actions of a type.
	Static(TypeKey),
	/// Instance actions of a view-model.
	Instance(TargetInstance),
}

impl ActionTarget {
	pub fn instance<T: Any + Send + Sync>(value: Arc<T>) -> Self {
		Self::Instance(TargetInstance::new(value))
	}

	pub fn of_type<T: Any>() -> Self {
		Self::Static(TypeKey::of::<T>())
	}

	pub fn is_unassigned(&self) -> bool {
		matches!(self, Self::Unassigned)
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Short description for logs and error messages.
	pub fn describe(&self) -> String {
		match self {
			Self::Unassigned => "<unassigned>".to_string(),
			Self::Null => "null".to_string(),
			Self::Static(key) => format!("static {}", key.name()),
			Self::Instance(instance) => format!("instance of {}", instance.type_key().name()),
		}
	}
}

impl PartialEq for ActionTarget {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Unassigned, Self::Unassigned) | (Self::Null, Self::Null) => true,
			(Self::Static(a), Self::Static(b)) => a == b,
			(Self::Instance(a), Self::Instance(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}
