/// What an action does when its target or its handler is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "snake_case"))]
pub enum UnavailableBehavior {
	/// Fail with an error.
	Throw,
	/// Log and leave the action inert.
	Continue,
}

/// Unavailable-behavior policies for one action, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default, deny_unknown_fields))]
pub struct ActionPolicies {
	/// Applied when the target is set to null.
	pub null_target: UnavailableBehavior,
	/// Applied when the target has no action of the requested name.
	pub action_not_found: UnavailableBehavior,
}

impl ActionPolicies {
	/// Both conditions are errors.
	pub const STRICT: Self = Self::new(UnavailableBehavior::Throw, UnavailableBehavior::Throw);
	/// Both conditions leave the action inert.
	pub const LENIENT: Self = Self::new(UnavailableBehavior::Continue, UnavailableBehavior::Continue);

	pub const fn new(null_target: UnavailableBehavior, action_not_found: UnavailableBehavior) -> Self {
		Self {
			null_target,
			action_not_found,
		}
	}
}

impl Default for ActionPolicies {
	/// A null target disables the action; a missing action is an error.
	fn default() -> Self {
		Self::new(UnavailableBehavior::Continue, UnavailableBehavior::Throw)
	}
}
