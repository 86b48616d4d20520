//! Configuration for tether.
//!
//! Configuration is written in TOML. Every section and key is optional;
//! omitted values fall back to the defaults shown here:
//!
//! ```toml
//! # Policies for command-style call sites (buttons, menu items).
//! [command]
//! null_target = "continue"
//! action_not_found = "throw"
//!
//! # Policies for event-style call sites (clicks, key presses).
//! [event]
//! null_target = "continue"
//! action_not_found = "throw"
//!
//! [dispatcher]
//! thread_name = "tether-ui"
//! ```
//!
//! Unknown keys are rejected so typos surface at startup instead of silently
//! falling back to a default.

pub mod error;


use std::path::Path;
use std::thread::JoinHandle;

pub use error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use tether_action::{ActionPolicies, ResolverOptions};
use tether_dispatch::ThreadDispatcher;

/// Thread name used when none is configured.
pub const DEFAULT_THREAD_NAME: &str = "tether-ui";

/// Parsed tether configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TetherConfig {
	/// Policies for [`CommandAction`](tether_action::CommandAction)s.
	pub command: ActionPolicies,
	/// Policies for [`EventAction`](tether_action::EventAction)s.
	pub event: ActionPolicies,
	pub dispatcher: DispatcherConfig,
}

/// Settings for the dedicated affinity thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
	pub thread_name: String,
}

impl Default for DispatcherConfig {
	fn default() -> Self {
		Self {
			thread_name: DEFAULT_THREAD_NAME.to_owned(),
		}
	}
}

impl DispatcherConfig {
	/// Spawns the affinity thread under the configured name.
	pub fn spawn(&self) -> std::io::Result<(ThreadDispatcher, JoinHandle<()>)> {
		ThreadDispatcher::spawn(self.thread_name.clone())
	}
}

impl TetherConfig {
	/// Parse a TOML string into a validated [`TetherConfig`].
	pub fn from_toml_str(input: &str) -> Result<Self> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Load configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		Self::from_toml_str(&content)
	}

	/// Rejects values that parse but cannot be used.
	pub fn validate(&self) -> Result<()> {
		let name = &self.dispatcher.thread_name;
		if name.trim().is_empty() {
			return Err(ConfigError::InvalidValue("dispatcher.thread_name must not be empty".into()));
		}
		if name.contains('\0') {
			return Err(ConfigError::InvalidValue("dispatcher.thread_name must not contain NUL".into()));
		}
		Ok(())
	}

	/// Resolver options for command call sites, with the default logger.
	pub fn command_options(&self) -> ResolverOptions {
		ResolverOptions::default().policies(self.command)
	}

	/// Resolver options for event call sites, with the default logger.
	pub fn event_options(&self) -> ResolverOptions {
		ResolverOptions::default().policies(self.event)
	}
}
