//! Configuration for the status server
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (`Config::default()`)
//! 2. Config file (TOML)
//! 3. Environment variables (`SYNCSTAT_*` prefix)
//! 4. CLI flags (applied by `main`, highest priority)

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::socket_path::default_socket_path;

/// Default product/branding name; it names the socket
pub const DEFAULT_APP_NAME: &str = "syncstat";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Branding name the socket address is derived from
	pub app_name: String,

	/// Explicit socket address, overriding the derived one
	pub socket_path: Option<PathBuf>,

	/// Roots of the managed folders
	pub folders: Vec<PathBuf>,

	/// Glob patterns excluded from sync status (e.g. "*.tmp")
	pub exclude_patterns: Vec<String>,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			app_name: DEFAULT_APP_NAME.to_string(),
			socket_path: None,
			folders: Vec::new(),
			exclude_patterns: Vec::new(),
		}
	}
}

impl Config {
	/// Load configuration from a TOML file, then apply environment overrides
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let contents = fs::read_to_string(path)
			.map_err(|e| ConfigError::ReadFailed { path: path.to_path_buf(), source: e })?;

		let mut config: Config = toml::from_str(&contents).map_err(|e| {
			ConfigError::ParseFailed { path: path.to_path_buf(), message: e.to_string() }
		})?;
		config.apply_env();
		Ok(config)
	}

	/// Defaults plus environment overrides, for running without a file
	pub fn from_env() -> Self {
		let mut config = Config::default();
		config.apply_env();
		config
	}

	fn apply_env(&mut self) {
		if let Ok(name) = env::var("SYNCSTAT_APP_NAME") {
			if !name.is_empty() {
				self.app_name = name;
			}
		}
		if let Some(path) = env::var_os("SYNCSTAT_SOCKET") {
			if !path.is_empty() {
				self.socket_path = Some(PathBuf::from(path));
			}
		}
	}

	/// The effective socket address: the explicit override, or the one
	/// derived from the app name
	pub fn socket_path(&self) -> PathBuf {
		match &self.socket_path {
			Some(path) => path.clone(),
			None => default_socket_path(&self.app_name),
		}
	}

	/// Compile the exclude patterns
	pub fn compiled_excludes(&self) -> Result<Vec<glob::Pattern>, ConfigError> {
		self.exclude_patterns
			.iter()
			.map(|p| {
				glob::Pattern::new(p).map_err(|e| ConfigError::InvalidPattern {
					pattern: p.clone(),
					message: e.to_string(),
				})
			})
			.collect()
	}
}


// vim: ts=4
