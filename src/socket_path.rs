//! Platform socket address derivation
//!
//! The address is derived from the product/branding name supplied by
//! configuration: a named pipe on Windows, a socket file in the user's
//! runtime directory elsewhere.

use std::env;
use std::path::PathBuf;

/// Default local-socket address for a given app name.
#[cfg(windows)]
pub fn default_socket_path(app_name: &str) -> PathBuf {
	PathBuf::from(format!(r"\\.\pipe\{}", app_name))
}

/// Default local-socket address for a given app name.
///
/// Prefers `$XDG_RUNTIME_DIR`, then `$TMPDIR`, then `/tmp`.
#[cfg(not(windows))]
pub fn default_socket_path(app_name: &str) -> PathBuf {
	let base = env::var_os("XDG_RUNTIME_DIR")
		.or_else(|| env::var_os("TMPDIR"))
		.map(PathBuf::from)
		.unwrap_or_else(|| PathBuf::from("/tmp"));
	base.join(format!("{}.sock", app_name))
}


// vim: ts=4
