//! Built-in status commands
//!
//! `RETRIEVE_FOLDER_STATUS` and `RETRIEVE_FILE_STATUS` compute a wire status
//! for a path by querying the status provider, and answer on the same
//! connection with `STATUS:<code>:<path>`.
//!
//! Status queries block on filesystem I/O. That is fine here: dispatch is
//! sequential per connection, and each connection runs on its own task, so a
//! slow query delays only its own client.

use async_trait::async_trait;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::connections::ConnectionHandle;
use super::registry::CommandHandler;
use crate::logging::*;
use crate::status::{StatusProvider, SyncFileStatus, SyncFolder};

pub const RETRIEVE_FOLDER_STATUS: &str = "RETRIEVE_FOLDER_STATUS";
pub const RETRIEVE_FILE_STATUS: &str = "RETRIEVE_FILE_STATUS";

/// Wire-level status code
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StatusCode {
	/// Everything under the queried path is in sync
	Ok,
	/// At least one descendant is out of sync
	NeedSync,
	/// The path is not under any managed folder (client offline, or simply
	/// not watched)
	Nop,
}

impl fmt::Display for StatusCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StatusCode::Ok => write!(f, "OK"),
			StatusCode::NeedSync => write!(f, "NEED_SYNC"),
			StatusCode::Nop => write!(f, "NOP"),
		}
	}
}

/// Format the response line for a status query
pub fn status_message(code: StatusCode, path: &str) -> String {
	format!("STATUS:{}:{}", code, path)
}

async fn respond(connection: &ConnectionHandle, code: StatusCode, path: &str) {
	// The client may have disconnected between dispatch and write; that
	// only concerns this one response.
	if let Err(e) = connection.send_line(&status_message(code, path)).await {
		debug!("Could not answer connection {}: {}", connection.id(), e);
	}
}

/// Single-file status, with the STAT_ERROR fold applied
fn file_code(folder: &dyn SyncFolder, absolute: &Path) -> StatusCode {
	let relative = match absolute.strip_prefix(folder.root()) {
		Ok(r) => r,
		Err(_) => {
			warn!("Path {} escaped its owning folder {}", absolute.display(), folder.root().display());
			return StatusCode::NeedSync;
		}
	};

	match folder.file_status(relative) {
		SyncFileStatus::InSync | SyncFileStatus::Ignored => StatusCode::Ok,
		SyncFileStatus::StatError => {
			// No wire slot for stat errors; report the conservative answer
			debug!("Stat error for {}", absolute.display());
			StatusCode::NeedSync
		}
		SyncFileStatus::NeedSync => StatusCode::NeedSync,
	}
}

/// Aggregate status of a directory: direct files first, then each
/// subdirectory recursively. The first out-of-sync hit short-circuits.
fn folder_code(provider: &dyn StatusProvider, path: &Path) -> StatusCode {
	let folder = match provider.folder_for_path(path) {
		Some(f) => f,
		None => {
			// Normal in offline mode: nothing to worry about
			debug!("Folder offline or not watched: {}", path.display());
			return StatusCode::Nop;
		}
	};

	let entries = match fs::read_dir(path) {
		Ok(e) => e,
		Err(e) => {
			debug!("Cannot list {}: {}", path.display(), e);
			return StatusCode::NeedSync;
		}
	};

	let mut subdirs = Vec::new();
	for entry in entries.flatten() {
		if entry.file_name().to_string_lossy().starts_with('.') {
			continue;
		}
		match entry.file_type() {
			Ok(t) if t.is_dir() => subdirs.push(entry.path()),
			Ok(_) => {
				if file_code(folder.as_ref(), &entry.path()) != StatusCode::Ok {
					return StatusCode::NeedSync;
				}
			}
			Err(_) => return StatusCode::NeedSync,
		}
	}

	for subdir in subdirs {
		let relative = match subdir.strip_prefix(folder.root()) {
			Ok(r) => r,
			Err(_) => continue,
		};
		if folder.recursive_status(relative) != SyncFileStatus::InSync {
			return StatusCode::NeedSync;
		}
	}

	StatusCode::Ok
}

fn file_status_code(provider: &dyn StatusProvider, path: &Path) -> StatusCode {
	match provider.folder_for_path(path) {
		Some(folder) => file_code(folder.as_ref(), path),
		None => {
			debug!("Folder offline or not watched: {}", path.display());
			StatusCode::Nop
		}
	}
}

/// `RETRIEVE_FOLDER_STATUS:<path>` — aggregate status of a directory
pub struct RetrieveFolderStatus {
	provider: Arc<dyn StatusProvider>,
}

impl RetrieveFolderStatus {
	pub fn new(provider: Arc<dyn StatusProvider>) -> Self {
		RetrieveFolderStatus { provider }
	}
}

#[async_trait]
impl CommandHandler for RetrieveFolderStatus {
	async fn handle(&self, argument: &str, connection: &ConnectionHandle) {
		if connection.is_closed() {
			return;
		}
		let code = folder_code(self.provider.as_ref(), Path::new(argument));
		respond(connection, code, argument).await;
	}
}

/// `RETRIEVE_FILE_STATUS:<path>` — status of a single file, no recursion
pub struct RetrieveFileStatus {
	provider: Arc<dyn StatusProvider>,
}

impl RetrieveFileStatus {
	pub fn new(provider: Arc<dyn StatusProvider>) -> Self {
		RetrieveFileStatus { provider }
	}
}

#[async_trait]
impl CommandHandler for RetrieveFileStatus {
	async fn handle(&self, argument: &str, connection: &ConnectionHandle) {
		if connection.is_closed() {
			return;
		}
		let code = file_status_code(self.provider.as_ref(), Path::new(argument));
		respond(connection, code, argument).await;
	}
}


// vim: ts=4
