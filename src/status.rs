//! Sync status provider boundary
//!
//! The socket server never talks to the sync engine directly. It is
//! constructed with a [`StatusProvider`], which resolves paths to managed
//! folders and hands out change notifications. Tests substitute a fake
//! provider; the shipped implementation is [`crate::folders::FolderRegistry`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Per-file sync status as reported by the sync engine.
///
/// Only `InSync` maps to `OK` on the wire. `StatError` means the file could
/// not even be stat'd; the protocol has no slot for it, so it is folded into
/// `NEED_SYNC` by the command handlers (and logged, so the distinction is
/// not lost).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyncFileStatus {
	/// Local and synced state match
	InSync,
	/// Out of sync, or sync state unknown
	NeedSync,
	/// The file could not be stat'd
	StatError,
	/// Excluded from sync; never reported as out of sync
	Ignored,
}

/// Change notification emitted whenever a managed folder's sync state
/// changes. The broadcaster ignores the payload; it exists for logging and
/// for future finer-grained consumers.
#[derive(Clone, Debug)]
pub struct StatusEvent {
	/// Root of the folder that changed
	pub folder: PathBuf,
}

/// One managed folder: a filesystem subtree tracked by the sync engine.
///
/// Paths passed to the status queries are relative to [`root`](Self::root).
pub trait SyncFolder: Send + Sync {
	/// Root path of this folder
	fn root(&self) -> &Path;

	/// Status of a single file, no recursion
	fn file_status(&self, relative: &Path) -> SyncFileStatus;

	/// Aggregate status of an entire subtree
	fn recursive_status(&self, relative: &Path) -> SyncFileStatus;
}

/// The sync engine as seen by the socket server.
pub trait StatusProvider: Send + Sync {
	/// Resolve the managed folder owning `path`, if any. `None` is the
	/// normal offline / not-watched case, not an error.
	fn folder_for_path(&self, path: &Path) -> Option<Arc<dyn SyncFolder>>;

	/// Subscribe to sync-state-change notifications
	fn subscribe(&self) -> broadcast::Receiver<StatusEvent>;
}

// vim: ts=4
