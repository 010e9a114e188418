//! Managed folder registry — the shipped [`StatusProvider`]
//!
//! [`FolderRegistry`] owns the set of managed folders and resolves a path to
//! the folder owning it (longest root-prefix match). [`ManagedFolder`]
//! answers status queries by comparing on-disk metadata against the folder's
//! sync journal.
//!
//! Recursive scans never follow symlinks and stop at [`MAX_SCAN_DEPTH`], so
//! a symlink cycle in the tree cannot hang a status query. Hidden entries
//! (dot-names) are skipped, which also keeps the journal file itself out of
//! the scans.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::error::ConfigError;
use crate::journal::{mtime_secs, FolderJournal, JOURNAL_FILE};
use crate::logging::*;
use crate::status::{StatusEvent, StatusProvider, SyncFileStatus, SyncFolder};

/// Recursion bound for subtree scans. Anything deeper counts as not in sync
/// rather than risking an unbounded walk.
pub const MAX_SCAN_DEPTH: u32 = 32;

/// Capacity of the change-event channel. Listeners that fall this far
/// behind still get a lagged wakeup, which is all the coarse UPDATE_VIEW
/// signal needs.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// (mtime seconds, size) of the journal file at load time. Size is part of
/// the stamp so a rewrite within the same second still invalidates.
type JournalStamp = Option<(i64, u64)>;

struct JournalCache {
	journal: FolderJournal,
	loaded_stamp: JournalStamp,
}

/// One managed folder root with its sync journal.
///
/// The journal is reloaded whenever its file changes on disk, so status
/// answers stay current while the sync engine rewrites it.
pub struct ManagedFolder {
	root: PathBuf,
	exclude: Vec<glob::Pattern>,
	journal: Mutex<JournalCache>,
}

impl ManagedFolder {
	/// Open a managed folder, loading its journal
	pub fn open(root: PathBuf, exclude: Vec<glob::Pattern>) -> Result<Self, ConfigError> {
		let meta = fs::metadata(&root)
			.map_err(|e| ConfigError::InvalidFolder { path: root.clone(), message: e.to_string() })?;
		if !meta.is_dir() {
			return Err(ConfigError::InvalidFolder {
				path: root,
				message: "not a directory".to_string(),
			});
		}

		let journal = FolderJournal::load(&root)
			.map_err(|e| ConfigError::InvalidFolder { path: root.clone(), message: e.to_string() })?;
		let loaded_stamp = journal_file_stamp(&root);

		Ok(ManagedFolder {
			root,
			exclude,
			journal: Mutex::new(JournalCache { journal, loaded_stamp }),
		})
	}

	fn is_excluded(&self, relative: &Path) -> bool {
		let rel = relative.to_string_lossy();
		self.exclude.iter().any(|p| p.matches(&rel))
	}

	/// Run `f` against the journal, reloading it first if the journal file
	/// changed on disk since the last load.
	fn with_journal<R>(&self, f: impl FnOnce(&FolderJournal) -> R) -> R {
		let mut cache = self.journal.lock().unwrap();

		let on_disk = journal_file_stamp(&self.root);
		if on_disk != cache.loaded_stamp {
			match FolderJournal::load(&self.root) {
				Ok(journal) => {
					debug!("Reloaded journal for {} ({} entries)", self.root.display(), journal.len());
					cache.journal = journal;
					cache.loaded_stamp = on_disk;
				}
				Err(e) => {
					// Keep answering from the last good journal
					warn!("Failed to reload journal for {}: {}", self.root.display(), e);
				}
			}
		}

		f(&cache.journal)
	}

	fn scan_tree(&self, journal: &FolderJournal, dir: &Path, depth: u32) -> SyncFileStatus {
		if depth > MAX_SCAN_DEPTH {
			warn!("Scan depth limit reached at {}", dir.display());
			return SyncFileStatus::NeedSync;
		}

		let entries = match fs::read_dir(dir) {
			Ok(e) => e,
			Err(e) => {
				debug!("Cannot list {} during scan: {}", dir.display(), e);
				return SyncFileStatus::NeedSync;
			}
		};

		for entry in entries {
			let entry = match entry {
				Ok(e) => e,
				Err(_) => return SyncFileStatus::NeedSync,
			};
			if is_hidden(&entry.file_name()) {
				continue;
			}

			let abs = entry.path();
			let rel = match abs.strip_prefix(&self.root) {
				Ok(r) => r.to_path_buf(),
				Err(_) => continue,
			};
			if self.is_excluded(&rel) {
				continue;
			}

			let file_type = match entry.file_type() {
				Ok(t) => t,
				Err(_) => return SyncFileStatus::NeedSync,
			};

			if file_type.is_dir() {
				if self.scan_tree(journal, &abs, depth + 1) != SyncFileStatus::InSync {
					return SyncFileStatus::NeedSync;
				}
			} else {
				// Symlinks are compared by their own metadata, never followed
				let meta = match entry.metadata() {
					Ok(m) => m,
					Err(_) => return SyncFileStatus::NeedSync,
				};
				if !journal.matches(&rel, &meta) {
					return SyncFileStatus::NeedSync;
				}
			}
		}

		SyncFileStatus::InSync
	}
}

impl SyncFolder for ManagedFolder {
	fn root(&self) -> &Path {
		&self.root
	}

	fn file_status(&self, relative: &Path) -> SyncFileStatus {
		if self.is_excluded(relative) {
			return SyncFileStatus::Ignored;
		}

		let abs = self.root.join(relative);
		let meta = match fs::symlink_metadata(&abs) {
			Ok(m) => m,
			Err(e) => {
				debug!("Cannot stat {}: {}", abs.display(), e);
				return SyncFileStatus::StatError;
			}
		};

		// A directory has no file-level content state of its own; its
		// subtree is the recursive query's business.
		if meta.is_dir() {
			return SyncFileStatus::InSync;
		}

		if self.with_journal(|j| j.matches(relative, &meta)) {
			SyncFileStatus::InSync
		} else {
			SyncFileStatus::NeedSync
		}
	}

	fn recursive_status(&self, relative: &Path) -> SyncFileStatus {
		let abs = self.root.join(relative);
		self.with_journal(|j| self.scan_tree(j, &abs, 0))
	}
}

fn journal_file_stamp(root: &Path) -> JournalStamp {
	fs::symlink_metadata(root.join(JOURNAL_FILE)).ok().map(|m| (mtime_secs(&m), m.len()))
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
	name.to_string_lossy().starts_with('.')
}

/// The set of managed folders, plus the change-notification stream.
///
/// The embedding sync engine calls [`emit_change`](Self::emit_change) after
/// updating a folder's journal; the server's broadcaster turns that into an
/// UPDATE_VIEW push to every shell-integration client.
pub struct FolderRegistry {
	folders: Vec<Arc<ManagedFolder>>,
	events: broadcast::Sender<StatusEvent>,
}

impl FolderRegistry {
	pub fn new() -> Self {
		let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
		FolderRegistry { folders: Vec::new(), events }
	}

	/// Open a registry over a list of folder roots
	pub fn open(roots: &[PathBuf], exclude: Vec<glob::Pattern>) -> Result<Self, ConfigError> {
		let mut registry = Self::new();
		for root in roots {
			registry.add_folder(ManagedFolder::open(root.clone(), exclude.clone())?);
		}
		Ok(registry)
	}

	pub fn add_folder(&mut self, folder: ManagedFolder) {
		info!("Managing folder {}", folder.root.display());
		self.folders.push(Arc::new(folder));
	}

	pub fn folders(&self) -> &[Arc<ManagedFolder>] {
		&self.folders
	}

	/// Announce that a folder's sync state changed. A send error only means
	/// no listener is connected yet.
	pub fn emit_change(&self, root: &Path) {
		let _ = self.events.send(StatusEvent { folder: root.to_path_buf() });
	}
}

impl Default for FolderRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl StatusProvider for FolderRegistry {
	fn folder_for_path(&self, path: &Path) -> Option<Arc<dyn SyncFolder>> {
		self.folders
			.iter()
			.filter(|f| path.starts_with(&f.root))
			.max_by_key(|f| f.root.components().count())
			.map(|f| f.clone() as Arc<dyn SyncFolder>)
	}

	fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
		self.events.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::journal::JournalEntry;

	fn managed(dir: &Path) -> ManagedFolder {
		ManagedFolder::open(dir.to_path_buf(), Vec::new()).unwrap()
	}

	#[test]
	fn test_longest_prefix_wins() {
		let outer = tempfile::TempDir::new().unwrap();
		let inner = outer.path().join("nested");
		fs::create_dir(&inner).unwrap();

		let mut registry = FolderRegistry::new();
		registry.add_folder(managed(outer.path()));
		registry.add_folder(managed(&inner));

		let folder = registry.folder_for_path(&inner.join("doc.txt")).unwrap();
		assert_eq!(folder.root(), inner.as_path());

		let folder = registry.folder_for_path(&outer.path().join("doc.txt")).unwrap();
		assert_eq!(folder.root(), outer.path());

		assert!(registry.folder_for_path(Path::new("/somewhere/else")).is_none());
	}

	#[test]
	fn test_file_status_against_journal() {
		let dir = tempfile::TempDir::new().unwrap();
		fs::write(dir.path().join("synced.txt"), b"hello").unwrap();
		fs::write(dir.path().join("drifted.txt"), b"hello").unwrap();

		let mut journal = FolderJournal::new();
		journal.record_file(dir.path(), Path::new("synced.txt")).unwrap();
		journal.record(Path::new("drifted.txt"), JournalEntry { size: 1, mtime: 1 });
		journal.save(dir.path()).unwrap();

		let folder = managed(dir.path());
		assert_eq!(folder.file_status(Path::new("synced.txt")), SyncFileStatus::InSync);
		assert_eq!(folder.file_status(Path::new("drifted.txt")), SyncFileStatus::NeedSync);
		assert_eq!(folder.file_status(Path::new("missing.txt")), SyncFileStatus::StatError);
	}

	#[test]
	fn test_recursive_status_finds_deep_drift() {
		let dir = tempfile::TempDir::new().unwrap();
		fs::create_dir_all(dir.path().join("a/b")).unwrap();
		fs::write(dir.path().join("a/b/deep.txt"), b"data").unwrap();
		fs::write(dir.path().join("top.txt"), b"data").unwrap();

		let mut journal = FolderJournal::new();
		journal.record_file(dir.path(), Path::new("top.txt")).unwrap();
		journal.save(dir.path()).unwrap();

		let folder = managed(dir.path());
		// a/b/deep.txt is unrecorded
		assert_eq!(folder.recursive_status(Path::new("")), SyncFileStatus::NeedSync);

		let mut journal = FolderJournal::load(dir.path()).unwrap();
		journal.record_file(dir.path(), Path::new("a/b/deep.txt")).unwrap();
		journal.save(dir.path()).unwrap();

		// Journal reload picks up the new entry
		assert_eq!(folder.recursive_status(Path::new("")), SyncFileStatus::InSync);
	}

	#[test]
	fn test_excluded_entries_are_ignored() {
		let dir = tempfile::TempDir::new().unwrap();
		fs::write(dir.path().join("scratch.tmp"), b"junk").unwrap();

		let exclude = vec![glob::Pattern::new("*.tmp").unwrap()];
		let folder = ManagedFolder::open(dir.path().to_path_buf(), exclude).unwrap();

		assert_eq!(folder.file_status(Path::new("scratch.tmp")), SyncFileStatus::Ignored);
		// The unrecorded .tmp file does not make the tree dirty
		assert_eq!(folder.recursive_status(Path::new("")), SyncFileStatus::InSync);
	}

	#[test]
	fn test_hidden_entries_skipped_in_scan() {
		let dir = tempfile::TempDir::new().unwrap();
		fs::write(dir.path().join(".hidden"), b"x").unwrap();
		// The journal file itself is hidden too; neither may dirty the tree
		FolderJournal::new().save(dir.path()).unwrap();

		let folder = managed(dir.path());
		assert_eq!(folder.recursive_status(Path::new("")), SyncFileStatus::InSync);
	}
}

// vim: ts=4
