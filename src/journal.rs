//! Per-folder sync journal
//!
//! The sync engine records what it last synced in a hidden JSON file in the
//! folder root. A file counts as in sync when its current size and
//! modification time match its journal entry. The server only reads the
//! journal; the write half ([`FolderJournal::record`] / [`FolderJournal::save`])
//! is for the embedding sync engine and for tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::error::JournalError;

/// Journal file name, relative to the folder root. Hidden, so it stays out
/// of status scans.
pub const JOURNAL_FILE: &str = ".syncstat.journal";

/// Recorded state of one synced file
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct JournalEntry {
	pub size: u64,
	/// Modification time, seconds since the epoch
	pub mtime: i64,
}

/// Sync journal for one managed folder, keyed by relative path
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FolderJournal {
	entries: BTreeMap<String, JournalEntry>,
}

impl FolderJournal {
	/// Create an empty journal
	pub fn new() -> Self {
		FolderJournal { entries: BTreeMap::new() }
	}

	/// Load the journal from a folder root.
	///
	/// A missing journal file yields an empty journal (a fresh folder where
	/// nothing has been synced yet); an unreadable or malformed file is an
	/// error.
	pub fn load(root: &Path) -> Result<Self, JournalError> {
		let path = root.join(JOURNAL_FILE);

		let contents = match fs::read_to_string(&path) {
			Ok(c) => c,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
			Err(e) => return Err(JournalError::LoadFailed { source: e }),
		};

		serde_json::from_str(&contents).map_err(|e| JournalError::Corrupted {
			message: format!("Failed to parse journal JSON: {}", e),
		})
	}

	/// Save the journal into a folder root
	pub fn save(&self, root: &Path) -> Result<(), JournalError> {
		let json = serde_json::to_string(self)
			.map_err(|e| JournalError::Corrupted { message: e.to_string() })?;

		fs::write(root.join(JOURNAL_FILE), json)
			.map_err(|e| JournalError::SaveFailed { source: e })
	}

	/// Look up the entry for a relative path
	pub fn entry(&self, relative: &Path) -> Option<&JournalEntry> {
		self.entries.get(&*relative.to_string_lossy())
	}

	/// Record an entry for a relative path
	pub fn record(&mut self, relative: &Path, entry: JournalEntry) {
		self.entries.insert(relative.to_string_lossy().into_owned(), entry);
	}

	/// Record a file's current on-disk state as its synced state
	pub fn record_file(&mut self, root: &Path, relative: &Path) -> Result<(), JournalError> {
		let meta = fs::symlink_metadata(root.join(relative))
			.map_err(|e| JournalError::LoadFailed { source: e })?;
		self.record(relative, JournalEntry { size: meta.len(), mtime: mtime_secs(&meta) });
		Ok(())
	}

	/// Forget an entry (the file was removed from sync)
	pub fn remove(&mut self, relative: &Path) {
		self.entries.remove(&*relative.to_string_lossy());
	}

	/// Does the current metadata of a file match its journal entry?
	pub fn matches(&self, relative: &Path, meta: &fs::Metadata) -> bool {
		match self.entry(relative) {
			Some(entry) => entry.size == meta.len() && entry.mtime == mtime_secs(meta),
			None => false,
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Modification time as whole seconds since the epoch. Files with no
/// readable mtime (or one before 1970) report 0 and so never match a real
/// journal entry.
pub fn mtime_secs(meta: &fs::Metadata) -> i64 {
	meta.modified()
		.ok()
		.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
		.map(|d| d.as_secs() as i64)
		.unwrap_or(0)
}


// vim: ts=4
