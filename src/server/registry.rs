//! Command registry
//!
//! A fixed table from command name to handler, built once at startup and
//! read-only afterwards. Lookup is a case-sensitive exact match on the name
//! as it appeared on the wire; there is no runtime registration.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::commands::{RetrieveFileStatus, RetrieveFolderStatus, RETRIEVE_FILE_STATUS, RETRIEVE_FOLDER_STATUS};
use super::connections::ConnectionHandle;
use crate::status::StatusProvider;

/// One protocol command. Handlers write any response lines directly to the
/// originating connection; the protocol has no error channel, so a handler
/// never fails outward.
#[async_trait]
pub trait CommandHandler: Send + Sync {
	async fn handle(&self, argument: &str, connection: &ConnectionHandle);
}

/// Immutable name → handler table
pub struct CommandRegistry {
	entries: BTreeMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
	/// Build a registry from an explicit entry list
	pub fn new(entries: Vec<(&'static str, Box<dyn CommandHandler>)>) -> Self {
		CommandRegistry { entries: entries.into_iter().collect() }
	}

	/// The built-in status commands, wired to a provider
	pub fn with_builtin(provider: Arc<dyn StatusProvider>) -> Self {
		Self::new(vec![
			(
				RETRIEVE_FOLDER_STATUS,
				Box::new(RetrieveFolderStatus::new(provider.clone())) as Box<dyn CommandHandler>,
			),
			(
				RETRIEVE_FILE_STATUS,
				Box::new(RetrieveFileStatus::new(provider)) as Box<dyn CommandHandler>,
			),
		])
	}

	pub fn lookup(&self, name: &str) -> Option<&dyn CommandHandler> {
		self.entries.get(name).map(|h| h.as_ref())
	}

	pub fn command_names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.entries.keys().copied()
	}
}


// vim: ts=4
