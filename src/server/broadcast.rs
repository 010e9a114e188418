//! Sync-state-change broadcaster
//!
//! One subscriber on the provider's event stream. Every event, whatever its
//! payload, becomes a single `UPDATE_VIEW` line to every connected client.
//! The signal is deliberately coarse: clients re-issue status queries after
//! seeing it instead of parsing differential state.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;

use super::connections::ConnectionRegistry;
use crate::logging::*;
use crate::status::StatusEvent;

/// The broadcast notification message
pub const UPDATE_VIEW: &str = "UPDATE_VIEW";

pub struct Broadcaster {
	events: Receiver<StatusEvent>,
	connections: Arc<ConnectionRegistry>,
}

impl Broadcaster {
	pub fn new(events: Receiver<StatusEvent>, connections: Arc<ConnectionRegistry>) -> Self {
		Broadcaster { events, connections }
	}

	/// Run until the event stream closes
	pub async fn run(mut self) {
		loop {
			match self.events.recv().await {
				Ok(event) => {
					debug!("Sync state changed for {}", event.folder.display());
					self.connections.broadcast_line(UPDATE_VIEW).await;
				}
				Err(RecvError::Lagged(skipped)) => {
					// Coalescing lost events into one wakeup is safe: the
					// message carries no state
					warn!("Broadcaster lagged, {} events coalesced", skipped);
					self.connections.broadcast_line(UPDATE_VIEW).await;
				}
				Err(RecvError::Closed) => break,
			}
		}
		debug!("Status event stream closed, broadcaster stopping");
	}
}

// vim: ts=4
