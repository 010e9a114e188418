//! Connection registry
//!
//! Tracks every shell-integration client currently connected to the server.
//! All mutation (add on accept, remove on disconnect) and all traversal
//! (broadcast) go through [`ConnectionRegistry`]; nothing else holds the
//! connection set. The inner lock is only ever held for map access, never
//! across an await, so command dispatch on one connection cannot stall
//! accepts or reads on another.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::logging::*;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Write side of one client connection.
///
/// Cheap to clone; clones share the writer and the closed flag. Once the
/// registry removes the connection, every clone's [`send_line`](Self::send_line)
/// reports `NotConnected` — command handlers racing a disconnect see that
/// and quietly drop their response.
#[derive(Clone)]
pub struct ConnectionHandle {
	id: u64,
	writer: Arc<tokio::sync::Mutex<BoxedWriter>>,
	closed: Arc<AtomicBool>,
}

impl ConnectionHandle {
	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}

	/// Send one protocol line, appending the terminating newline
	pub async fn send_line(&self, message: &str) -> io::Result<()> {
		if self.is_closed() {
			return Err(io::Error::new(io::ErrorKind::NotConnected, "connection closed"));
		}

		let mut writer = self.writer.lock().await;
		writer.write_all(message.as_bytes()).await?;
		writer.write_all(b"\n").await?;
		writer.flush().await
	}

	fn close(&self) {
		self.closed.store(true, Ordering::Release);
	}
}

impl std::fmt::Debug for ConnectionHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConnectionHandle")
			.field("id", &self.id)
			.field("closed", &self.is_closed())
			.finish()
	}
}

/// The set of currently connected clients
pub struct ConnectionRegistry {
	connections: Mutex<HashMap<u64, ConnectionHandle>>,
	next_id: AtomicU64,
}

impl ConnectionRegistry {
	pub fn new() -> Self {
		ConnectionRegistry { connections: Mutex::new(HashMap::new()), next_id: AtomicU64::new(1) }
	}

	/// Register a new connection's write half, returning its handle
	pub fn register(&self, writer: impl AsyncWrite + Send + Unpin + 'static) -> ConnectionHandle {
		let handle = ConnectionHandle {
			id: self.next_id.fetch_add(1, Ordering::Relaxed),
			writer: Arc::new(tokio::sync::Mutex::new(Box::new(writer) as BoxedWriter)),
			closed: Arc::new(AtomicBool::new(false)),
		};
		self.connections.lock().unwrap().insert(handle.id, handle.clone());
		debug!("Connection {} registered", handle.id);
		handle
	}

	/// Remove a connection. Idempotent: disconnect and a failed broadcast
	/// write can race to remove the same connection.
	pub fn remove(&self, id: u64) {
		if let Some(handle) = self.connections.lock().unwrap().remove(&id) {
			handle.close();
			debug!("Connection {} removed", id);
		}
	}

	pub fn len(&self) -> usize {
		self.connections.lock().unwrap().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Snapshot of the current connections, for traversal outside the lock
	pub fn snapshot(&self) -> Vec<ConnectionHandle> {
		self.connections.lock().unwrap().values().cloned().collect()
	}

	/// Send one line to every connection. A connection that fails to take
	/// the write is removed and the iteration continues; returns how many
	/// connections were actually written to.
	pub async fn broadcast_line(&self, message: &str) -> usize {
		let targets = self.snapshot();
		debug!("Broadcasting to {} listeners: {}", targets.len(), message);

		let mut delivered = 0;
		for conn in targets {
			match conn.send_line(message).await {
				Ok(()) => delivered += 1,
				Err(e) => {
					debug!("Dropping connection {} on broadcast failure: {}", conn.id(), e);
					self.remove(conn.id());
				}
			}
		}
		delivered
	}
}

impl Default for ConnectionRegistry {
	fn default() -> Self {
		Self::new()
	}
}


// vim: ts=4
