//! Local socket command server
//!
//! One [`SocketServer`] per process. It binds the local socket, accepts
//! shell-integration clients, runs a protocol engine per connection and a
//! single broadcaster for sync-state-change pushes.
//!
//! A failed bind is fatal: the server reports `ServerError::Bind` and
//! never runs. Everything after that point is contained — a bad line, a bad
//! path or a dead client only ever affects its own connection.
//!
//! The listener itself is Unix-only, as local-socket daemons in this family
//! are; the protocol engine, registries and command handlers are platform
//! neutral and fully testable off-socket.

pub mod broadcast;
pub mod commands;
pub mod connections;
pub mod engine;
pub mod registry;

pub use broadcast::{Broadcaster, UPDATE_VIEW};
pub use commands::{StatusCode, RETRIEVE_FILE_STATUS, RETRIEVE_FOLDER_STATUS};
pub use connections::{ConnectionHandle, ConnectionRegistry};
pub use registry::{CommandHandler, CommandRegistry};

#[cfg(unix)]
pub use unix::SocketServer;

#[cfg(unix)]
mod unix {
	use std::fs;
	use std::path::{Path, PathBuf};
	use std::sync::Arc;
	use tokio::net::UnixListener;
	use tokio::sync::watch;

	use super::broadcast::Broadcaster;
	use super::connections::ConnectionRegistry;
	use super::engine;
	use super::registry::CommandRegistry;
	use crate::error::ServerError;
	use crate::logging::*;
	use crate::status::StatusProvider;

	/// The local-socket listener plus everything hanging off it
	pub struct SocketServer {
		listener: UnixListener,
		socket_path: PathBuf,
		connections: Arc<ConnectionRegistry>,
		commands: Arc<CommandRegistry>,
		provider: Arc<dyn StatusProvider>,
	}

	impl SocketServer {
		/// Bind the local socket, removing any stale artifact first.
		///
		/// Failure here is fatal to the server; there is no retry.
		pub fn bind(
			socket_path: &Path,
			provider: Arc<dyn StatusProvider>,
		) -> Result<Self, ServerError> {
			let bind_err = |source| ServerError::Bind { path: socket_path.to_path_buf(), source };

			if let Some(parent) = socket_path.parent() {
				fs::create_dir_all(parent).map_err(bind_err)?;
			}

			// A socket file left behind by a crashed predecessor blocks the
			// bind; a live predecessor shows up as the subsequent bind error.
			match fs::remove_file(socket_path) {
				Ok(()) => warn!("Removed stale socket file {}", socket_path.display()),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
				Err(e) => return Err(bind_err(e)),
			}

			let listener = UnixListener::bind(socket_path).map_err(bind_err)?;
			info!("Server started, listening at {}", socket_path.display());

			Ok(SocketServer {
				listener,
				socket_path: socket_path.to_path_buf(),
				connections: Arc::new(ConnectionRegistry::new()),
				commands: Arc::new(CommandRegistry::with_builtin(provider.clone())),
				provider,
			})
		}

		pub fn socket_path(&self) -> &Path {
			&self.socket_path
		}

		pub fn connections(&self) -> Arc<ConnectionRegistry> {
			self.connections.clone()
		}

		/// Accept connections until `shutdown` signals (or its sender is
		/// dropped). Stopping closes only the listening socket; established
		/// connections drain naturally as their clients disconnect.
		pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
			let broadcaster =
				Broadcaster::new(self.provider.subscribe(), self.connections.clone());
			let broadcast_task = tokio::spawn(broadcaster.run());

			loop {
				tokio::select! {
					changed = shutdown.changed() => {
						if changed.is_err() || *shutdown.borrow() {
							info!("Listener shutting down");
							break;
						}
					}
					accepted = self.listener.accept() => {
						match accepted {
							Ok((stream, _addr)) => {
								let (read_half, write_half) = stream.into_split();
								let conn = self.connections.register(write_half);
								debug!("New connection {}", conn.id());
								tokio::spawn(engine::run_connection(
									read_half,
									conn,
									self.commands.clone(),
									self.connections.clone(),
								));
							}
							Err(e) => {
								// Per-connection trouble, not a bind failure:
								// log and keep accepting
								warn!("Accept error on {}: {}", self.socket_path.display(), e);
								tokio::time::sleep(std::time::Duration::from_millis(100)).await;
							}
						}
					}
				}
			}

			broadcast_task.abort();
		}
	}

	impl Drop for SocketServer {
		fn drop(&mut self) {
			match fs::remove_file(&self.socket_path) {
				Ok(()) => debug!("Removed socket file {}", self.socket_path.display()),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
				Err(e) => warn!("Failed to remove socket file {}: {}", self.socket_path.display(), e),
			}
		}
	}
}

// vim: ts=4
