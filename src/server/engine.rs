//! Per-connection protocol engine
//!
//! Reads newline-terminated command lines from one client and dispatches
//! them through the command registry. A handler is awaited before the next
//! line is read, so commands from one connection execute strictly in receipt
//! order; connections on other tasks proceed independently.
//!
//! The reader is generic over `AsyncRead` so tests can drive the engine with
//! an in-memory stream.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use super::connections::{ConnectionHandle, ConnectionRegistry};
use super::registry::CommandRegistry;
use crate::logging::*;

/// Split a line into command name and argument at the first `:`.
///
/// A line with no `:` is a command with an empty argument. The name is
/// matched exactly as received; the argument is trimmed of surrounding
/// whitespace.
pub fn split_command(line: &str) -> (&str, &str) {
	match line.find(':') {
		Some(idx) => (&line[..idx], line[idx + 1..].trim()),
		None => (line, ""),
	}
}

/// Drive one connection until EOF or read error, then unregister it.
pub async fn run_connection<R>(
	reader: R,
	connection: ConnectionHandle,
	commands: Arc<CommandRegistry>,
	connections: Arc<ConnectionRegistry>,
) where
	R: AsyncRead + Send + Unpin,
{
	let mut reader = BufReader::new(reader);
	let mut line = String::new();

	loop {
		line.clear();
		match reader.read_line(&mut line).await {
			Ok(0) => break, // EOF: client went away
			Ok(_) => {}
			Err(e) => {
				debug!("Read error on connection {}: {}", connection.id(), e);
				break;
			}
		}

		let trimmed = line.trim_end();
		if trimmed.is_empty() {
			continue;
		}

		let (name, argument) = split_command(trimmed);
		match commands.lookup(name) {
			Some(handler) => handler.handle(argument, &connection).await,
			None => {
				// No error channel in this protocol; log and move on
				debug!(
					"Command not supported by this version of the client: {:?} with argument {:?}",
					name, argument
				);
			}
		}
	}

	debug!("Connection {} disconnected", connection.id());
	connections.remove(connection.id());
}


// vim: ts=4
