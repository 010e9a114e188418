//! One-shot query client
//!
//! Connects to a running status server, issues a single command and returns
//! the response line. Used by the `query` CLI subcommand and by the
//! integration tests; a shell extension speaking the protocol does exactly
//! this, plus listening for UPDATE_VIEW pushes.

#[cfg(unix)]
pub use unix::query;

#[cfg(unix)]
mod unix {
	use std::io;
	use std::path::Path;
	use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
	use tokio::net::UnixStream;

	/// Send `command:path` and read the single response line
	pub async fn query(socket_path: &Path, command: &str, path: &str) -> io::Result<String> {
		let stream = UnixStream::connect(socket_path).await?;
		let (read_half, mut write_half) = stream.into_split();

		write_half.write_all(format!("{}:{}\n", command, path).as_bytes()).await?;
		write_half.flush().await?;

		let mut reader = BufReader::new(read_half);
		let mut line = String::new();
		let n = reader.read_line(&mut line).await?;
		if n == 0 {
			return Err(io::Error::new(
				io::ErrorKind::UnexpectedEof,
				"server closed the connection before answering",
			));
		}

		Ok(line.trim_end().to_string())
	}
}

// vim: ts=4
