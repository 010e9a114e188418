//! End-to-end protocol tests over a real local socket
//!
//! Each test binds its own server in a temp directory, connects like a
//! shell extension would, and speaks the line protocol directly.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::watch;

use syncstat::folders::FolderRegistry;
use syncstat::server::SocketServer;

// ============================================================================
// Helper Functions
// ============================================================================

fn start_server(provider: Arc<FolderRegistry>, dir: &Path) -> (PathBuf, watch::Sender<bool>) {
	let socket = dir.join("syncstat.sock");
	let server = SocketServer::bind(&socket, provider).unwrap();
	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	tokio::spawn(server.run(shutdown_rx));
	(socket, shutdown_tx)
}

async fn connect(socket: &Path) -> (BufReader<tokio::net::unix::OwnedReadHalf>, tokio::net::unix::OwnedWriteHalf) {
	let stream = UnixStream::connect(socket).await.unwrap();
	let (read_half, write_half) = stream.into_split();
	(BufReader::new(read_half), write_half)
}

async fn read_response(reader: &mut BufReader<tokio::net::unix::OwnedReadHalf>) -> String {
	let mut line = String::new();
	let n = tokio::time::timeout(Duration::from_secs(5), reader.read_line(&mut line))
		.await
		.expect("timed out waiting for a response")
		.unwrap();
	assert!(n > 0, "server closed the connection unexpectedly");
	line.trim_end().to_string()
}

// ============================================================================
// Dispatch Tests
// ============================================================================

#[tokio::test]
async fn test_unmanaged_path_answers_nop() {
	let dir = TempDir::new().unwrap();
	let (socket, _shutdown) = start_server(Arc::new(FolderRegistry::new()), dir.path());

	let (mut reader, mut writer) = connect(&socket).await;
	writer.write_all(b"RETRIEVE_FILE_STATUS:/not/managed/doc.txt\n").await.unwrap();

	assert_eq!(read_response(&mut reader).await, "STATUS:NOP:/not/managed/doc.txt");
}

#[tokio::test]
async fn test_unknown_command_gets_no_response() {
	let dir = TempDir::new().unwrap();
	let (socket, _shutdown) = start_server(Arc::new(FolderRegistry::new()), dir.path());

	let (mut reader, mut writer) = connect(&socket).await;

	// The unknown command is silently dropped; the next known command on
	// the same connection is still served, proving nothing broke
	writer.write_all(b"SHARE_STATUS:/a\nRETRIEVE_FILE_STATUS:/b\n").await.unwrap();

	assert_eq!(read_response(&mut reader).await, "STATUS:NOP:/b");
}

#[tokio::test]
async fn test_commands_answered_in_receipt_order() {
	let dir = TempDir::new().unwrap();
	let (socket, _shutdown) = start_server(Arc::new(FolderRegistry::new()), dir.path());

	let (mut reader, mut writer) = connect(&socket).await;
	writer
		.write_all(
			b"RETRIEVE_FILE_STATUS:/one\nRETRIEVE_FILE_STATUS:/two\nRETRIEVE_FILE_STATUS:/three\n",
		)
		.await
		.unwrap();

	assert_eq!(read_response(&mut reader).await, "STATUS:NOP:/one");
	assert_eq!(read_response(&mut reader).await, "STATUS:NOP:/two");
	assert_eq!(read_response(&mut reader).await, "STATUS:NOP:/three");
}

#[tokio::test]
async fn test_partial_line_dispatches_once_on_newline() {
	let dir = TempDir::new().unwrap();
	let (socket, _shutdown) = start_server(Arc::new(FolderRegistry::new()), dir.path());

	let (mut reader, mut writer) = connect(&socket).await;

	// The command arrives split across two deliveries
	writer.write_all(b"RETRIEVE_FILE_ST").await.unwrap();
	writer.flush().await.unwrap();
	tokio::time::sleep(Duration::from_millis(50)).await;
	writer.write_all(b"ATUS:/split/path\n").await.unwrap();

	assert_eq!(read_response(&mut reader).await, "STATUS:NOP:/split/path");

	// Exactly one dispatch: the next command's answer comes next
	writer.write_all(b"RETRIEVE_FILE_STATUS:/after\n").await.unwrap();
	assert_eq!(read_response(&mut reader).await, "STATUS:NOP:/after");
}

#[tokio::test]
async fn test_whitespace_around_argument_is_trimmed() {
	let dir = TempDir::new().unwrap();
	let (socket, _shutdown) = start_server(Arc::new(FolderRegistry::new()), dir.path());

	let (mut reader, mut writer) = connect(&socket).await;
	writer.write_all(b"RETRIEVE_FILE_STATUS:  /padded/path  \r\n").await.unwrap();

	assert_eq!(read_response(&mut reader).await, "STATUS:NOP:/padded/path");
}

// ============================================================================
// Broadcast Tests
// ============================================================================

#[tokio::test]
async fn test_change_event_reaches_every_client() {
	let dir = TempDir::new().unwrap();
	let provider = Arc::new(FolderRegistry::new());
	let (socket, _shutdown) = start_server(provider.clone(), dir.path());

	let (mut reader_a, mut writer_a) = connect(&socket).await;
	let (mut reader_b, mut writer_b) = connect(&socket).await;

	// Round-trip a query on each connection so both are registered before
	// the event fires
	writer_a.write_all(b"RETRIEVE_FILE_STATUS:/a\n").await.unwrap();
	assert_eq!(read_response(&mut reader_a).await, "STATUS:NOP:/a");
	writer_b.write_all(b"RETRIEVE_FILE_STATUS:/b\n").await.unwrap();
	assert_eq!(read_response(&mut reader_b).await, "STATUS:NOP:/b");

	provider.emit_change(Path::new("/some/folder"));

	assert_eq!(read_response(&mut reader_a).await, "UPDATE_VIEW");
	assert_eq!(read_response(&mut reader_b).await, "UPDATE_VIEW");

	// Exactly one UPDATE_VIEW each: the next line is the next answer
	writer_a.write_all(b"RETRIEVE_FILE_STATUS:/again\n").await.unwrap();
	assert_eq!(read_response(&mut reader_a).await, "STATUS:NOP:/again");
}

#[tokio::test]
async fn test_disconnected_client_does_not_poison_broadcast() {
	let dir = TempDir::new().unwrap();
	let provider = Arc::new(FolderRegistry::new());
	let (socket, _shutdown) = start_server(provider.clone(), dir.path());

	let (mut survivor_reader, mut survivor_writer) = connect(&socket).await;
	let (mut doomed_reader, mut doomed_writer) = connect(&socket).await;

	survivor_writer.write_all(b"RETRIEVE_FILE_STATUS:/s\n").await.unwrap();
	assert_eq!(read_response(&mut survivor_reader).await, "STATUS:NOP:/s");
	doomed_writer.write_all(b"RETRIEVE_FILE_STATUS:/d\n").await.unwrap();
	assert_eq!(read_response(&mut doomed_reader).await, "STATUS:NOP:/d");

	// One client vanishes right before the event
	drop(doomed_reader);
	drop(doomed_writer);
	tokio::time::sleep(Duration::from_millis(50)).await;

	provider.emit_change(Path::new("/some/folder"));

	// The survivor still gets its notification and the server keeps working
	assert_eq!(read_response(&mut survivor_reader).await, "UPDATE_VIEW");
	survivor_writer.write_all(b"RETRIEVE_FILE_STATUS:/more\n").await.unwrap();
	assert_eq!(read_response(&mut survivor_reader).await, "STATUS:NOP:/more");
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_stale_socket_file_is_replaced() {
	let dir = TempDir::new().unwrap();
	let socket = dir.path().join("syncstat.sock");
	std::fs::write(&socket, b"").unwrap();

	let server = SocketServer::bind(&socket, Arc::new(FolderRegistry::new())).unwrap();
	assert!(socket.exists());
	drop(server);

	// Dropping the server cleans the socket file up again
	assert!(!socket.exists());
}

#[tokio::test]
async fn test_unbindable_address_is_fatal() {
	let dir = TempDir::new().unwrap();

	// A directory cannot be removed as a stale socket nor bound over
	let result = SocketServer::bind(dir.path(), Arc::new(FolderRegistry::new()));
	assert!(result.is_err());
}

#[tokio::test]
async fn test_shutdown_closes_listener_but_drains_connections() {
	let dir = TempDir::new().unwrap();
	let (socket, shutdown) = start_server(Arc::new(FolderRegistry::new()), dir.path());

	let (mut reader, mut writer) = connect(&socket).await;
	writer.write_all(b"RETRIEVE_FILE_STATUS:/x\n").await.unwrap();
	assert_eq!(read_response(&mut reader).await, "STATUS:NOP:/x");

	shutdown.send(true).unwrap();
	tokio::time::sleep(Duration::from_millis(50)).await;

	// The established connection still answers after the listener stopped
	writer.write_all(b"RETRIEVE_FILE_STATUS:/y\n").await.unwrap();
	assert_eq!(read_response(&mut reader).await, "STATUS:NOP:/y");
}

// vim: ts=4
