//! # syncstat - Sync Status Socket Service
//!
//! syncstat exposes the synchronization status of managed folders to
//! out-of-process shell integrations (file manager overlay extensions) over
//! a local socket, and pushes a coarse `UPDATE_VIEW` notification whenever
//! sync state changes.
//!
//! The wire protocol is newline-delimited UTF-8 text, one command or
//! response per line:
//!
//! ```text
//! client → server   RETRIEVE_FILE_STATUS:/home/user/Sync/doc.txt
//! server → client   STATUS:OK:/home/user/Sync/doc.txt
//! server → client   UPDATE_VIEW
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use syncstat::folders::FolderRegistry;
//! use syncstat::server::SocketServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = FolderRegistry::open(&[PathBuf::from("/home/user/Sync")], Vec::new())?;
//!     let socket = syncstat::socket_path::default_socket_path("syncstat");
//!     let server = SocketServer::bind(&socket, Arc::new(registry))?;
//!     let (_shutdown, rx) = tokio::sync::watch::channel(false);
//!     server.run(rx).await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod folders;
pub mod journal;
pub mod logging;
pub mod server;
pub mod socket_path;
pub mod status;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfigError, JournalError, ServerError};
pub use folders::{FolderRegistry, ManagedFolder};
pub use journal::{FolderJournal, JournalEntry};
pub use server::{CommandRegistry, ConnectionRegistry, StatusCode};
pub use status::{StatusEvent, StatusProvider, SyncFileStatus, SyncFolder};

// vim: ts=4
