//! Error types for the status server and its support modules

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors raised by the socket server itself
#[derive(Debug)]
pub enum ServerError {
	/// The listening address could not be acquired. Fatal: the server does
	/// not run and there is no retry.
	Bind { path: PathBuf, source: io::Error },

	/// I/O error on an established resource
	Io(io::Error),
}

impl fmt::Display for ServerError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ServerError::Bind { path, source } => {
				write!(f, "Cannot bind local socket {}: {}", path.display(), source)
			}
			ServerError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for ServerError {}

impl From<io::Error> for ServerError {
	fn from(e: io::Error) -> Self {
		ServerError::Io(e)
	}
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	ReadFailed { path: PathBuf, source: io::Error },

	/// Config file could not be parsed
	ParseFailed { path: PathBuf, message: String },

	/// A configured managed folder is unusable
	InvalidFolder { path: PathBuf, message: String },

	/// An exclude pattern did not compile
	InvalidPattern { pattern: String, message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::ReadFailed { path, source } => {
				write!(f, "Cannot read config {}: {}", path.display(), source)
			}
			ConfigError::ParseFailed { path, message } => {
				write!(f, "Cannot parse config {}: {}", path.display(), message)
			}
			ConfigError::InvalidFolder { path, message } => {
				write!(f, "Invalid managed folder {}: {}", path.display(), message)
			}
			ConfigError::InvalidPattern { pattern, message } => {
				write!(f, "Invalid exclude pattern {:?}: {}", pattern, message)
			}
		}
	}
}

impl Error for ConfigError {}

/// Sync journal errors
#[derive(Debug)]
pub enum JournalError {
	/// Journal file could not be read
	LoadFailed { source: io::Error },

	/// Journal file is not valid JSON
	Corrupted { message: String },

	/// Journal file could not be written
	SaveFailed { source: io::Error },
}

impl fmt::Display for JournalError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			JournalError::LoadFailed { source } => write!(f, "Failed to load journal: {}", source),
			JournalError::Corrupted { message } => write!(f, "Journal corrupted: {}", message),
			JournalError::SaveFailed { source } => write!(f, "Failed to save journal: {}", source),
		}
	}
}

impl Error for JournalError {}

// vim: ts=4
