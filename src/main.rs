use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::PathBuf;

use syncstat::config::Config;
use syncstat::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	logging::init_tracing();

	let matches = Command::new("syncstat")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Sync status socket service for file manager integration")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.global(true)
				.help("Config file (TOML)"),
		)
		.subcommand(
			Command::new("serve")
				.about("Run the status command server")
				.arg(
					Arg::new("folder")
						.short('f')
						.long("folder")
						.value_name("DIR")
						.action(ArgAction::Append)
						.help("Managed folder root (repeatable, overrides config)"),
				)
				.arg(
					Arg::new("socket")
						.long("socket")
						.value_name("PATH")
						.help("Socket address (overrides config and derivation)"),
				),
		)
		.subcommand(
			Command::new("query")
				.about("Query a running server for the sync status of a path")
				.arg(Arg::new("path").required(true).help("Absolute path to query"))
				.arg(
					Arg::new("folder-status")
						.long("folder")
						.action(ArgAction::SetTrue)
						.help("Query aggregate folder status instead of single-file status"),
				)
				.arg(Arg::new("socket").long("socket").value_name("PATH")),
		)
		.get_matches();

	let config = match matches.get_one::<String>("config") {
		Some(path) => Config::load(PathBuf::from(path).as_path())?,
		None => Config::from_env(),
	};

	if let Some(sub) = matches.subcommand_matches("serve") {
		serve(config, sub).await
	} else if let Some(sub) = matches.subcommand_matches("query") {
		query(config, sub).await
	} else {
		Ok(())
	}
}

#[cfg(unix)]
async fn serve(mut config: Config, matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	use std::sync::Arc;
	use syncstat::folders::FolderRegistry;
	use syncstat::server::SocketServer;
	use tracing::error;

	if let Some(folders) = matches.get_many::<String>("folder") {
		config.folders = folders.map(PathBuf::from).collect();
	}
	if let Some(socket) = matches.get_one::<String>("socket") {
		config.socket_path = Some(PathBuf::from(socket));
	}

	let exclude = config.compiled_excludes()?;
	let registry = FolderRegistry::open(&config.folders, exclude)?;
	let socket_path = config.socket_path();

	let server = match SocketServer::bind(&socket_path, Arc::new(registry)) {
		Ok(server) => server,
		Err(e) => {
			// Fatal: the server does not run without its address
			error!("Cannot start server: {}", e);
			return Err(Box::new(e));
		}
	};

	let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			let _ = shutdown_tx.send(true);
		}
	});

	server.run(shutdown_rx).await;
	Ok(())
}

#[cfg(not(unix))]
async fn serve(_config: Config, _matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	Err("the socket server is only available on Unix platforms".into())
}

#[cfg(unix)]
async fn query(mut config: Config, matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	use syncstat::client;
	use syncstat::server::{RETRIEVE_FILE_STATUS, RETRIEVE_FOLDER_STATUS};

	if let Some(socket) = matches.get_one::<String>("socket") {
		config.socket_path = Some(PathBuf::from(socket));
	}
	let path = matches
		.get_one::<String>("path")
		.ok_or("query: path argument required")?;

	let command = if matches.get_flag("folder-status") {
		RETRIEVE_FOLDER_STATUS
	} else {
		RETRIEVE_FILE_STATUS
	};

	let response = client::query(&config.socket_path(), command, path).await?;
	println!("{}", response);
	Ok(())
}

#[cfg(not(unix))]
async fn query(_config: Config, _matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
	Err("the query client is only available on Unix platforms".into())
}

// vim: ts=4
