use clap::Parser;
use mesh_collector::collector::{Collector, PumpMonitor, Supervisor};
use mesh_collector::config::CollectorConfig;
use mesh_collector::listener::StorageListener;
use mesh_collector::node::HttpNodeClient;
use mesh_collector::storage::Storage;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
	let config = CollectorConfig::parse();

	let mut filter = EnvFilter::from_default_env();
	match format!("mesh_collector={}", config.log_level).parse() {
		Ok(directive) => filter = filter.add_directive(directive),
		Err(e) => eprintln!("Ignoring log level {:?}: {}", config.log_level, e),
	}
	tracing_subscriber::fmt()
		.with_env_filter(filter.add_directive(tracing::Level::INFO.into()))
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	if let Err(e) = config.validate() {
		error!("Invalid configuration: {}", e);
		std::process::exit(1);
	}

	info!("Starting mesh collector against {}", config.node_url);

	let storage = match Storage::open(&config.db_path, config.storage_timeout()) {
		Ok(storage) => Arc::new(storage),
		Err(e) => {
			error!("Failed to open storage: {}", e);
			std::process::exit(1);
		}
	};

	let node = match HttpNodeClient::new(&config.node_url, config.request_timeout()) {
		Ok(node) => Arc::new(node),
		Err(e) => {
			error!("Failed to create node client: {}", e);
			std::process::exit(1);
		}
	};

	let listener = Arc::new(StorageListener::new(storage));

	let (notify_tx, notify_rx) = mpsc::channel(config.notification_capacity);
	let monitor = tokio::spawn(PumpMonitor::new(notify_rx).run());

	let (shutdown_tx, shutdown_rx) = watch::channel(false);
	tokio::spawn(async move {
		if let Err(e) = tokio::signal::ctrl_c().await {
			warn!("Failed to listen for ctrl-c: {}", e);
			return;
		}
		info!("Shutdown requested");
		let _ = shutdown_tx.send(true);
	});

	let collector = Arc::new(Collector::new(node, listener, notify_tx, config.ingest()));
	let result = Supervisor::new(collector, shutdown_rx).run().await;

	match monitor.await {
		Ok(monitor) => info!(
			"Pump monitor closed: {} online, {} stops",
			monitor.online(),
			monitor.stops()
		),
		Err(e) => warn!("Pump monitor task failed: {}", e),
	}

	if let Err(e) = result {
		error!("Collector failed: {}", e);
		std::process::exit(1);
	}
}
