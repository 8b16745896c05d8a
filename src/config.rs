//!
//! Runtime configuration for the mesh collector.
//!
//! Every option is a command-line flag that can also be supplied through an environment
//! variable. `Default` mirrors the flag defaults so tests and embedders can build a config
//! without parsing arguments.

use crate::collector::IngestConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line configuration for the collector
#[derive(Debug, Clone, Parser)]
#[command(name = "mesh-collector", about = "Collects layers and proofs from a node into SQLite")]
pub struct CollectorConfig {
	/// Base URL of the node's JSON API gateway
	#[arg(long, env = "COLLECTOR_NODE_URL", default_value = "http://localhost:9093")]
	pub node_url: String,

	/// SQLite database file
	#[arg(long, env = "COLLECTOR_DB_PATH", default_value = "collector.db")]
	pub db_path: PathBuf,

	/// Ignore layers below this number
	#[arg(long, env = "COLLECTOR_SYNC_FROM_LAYER", default_value_t = 0)]
	pub sync_from_layer: u64,

	/// Capacity of the pump notification queue
	#[arg(long, env = "COLLECTOR_NOTIFICATION_CAPACITY", default_value_t = 16)]
	pub notification_capacity: usize,

	/// Deadline in seconds for one-shot node calls
	#[arg(long, env = "COLLECTOR_REQUEST_TIMEOUT_SECS", default_value_t = 5)]
	pub request_timeout_secs: u64,

	/// Deadline in seconds for each storage call
	#[arg(long, env = "COLLECTOR_STORAGE_TIMEOUT_SECS", default_value_t = 5)]
	pub storage_timeout_secs: u64,

	/// First reconnect delay in seconds
	#[arg(long, env = "COLLECTOR_RECONNECT_INITIAL_SECS", default_value_t = 1)]
	pub reconnect_initial_secs: u64,

	/// Maximum reconnect delay in seconds
	#[arg(long, env = "COLLECTOR_RECONNECT_MAX_SECS", default_value_t = 60)]
	pub reconnect_max_secs: u64,

	/// Log level for this crate
	#[arg(long, env = "COLLECTOR_LOG_LEVEL", default_value = "info")]
	pub log_level: String,
}

impl Default for CollectorConfig {
	fn default() -> Self {
		Self {
			node_url: "http://localhost:9093".to_string(),
			db_path: PathBuf::from("collector.db"),
			sync_from_layer: 0,
			notification_capacity: 16,
			request_timeout_secs: 5,
			storage_timeout_secs: 5,
			reconnect_initial_secs: 1,
			reconnect_max_secs: 60,
			log_level: "info".to_string(),
		}
	}
}

/// Error types for configuration validation
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Node URL must not be empty")]
	EmptyNodeUrl,

	#[error("{0} must be greater than zero")]
	Zero(&'static str),

	#[error("Reconnect initial delay {initial}s exceeds maximum {max}s")]
	ReconnectBounds { initial: u64, max: u64 },
}

impl CollectorConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.node_url.trim().is_empty() {
			return Err(ConfigError::EmptyNodeUrl);
		}

		for (name, value) in [
			("notification_capacity", self.notification_capacity as u64),
			("request_timeout_secs", self.request_timeout_secs),
			("storage_timeout_secs", self.storage_timeout_secs),
			("reconnect_initial_secs", self.reconnect_initial_secs),
			("reconnect_max_secs", self.reconnect_max_secs),
		] {
			if value == 0 {
				return Err(ConfigError::Zero(name));
			}
		}

		if self.reconnect_initial_secs > self.reconnect_max_secs {
			return Err(ConfigError::ReconnectBounds {
				initial: self.reconnect_initial_secs,
				max: self.reconnect_max_secs,
			});
		}

		Ok(())
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn storage_timeout(&self) -> Duration {
		Duration::from_secs(self.storage_timeout_secs)
	}

	pub fn ingest(&self) -> IngestConfig {
		IngestConfig {
			sync_from_layer: self.sync_from_layer,
			request_timeout: self.request_timeout(),
			reconnect_initial: Duration::from_secs(self.reconnect_initial_secs),
			reconnect_max: Duration::from_secs(self.reconnect_max_secs),
		}
	}
}
