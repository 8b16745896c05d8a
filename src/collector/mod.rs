//! Collector core.
//!
//! This module owns the ingestion discipline: the stream pumps that forward live records in
//! receipt order, the gap reconciler that replays layers missed while no stream was running,
//! the startup sequence that records network parameters, and the supervisor that serializes
//! reconciliation before live streaming and reconnects failed pumps with backoff.
//!
//! Pumps report their lifecycle on a bounded notification queue. `PumpMonitor` consumes it to
//! track which pumps are online.

mod monitor;
mod network_info;
mod pump;
mod reconcile;
mod supervisor;

#[cfg(test)]
mod mocks;

pub use monitor::PumpMonitor;
pub use supervisor::Supervisor;

use crate::listener::{Listener, ListenerError};
use crate::node::{NodeClient, NodeError};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// The two record streams the collector subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
	Layers,
	Malfeasance,
}

impl fmt::Display for StreamKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StreamKind::Layers => write!(f, "layers"),
			StreamKind::Malfeasance => write!(f, "malfeasance"),
		}
	}
}

/// Lifecycle event published by a pump. Every `started: true` is followed by exactly one
/// `started: false` for the same run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpNotification {
	pub kind: StreamKind,
	pub started: bool,
}

/// Configuration for ingestion
#[derive(Debug, Clone)]
pub struct IngestConfig {
	/// Lowest layer to ingest. Live layers below it are skipped and replay never goes below it.
	pub sync_from_layer: u64,
	/// Deadline for the startup network-info calls
	pub request_timeout: Duration,
	/// First delay before reconnecting a failed pump
	pub reconnect_initial: Duration,
	/// Upper bound on the reconnect delay
	pub reconnect_max: Duration,
}

impl Default for IngestConfig {
	fn default() -> Self {
		Self {
			sync_from_layer: 0,
			request_timeout: Duration::from_secs(5),
			reconnect_initial: Duration::from_secs(1),
			reconnect_max: Duration::from_secs(60),
		}
	}
}

/// Error types for the collector core
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
	#[error("Startup call {call} failed: {source}")]
	Startup {
		call: &'static str,
		#[source]
		source: NodeError,
	},

	#[error("Startup calls did not complete in time")]
	StartupTimeout,

	#[error("Failed to subscribe to {kind} stream: {source}")]
	Subscribe {
		kind: StreamKind,
		#[source]
		source: NodeError,
	},

	#[error("Error receiving from {kind} stream: {source}")]
	Receive {
		kind: StreamKind,
		#[source]
		source: NodeError,
	},

	#[error("The {0} stream ended")]
	StreamEnded(StreamKind),

	#[error("Failed to read node status: {0}")]
	NodeStatus(#[source] NodeError),

	#[error("Failed to query layer {layer}: {source}")]
	LayersQuery {
		layer: u64,
		#[source]
		source: NodeError,
	},

	#[error("Stored checkpoint {checkpoint} is ahead of node head {head}")]
	StoreAheadOfNode { checkpoint: u64, head: u64 },

	#[error("Listener error: {0}")]
	Listener(#[from] ListenerError),

	#[error("Collector task failed: {0}")]
	Task(String),
}

impl CollectorError {
	/// Errors that reconnecting cannot fix.
	pub fn is_permanent(&self) -> bool {
		matches!(self, CollectorError::StoreAheadOfNode { .. })
	}
}

/// Shared handle to the node, the listener and the notification queue.
pub struct Collector {
	node: Arc<dyn NodeClient>,
	listener: Arc<dyn Listener>,
	notify: mpsc::Sender<PumpNotification>,
	config: IngestConfig,
	layers_forwarded: AtomicU64,
	proofs_forwarded: AtomicU64,
}

impl Collector {
	pub fn new(
		node: Arc<dyn NodeClient>,
		listener: Arc<dyn Listener>,
		notify: mpsc::Sender<PumpNotification>,
		config: IngestConfig,
	) -> Self {
		Self {
			node,
			listener,
			notify,
			config,
			layers_forwarded: AtomicU64::new(0),
			proofs_forwarded: AtomicU64::new(0),
		}
	}

	pub fn config(&self) -> &IngestConfig {
		&self.config
	}

	/// Live records a pump of this kind has handed to the listener since startup.
	pub fn forwarded(&self, kind: StreamKind) -> u64 {
		self.counter(kind).load(Ordering::Relaxed)
	}

	fn record_forwarded(&self, kind: StreamKind) {
		self.counter(kind).fetch_add(1, Ordering::Relaxed);
	}

	fn counter(&self, kind: StreamKind) -> &AtomicU64 {
		match kind {
			StreamKind::Layers => &self.layers_forwarded,
			StreamKind::Malfeasance => &self.proofs_forwarded,
		}
	}
}
