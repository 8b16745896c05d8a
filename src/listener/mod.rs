//!
//! Listener module for the mesh collector.
//!
//! The collector core hands every observed event to a `Listener` and asks it for the last
//! fully applied layer. `StorageListener` maps records into domain entities and writes them
//! through the persistence store.

mod storage;

pub use storage::StorageListener;

use crate::model::{MapError, NetworkInfo};
use crate::node::{AccountRecord, LayerRecord, MalfeasanceProofRecord};
use crate::storage::StorageError;

/// Receiver of collector events.
///
/// `on_layer` is called by both the live pump and the gap reconciler with identical
/// semantics and must tolerate being called again for a layer it has already applied.
#[async_trait::async_trait]
pub trait Listener: Send + Sync {
	async fn on_network_info(&self, info: &NetworkInfo) -> Result<(), ListenerError>;

	async fn on_account(&self, account: &AccountRecord) -> Result<(), ListenerError>;

	async fn on_layer(&self, layer: &LayerRecord) -> Result<(), ListenerError>;

	async fn on_malfeasance_proof(
		&self,
		proof: &MalfeasanceProofRecord,
	) -> Result<(), ListenerError>;

	/// Highest fully applied layer, `0` when nothing has been applied.
	async fn last_layer(&self) -> Result<u64, ListenerError>;
}

/// Error types for listener operations
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("Mapping error: {0}")]
	Mapping(#[from] MapError),

	#[error("Network info has not been recorded")]
	NetworkInfoMissing,
}
