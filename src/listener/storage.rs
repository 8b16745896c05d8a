use super::{Listener, ListenerError};
use crate::model::{
	Account, Activation, Layer, MalfeasanceProof, NetworkInfo, Transaction, TransactionReceipt,
};
use crate::node::{AccountRecord, LayerRecord, MalfeasanceProofRecord};
use crate::storage::{SmesherBatch, Storage};
use crate::utils::{bytes_to_hex, format_unix_time};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Listener that persists every event through the store.
///
/// A layer row is written only after all of its transactions, receipts, activations and
/// smesher updates, so the checkpoint derived from stored layers never runs ahead of content.
pub struct StorageListener {
	storage: Arc<Storage>,
	network: RwLock<Option<NetworkInfo>>,
}

impl StorageListener {
	pub fn new(storage: Arc<Storage>) -> Self {
		Self {
			storage,
			network: RwLock::new(None),
		}
	}

	/// Network parameters from memory, falling back to the stored row after a restart.
	async fn network_info(&self) -> Result<NetworkInfo, ListenerError> {
		if let Some(info) = self.network.read().await.as_ref() {
			return Ok(info.clone());
		}

		let info = self.storage.get_network_info().await.map_err(|e| {
			if e.is_not_found() {
				ListenerError::NetworkInfoMissing
			} else {
				ListenerError::Storage(e)
			}
		})?;
		*self.network.write().await = Some(info.clone());
		Ok(info)
	}
}

#[async_trait::async_trait]
impl Listener for StorageListener {
	async fn on_network_info(&self, info: &NetworkInfo) -> Result<(), ListenerError> {
		self.storage.save_network_info(info).await?;
		*self.network.write().await = Some(info.clone());
		info!(
			"Network genesis {} at {}, {} layers per epoch, {}s layers",
			info.genesis_id,
			format_unix_time(info.genesis_time),
			info.epoch_num_layers,
			info.layer_duration
		);
		Ok(())
	}

	async fn on_account(&self, account: &AccountRecord) -> Result<(), ListenerError> {
		let account = Account::from_wire(account)?;
		self.storage.save_account(&account).await?;
		Ok(())
	}

	async fn on_layer(&self, record: &LayerRecord) -> Result<(), ListenerError> {
		let layer = Layer::from_wire(record);
		let network = self.network_info().await?;
		let timestamp = u32::try_from(network.layer_timestamp(layer.number)).unwrap_or(u32::MAX);

		let mut tx_count = 0;
		for block in &record.blocks {
			let receipts: Vec<TransactionReceipt> =
				block.receipts.iter().map(TransactionReceipt::from_wire).collect();

			for (index, wire) in block.transactions.iter().enumerate() {
				let index = u32::try_from(index).unwrap_or(u32::MAX);
				let mut tx = Transaction::from_wire(wire, layer.number, &block.id, index)?;
				if let Some(receipt) = receipts.iter().find(|r| r.id == tx.id) {
					tx.apply_receipt(receipt);
				}
				if self.storage.save_transaction(&tx).await? {
					tx_count += 1;
				}
			}

			for receipt in &receipts {
				self.storage.save_transaction_receipt(receipt).await?;
			}
		}

		let mut batch = SmesherBatch::new();
		for wire in &record.activations {
			let activation = Activation::from_wire(wire, network.post_unit_size, timestamp)?;
			self.storage.save_activation(&activation).await?;
			batch.update(
				&activation.smesher_id,
				&activation.coinbase,
				activation.commitment_size,
				activation.timestamp,
			);
		}
		let smesher_updates = self.storage.flush_smesher_batch(batch).await?;

		match self.storage.save_layer(&layer).await {
			Ok(()) => {
				debug!(
					"Applied layer {} {} in epoch {} ({:?}): {} new transactions, {} smesher updates",
					layer.number,
					bytes_to_hex(&record.hash),
					network.epoch_of(layer.number),
					layer.status,
					tx_count,
					smesher_updates
				);
			}
			Err(e) if e.is_duplicate() => {
				if self
					.storage
					.update_layer_status(layer.number, layer.status)
					.await?
				{
					debug!("Layer {} refined to {:?}", layer.number, layer.status);
				}
			}
			Err(e) => return Err(e.into()),
		}

		Ok(())
	}

	async fn on_malfeasance_proof(
		&self,
		proof: &MalfeasanceProofRecord,
	) -> Result<(), ListenerError> {
		let proof = MalfeasanceProof::from_wire(proof)?;
		if self.storage.save_malfeasance_proof(&proof).await? {
			info!(
				"Recorded {} proof against smesher {} at layer {}",
				proof.kind, proof.smesher_id, proof.layer
			);
		} else {
			debug!("Proof against smesher {} already recorded", proof.smesher_id);
		}
		Ok(())
	}

	async fn last_layer(&self) -> Result<u64, ListenerError> {
		Ok(self.storage.last_layer().await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::node::LayerStatus;
	use serde_json::json;

	fn network() -> NetworkInfo {
		NetworkInfo {
			genesis_id: "00".to_string(),
			genesis_time: 1_000,
			epoch_num_layers: 4,
			max_transactions_per_second: 10,
			layer_duration: 10,
			post_unit_size: 64,
		}
	}

	fn layer_record(status: &str) -> LayerRecord {
		serde_json::from_value(json!({
			"number": { "number": "12" },
			"status": status,
			"blocks": [{
				"id": "AQI=",
				"transactions": [{
					"id": { "id": "CQ==" },
					"sender": { "address": "0x11" },
					"amount": { "value": "5" },
					"coinTransfer": { "receiver": { "address": "0xAA" } }
				}],
				"receipts": [{
					"id": { "id": "CQ==" },
					"result": 1,
					"gasUsed": "21",
					"fee": { "value": "3" },
					"layerNumber": "12"
				}]
			}],
			"activations": [{
				"id": { "id": "qrs=" },
				"layer": { "number": "12" },
				"smesherId": { "id": "AQ==" },
				"coinbase": { "address": "0xCB" },
				"numUnits": 2
			}]
		}))
		.unwrap()
	}

	async fn listener() -> (Arc<Storage>, StorageListener) {
		let storage = Arc::new(Storage::in_memory().unwrap());
		let listener = StorageListener::new(Arc::clone(&storage));
		listener.on_network_info(&network()).await.unwrap();
		(storage, listener)
	}

	#[tokio::test]
	async fn layer_content_lands_before_checkpoint_advances() {
		let (storage, listener) = listener().await;

		listener
			.on_layer(&layer_record("LAYER_STATUS_APPROVED"))
			.await
			.unwrap();

		let tx = storage.get_transaction("09").await.unwrap();
		assert_eq!(tx.block, "0102");
		assert_eq!(tx.receiver, "0xAA");
		assert_eq!((tx.result, tx.gas_used, tx.fee), (1, 21, 3));
		assert_eq!(storage.get_transaction_receipt("09").await.unwrap().layer, 12);

		let smesher = storage.get_smesher("01").await.unwrap();
		assert_eq!(smesher.coinbase, "0xCB");
		assert_eq!(smesher.commitment_size, 128);
		assert_eq!(smesher.atx_count, 1);
		assert_eq!(smesher.timestamp, 1_120);

		assert_eq!(listener.last_layer().await.unwrap(), 12);
	}

	#[tokio::test]
	async fn replayed_layer_is_idempotent_and_refines_status() {
		let (storage, listener) = listener().await;

		listener
			.on_layer(&layer_record("LAYER_STATUS_APPROVED"))
			.await
			.unwrap();
		listener
			.on_layer(&layer_record("LAYER_STATUS_APPLIED"))
			.await
			.unwrap();
		listener
			.on_layer(&layer_record("LAYER_STATUS_CONFIRMED"))
			.await
			.unwrap();

		assert_eq!(
			storage.get_layer(12).await.unwrap().status,
			LayerStatus::Applied
		);
		assert_eq!(storage.get_layers(0, 100).await.unwrap().len(), 1);
		assert_eq!(storage.count_smeshers().await.unwrap(), 1);
		assert_eq!(storage.get_activations_count("01").await.unwrap(), 1);
		assert_eq!(storage.get_smesher("01").await.unwrap().atx_count, 1);
	}

	#[tokio::test]
	async fn malformed_transaction_leaves_checkpoint_behind() {
		let (storage, listener) = listener().await;
		let mut record = layer_record("LAYER_STATUS_APPLIED");
		record.blocks[0].transactions[0].coin_transfer = None;

		let err = listener.on_layer(&record).await.unwrap_err();

		assert!(matches!(err, ListenerError::Mapping(_)));
		assert_eq!(listener.last_layer().await.unwrap(), 0);
		assert!(storage.get_layer(12).await.unwrap_err().is_not_found());
	}

	#[tokio::test]
	async fn layer_requires_network_info() {
		let storage = Arc::new(Storage::in_memory().unwrap());
		let listener = StorageListener::new(Arc::clone(&storage));

		let err = listener
			.on_layer(&layer_record("LAYER_STATUS_APPLIED"))
			.await
			.unwrap_err();
		assert!(matches!(err, ListenerError::NetworkInfoMissing));

		storage.save_network_info(&network()).await.unwrap();
		let restarted = StorageListener::new(storage);
		restarted
			.on_layer(&layer_record("LAYER_STATUS_APPLIED"))
			.await
			.unwrap();
		assert_eq!(restarted.last_layer().await.unwrap(), 12);
	}

	#[tokio::test]
	async fn accounts_and_proofs_are_persisted() {
		let (storage, listener) = listener().await;

		let account: AccountRecord = serde_json::from_value(json!({
			"accountId": { "address": "0xAC" },
			"stateCurrent": { "counter": "2", "balance": { "value": "900" } }
		}))
		.unwrap();
		listener.on_account(&account).await.unwrap();
		assert_eq!(storage.get_account("0xAC").await.unwrap().balance, 900);

		let proof: MalfeasanceProofRecord = serde_json::from_value(json!({
			"smesherId": { "id": "AQ==" },
			"layer": { "number": 30 },
			"kind": "MALFEASANCE_ATX",
			"debugInfo": "double publish"
		}))
		.unwrap();
		listener.on_malfeasance_proof(&proof).await.unwrap();
		listener.on_malfeasance_proof(&proof).await.unwrap();
		assert_eq!(storage.get_malfeasance_proofs("01").await.unwrap().len(), 1);
	}
}
