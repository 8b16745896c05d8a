//! Transaction and receipt entities.

use super::MapError;
use crate::node::{CoinTransfer, SmartContract, TransactionReceiptRecord, TransactionRecord};

/// The variant payload of a transaction. A well-formed record carries exactly one.
#[derive(Debug, Clone, Copy)]
pub enum TransactionPayload<'a> {
	CoinTransfer(&'a CoinTransfer),
	SmartContract(&'a SmartContract),
}

impl<'a> TransactionPayload<'a> {
	/// Extract the payload of a wire record, rejecting records with neither or both variants.
	pub fn from_record(record: &'a TransactionRecord) -> Result<Self, MapError> {
		match (&record.coin_transfer, &record.smart_contract) {
			(Some(transfer), None) => Ok(Self::CoinTransfer(transfer)),
			(None, Some(contract)) => Ok(Self::SmartContract(contract)),
			(None, None) => Err(MapError::MissingPayload(hex::encode(&record.id.id))),
			(Some(_), Some(_)) => Err(MapError::AmbiguousPayload(hex::encode(&record.id.id))),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
	pub id: String,
	pub layer: u64,
	pub block: String,
	pub index: u32,
	pub result: i32,
	pub gas_provided: u64,
	pub gas_price: u64,
	pub gas_used: u64,
	pub fee: u64,
	pub amount: u64,
	pub counter: u64,
	pub tx_type: i32,
	pub scheme: i32,
	pub signature: String,
	pub public_key: String,
	pub sender: String,
	pub receiver: String,
	pub svm_data: String,
}

impl Transaction {
	/// Map a transaction observed at position `index` of block `block_id` in `layer`.
	///
	/// Execution outcome fields stay zero until a receipt is applied.
	pub fn from_wire(
		record: &TransactionRecord,
		layer: u64,
		block_id: &[u8],
		index: u32,
	) -> Result<Self, MapError> {
		let payload = TransactionPayload::from_record(record)?;

		let mut tx = Self {
			id: hex::encode(&record.id.id),
			layer,
			block: hex::encode(block_id),
			index,
			gas_provided: record.gas_offered.gas_provided,
			gas_price: record.gas_offered.gas_price,
			amount: record.amount.value,
			counter: record.counter,
			scheme: record.signature.scheme,
			signature: hex::encode(&record.signature.signature),
			public_key: hex::encode(&record.signature.public_key),
			sender: record.sender.address.clone(),
			..Default::default()
		};

		match payload {
			TransactionPayload::CoinTransfer(transfer) => {
				tx.receiver = transfer.receiver.address.clone();
			}
			TransactionPayload::SmartContract(contract) => {
				tx.tx_type = contract.tx_type;
				tx.svm_data = contract.data.clone();
				tx.receiver = contract.account_id.address.clone();
			}
		}

		Ok(tx)
	}

	pub fn apply_receipt(&mut self, receipt: &TransactionReceipt) {
		self.result = receipt.result;
		self.gas_used = receipt.gas_used;
		self.fee = receipt.fee;
	}
}

/// Post-execution outcome, keyed by transaction id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionReceipt {
	pub id: String,
	pub layer: u64,
	pub index: u32,
	pub result: i32,
	pub gas_used: u64,
	pub fee: u64,
	pub svm_data: String,
}

impl TransactionReceipt {
	pub fn from_wire(record: &TransactionReceiptRecord) -> Self {
		Self {
			id: hex::encode(&record.id.id),
			layer: record.layer_number,
			index: record.index,
			result: record.result,
			gas_used: record.gas_used,
			fee: record.fee.value,
			svm_data: record.svm_data.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::node::{AccountId, TransactionId};

	fn record() -> TransactionRecord {
		TransactionRecord {
			id: TransactionId {
				id: vec![0x01, 0x02],
			},
			sender: AccountId {
				address: "0x11".to_string(),
			},
			counter: 4,
			..Default::default()
		}
	}

	#[test]
	fn coin_transfer_sets_receiver_only() {
		let mut wire = record();
		wire.coin_transfer = Some(CoinTransfer {
			receiver: AccountId {
				address: "0xAA".to_string(),
			},
		});

		let tx = Transaction::from_wire(&wire, 12, &[0xbe, 0xef], 3).unwrap();

		assert_eq!(tx.id, "0102");
		assert_eq!(tx.block, "beef");
		assert_eq!(tx.layer, 12);
		assert_eq!(tx.index, 3);
		assert_eq!(tx.sender, "0x11");
		assert_eq!(tx.receiver, "0xAA");
		assert_eq!(tx.tx_type, 0);
		assert!(tx.svm_data.is_empty());
	}

	#[test]
	fn smart_contract_sets_type_payload_and_contract_receiver() {
		let mut wire = record();
		wire.smart_contract = Some(SmartContract {
			tx_type: 2,
			data: "abc".to_string(),
			account_id: AccountId {
				address: "0xC0".to_string(),
			},
		});

		let tx = Transaction::from_wire(&wire, 12, &[], 0).unwrap();

		assert_eq!(tx.tx_type, 2);
		assert_eq!(tx.svm_data, "abc");
		assert_eq!(tx.receiver, "0xC0");
	}

	#[test]
	fn rejects_missing_and_ambiguous_payloads() {
		let wire = record();
		assert!(matches!(
			Transaction::from_wire(&wire, 1, &[], 0),
			Err(MapError::MissingPayload(id)) if id == "0102"
		));

		let mut both = record();
		both.coin_transfer = Some(CoinTransfer::default());
		both.smart_contract = Some(SmartContract::default());
		assert!(matches!(
			Transaction::from_wire(&both, 1, &[], 0),
			Err(MapError::AmbiguousPayload(_))
		));
	}

	#[test]
	fn receipt_fills_execution_outcome() {
		let mut wire = record();
		wire.coin_transfer = Some(CoinTransfer::default());
		let mut tx = Transaction::from_wire(&wire, 1, &[], 0).unwrap();

		let receipt = TransactionReceipt {
			id: tx.id.clone(),
			result: 1,
			gas_used: 21,
			fee: 42,
			..Default::default()
		};
		tx.apply_receipt(&receipt);

		assert_eq!((tx.result, tx.gas_used, tx.fee), (1, 21, 42));
	}
}
