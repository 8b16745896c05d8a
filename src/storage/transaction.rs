use super::decode::{integer, stored};
use super::{Storage, StorageError};
use crate::model::{Transaction, TransactionReceipt};
use rusqlite::params;

impl Storage {
	/// Insert a transaction. Transactions are immutable, so an existing id is left untouched.
	///
	/// Returns `true` if a row was inserted.
	pub async fn save_transaction(&self, tx: &Transaction) -> Result<bool, StorageError> {
		let tx = tx.clone();
		self.call("save_transaction", move |conn| {
			let inserted = conn.execute(
				"INSERT INTO transactions (
					id, layer, block, idx, result, gas_provided, gas_price, gas_used, fee, amount,
					counter, tx_type, scheme, signature, public_key, sender, receiver, svm_data
				 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
				 ON CONFLICT(id) DO NOTHING",
				params![
					tx.id,
					stored(tx.layer),
					tx.block,
					tx.index,
					tx.result,
					stored(tx.gas_provided),
					stored(tx.gas_price),
					stored(tx.gas_used),
					stored(tx.fee),
					stored(tx.amount),
					stored(tx.counter),
					tx.tx_type,
					tx.scheme,
					tx.signature,
					tx.public_key,
					tx.sender,
					tx.receiver,
					tx.svm_data,
				],
			)?;
			Ok(inserted > 0)
		})
		.await
	}

	pub async fn get_transaction(&self, id: &str) -> Result<Transaction, StorageError> {
		let id = id.to_string();
		self.call("get_transaction", move |conn| {
			conn.query_row(
				"SELECT id, layer, block, idx, result, gas_provided, gas_price, gas_used, fee, amount,
					counter, tx_type, scheme, signature, public_key, sender, receiver, svm_data
				 FROM transactions WHERE id = ?1",
				params![id],
				|row| {
					Ok(Transaction {
						id: row.get(0)?,
						layer: integer(row, 1)?,
						block: row.get(2)?,
						index: integer(row, 3)?,
						result: integer(row, 4)?,
						gas_provided: integer(row, 5)?,
						gas_price: integer(row, 6)?,
						gas_used: integer(row, 7)?,
						fee: integer(row, 8)?,
						amount: integer(row, 9)?,
						counter: integer(row, 10)?,
						tx_type: integer(row, 11)?,
						scheme: integer(row, 12)?,
						signature: row.get(13)?,
						public_key: row.get(14)?,
						sender: row.get(15)?,
						receiver: row.get(16)?,
						svm_data: row.get(17)?,
					})
				},
			)
		})
		.await
	}

	/// Upsert a receipt keyed by transaction id.
	pub async fn save_transaction_receipt(
		&self,
		receipt: &TransactionReceipt,
	) -> Result<(), StorageError> {
		let receipt = receipt.clone();
		self.call("save_transaction_receipt", move |conn| {
			conn.execute(
				"INSERT INTO receipts (id, layer, idx, result, gas_used, fee, svm_data)
				 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
				 ON CONFLICT(id) DO UPDATE SET
					layer = excluded.layer,
					idx = excluded.idx,
					result = excluded.result,
					gas_used = excluded.gas_used,
					fee = excluded.fee,
					svm_data = excluded.svm_data",
				params![
					receipt.id,
					stored(receipt.layer),
					receipt.index,
					receipt.result,
					stored(receipt.gas_used),
					stored(receipt.fee),
					receipt.svm_data,
				],
			)?;
			Ok(())
		})
		.await
	}

	pub async fn get_transaction_receipt(
		&self,
		id: &str,
	) -> Result<TransactionReceipt, StorageError> {
		let id = id.to_string();
		self.call("get_transaction_receipt", move |conn| {
			conn.query_row(
				"SELECT id, layer, idx, result, gas_used, fee, svm_data FROM receipts WHERE id = ?1",
				params![id],
				|row| {
					Ok(TransactionReceipt {
						id: row.get(0)?,
						layer: integer(row, 1)?,
						index: integer(row, 2)?,
						result: integer(row, 3)?,
						gas_used: integer(row, 4)?,
						fee: integer(row, 5)?,
						svm_data: row.get(6)?,
					})
				},
			)
		})
		.await
	}
}
