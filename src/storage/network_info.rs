use super::decode::{integer, stored};
use super::{Storage, StorageError};
use crate::model::NetworkInfo;
use rusqlite::params;

impl Storage {
	/// Replace the stored network parameters.
	pub async fn save_network_info(&self, info: &NetworkInfo) -> Result<(), StorageError> {
		let info = info.clone();
		self.call("save_network_info", move |conn| {
			conn.execute(
				"INSERT INTO network_info (
					singleton, genesis_id, genesis_time, epoch_num_layers,
					max_transactions_per_second, layer_duration, post_unit_size
				 ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
				 ON CONFLICT(singleton) DO UPDATE SET
					genesis_id = excluded.genesis_id,
					genesis_time = excluded.genesis_time,
					epoch_num_layers = excluded.epoch_num_layers,
					max_transactions_per_second = excluded.max_transactions_per_second,
					layer_duration = excluded.layer_duration,
					post_unit_size = excluded.post_unit_size",
				params![
					info.genesis_id,
					stored(info.genesis_time),
					stored(info.epoch_num_layers),
					stored(info.max_transactions_per_second),
					stored(info.layer_duration),
					stored(info.post_unit_size),
				],
			)?;
			Ok(())
		})
		.await
	}

	pub async fn get_network_info(&self) -> Result<NetworkInfo, StorageError> {
		self.call("get_network_info", |conn| {
			conn.query_row(
				"SELECT genesis_id, genesis_time, epoch_num_layers, max_transactions_per_second,
					layer_duration, post_unit_size
				 FROM network_info WHERE singleton = 1",
				[],
				|row| {
					Ok(NetworkInfo {
						genesis_id: row.get(0)?,
						genesis_time: integer(row, 1)?,
						epoch_num_layers: integer(row, 2)?,
						max_transactions_per_second: integer(row, 3)?,
						layer_duration: integer(row, 4)?,
						post_unit_size: integer(row, 5)?,
					})
				},
			)
		})
		.await
	}
}
