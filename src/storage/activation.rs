use super::decode::{integer, stored};
use super::smesher::count_activations;
use super::{Storage, StorageError};
use crate::model::Activation;
use rusqlite::params;

impl Storage {
	/// Insert an activation unless one with the same id exists. Returns `true` on insert.
	pub async fn save_activation(&self, activation: &Activation) -> Result<bool, StorageError> {
		let activation = activation.clone();
		self.call("save_activation", move |conn| {
			let inserted = conn.execute(
				"INSERT INTO activations
					(id, layer, smesher_id, coinbase, prev_atx, num_units, commitment_size, timestamp)
				 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
				 ON CONFLICT(id) DO NOTHING",
				params![
					activation.id,
					stored(activation.layer),
					activation.smesher_id,
					activation.coinbase,
					activation.prev_atx,
					activation.num_units,
					stored(activation.commitment_size),
					activation.timestamp,
				],
			)?;
			Ok(inserted > 0)
		})
		.await
	}

	pub async fn get_activation(&self, id: &str) -> Result<Activation, StorageError> {
		let id = id.to_string();
		self.call("get_activation", move |conn| {
			conn.query_row(
				"SELECT id, layer, smesher_id, coinbase, prev_atx, num_units, commitment_size, timestamp
				 FROM activations WHERE id = ?1",
				params![id],
				|row| {
					Ok(Activation {
						id: row.get(0)?,
						layer: integer(row, 1)?,
						smesher_id: row.get(2)?,
						coinbase: row.get(3)?,
						prev_atx: row.get(4)?,
						num_units: integer(row, 5)?,
						commitment_size: integer(row, 6)?,
						timestamp: integer(row, 7)?,
					})
				},
			)
		})
		.await
	}

	/// Number of activations recorded for a smesher.
	pub async fn get_activations_count(&self, smesher_id: &str) -> Result<u64, StorageError> {
		let smesher_id = smesher_id.to_string();
		self.call("get_activations_count", move |conn| {
			count_activations(conn, &smesher_id)
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn activations_are_inserted_once() {
		let storage = Storage::in_memory().unwrap();
		let activation = Activation {
			id: "aa".to_string(),
			layer: 9,
			smesher_id: "s1".to_string(),
			num_units: 4,
			commitment_size: 4096,
			..Default::default()
		};

		assert!(storage.save_activation(&activation).await.unwrap());
		assert!(!storage.save_activation(&activation).await.unwrap());

		assert_eq!(storage.get_activations_count("s1").await.unwrap(), 1);
		assert_eq!(storage.get_activations_count("s2").await.unwrap(), 0);
		assert_eq!(storage.get_activation("aa").await.unwrap(), activation);
	}
}
