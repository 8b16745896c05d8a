use super::decode::{integer, stored};
use super::{Storage, StorageError};
use crate::model::Layer;
use crate::node::LayerStatus;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};

fn layer_from_row(row: &Row<'_>) -> rusqlite::Result<Layer> {
	let status: i64 = integer(row, 1)?;
	let status = LayerStatus::from_i64(status).ok_or_else(|| {
		rusqlite::Error::FromSqlConversionFailure(
			1,
			Type::Integer,
			Box::new(super::decode::DecodeError::OutOfRange {
				value: status,
				target: "LayerStatus",
			}),
		)
	})?;

	Ok(Layer {
		number: integer(row, 0)?,
		status,
	})
}

impl Storage {
	/// Insert a new layer. A second insert for the same number fails with `Duplicate`.
	pub async fn save_layer(&self, layer: &Layer) -> Result<(), StorageError> {
		let layer = *layer;
		self.call("save_layer", move |conn| {
			conn.execute(
				"INSERT INTO layers (number, status) VALUES (?1, ?2)",
				params![stored(layer.number), layer.status.as_i64()],
			)?;
			Ok(())
		})
		.await
	}

	/// Move the status of an existing layer forward.
	///
	/// Returns `false` when the layer is absent or already at least as final as `status`.
	pub async fn update_layer_status(
		&self,
		number: u64,
		status: LayerStatus,
	) -> Result<bool, StorageError> {
		self.call("update_layer_status", move |conn| {
			let changed = conn.execute(
				"UPDATE layers SET status = ?2 WHERE number = ?1 AND status < ?2",
				params![stored(number), status.as_i64()],
			)?;
			Ok(changed > 0)
		})
		.await
	}

	pub async fn get_layer(&self, number: u64) -> Result<Layer, StorageError> {
		self.call("get_layer", move |conn| {
			conn.query_row(
				"SELECT number, status FROM layers WHERE number = ?1",
				params![stored(number)],
				layer_from_row,
			)
		})
		.await
	}

	/// Layers with numbers in `start..=end`, ascending.
	pub async fn get_layers(&self, start: u64, end: u64) -> Result<Vec<Layer>, StorageError> {
		self.call("get_layers", move |conn| {
			let mut stmt = conn.prepare(
				"SELECT number, status FROM layers WHERE number >= ?1 AND number <= ?2
				 ORDER BY number ASC",
			)?;
			let layers = stmt
				.query_map(params![stored(start), stored(end)], layer_from_row)?
				.collect::<rusqlite::Result<Vec<_>>>()?;
			Ok(layers)
		})
		.await
	}

	/// Highest stored layer number, `0` when nothing is stored.
	pub async fn last_layer(&self) -> Result<u64, StorageError> {
		self.call("last_layer", |conn| {
			let last: Option<u64> = conn
				.query_row(
					"SELECT number FROM layers ORDER BY number DESC LIMIT 1",
					[],
					|row| integer(row, 0),
				)
				.optional()?;
			Ok(last.unwrap_or(0))
		})
		.await
	}
}
