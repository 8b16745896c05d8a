//! Smesher aggregates and the coinbase mapping.
//!
//! `update_smesher` writes the coinbase mapping and the smesher row as separate statements.
//! A failure between them leaves the two transiently inconsistent; the next successful update
//! for the same smesher rewrites both.

use super::decode::{float, integer, stored};
use super::{Storage, StorageError};
use crate::model::Smesher;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::warn;

const SMESHER_COLUMNS: &str =
	"id, name, lon, lat, commitment_size, coinbase, atx_count, timestamp";

fn smesher_from_row(row: &Row<'_>) -> rusqlite::Result<Smesher> {
	Ok(Smesher {
		id: row.get(0)?,
		name: row.get(1)?,
		lon: float(row, 2)?,
		lat: float(row, 3)?,
		commitment_size: integer(row, 4)?,
		coinbase: row.get(5)?,
		atx_count: integer(row, 6)?,
		timestamp: integer(row, 7)?,
	})
}

/// A pending write collected into a `SmesherBatch`.
#[derive(Debug, Clone)]
enum SmesherWrite {
	Save(Smesher),
	Update {
		id: String,
		coinbase: String,
		commitment_size: u64,
		timestamp: u32,
	},
}

/// Smesher writes accumulated for one bulk flush.
///
/// Each queued write has the same per-row effect as the matching single call on `Storage`.
#[derive(Debug, Clone, Default)]
pub struct SmesherBatch {
	writes: Vec<SmesherWrite>,
}

impl SmesherBatch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queue the equivalent of `Storage::save_smesher`.
	pub fn save(&mut self, smesher: Smesher) {
		self.writes.push(SmesherWrite::Save(smesher));
	}

	/// Queue the equivalent of `Storage::update_smesher`.
	pub fn update(&mut self, id: &str, coinbase: &str, commitment_size: u64, timestamp: u32) {
		self.writes.push(SmesherWrite::Update {
			id: id.to_string(),
			coinbase: coinbase.to_string(),
			commitment_size,
			timestamp,
		});
	}

	pub fn len(&self) -> usize {
		self.writes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.writes.is_empty()
	}
}

fn upsert_smesher(conn: &Connection, smesher: &Smesher) -> rusqlite::Result<()> {
	conn.execute(
		"INSERT INTO smeshers (id, name, lon, lat, commitment_size, coinbase, atx_count, timestamp)
		 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
		 ON CONFLICT(id) DO UPDATE SET
			name = excluded.name,
			lon = excluded.lon,
			lat = excluded.lat,
			commitment_size = excluded.commitment_size,
			coinbase = excluded.coinbase,
			atx_count = excluded.atx_count,
			timestamp = excluded.timestamp",
		params![
			smesher.id,
			smesher.name,
			smesher.lon,
			smesher.lat,
			stored(smesher.commitment_size),
			smesher.coinbase,
			smesher.atx_count,
			smesher.timestamp,
		],
	)?;
	Ok(())
}

fn upsert_coinbase(conn: &Connection, smesher_id: &str, coinbase: &str) -> rusqlite::Result<()> {
	conn.execute(
		"INSERT INTO coinbases (smesher_id, coinbase) VALUES (?1, ?2)
		 ON CONFLICT(smesher_id) DO UPDATE SET coinbase = excluded.coinbase",
		params![smesher_id, coinbase],
	)?;
	Ok(())
}

pub(super) fn count_activations(conn: &Connection, smesher_id: &str) -> rusqlite::Result<u64> {
	conn.query_row(
		"SELECT COUNT(*) FROM activations WHERE smesher_id = ?1",
		params![smesher_id],
		|row| integer(row, 0),
	)
}

/// Coinbase mapping first, then the recount, then the smesher row. Each statement commits on
/// its own unless the caller holds a transaction.
fn apply_update(
	conn: &Connection,
	id: &str,
	coinbase: &str,
	commitment_size: u64,
	timestamp: u32,
) -> rusqlite::Result<()> {
	upsert_coinbase(conn, id, coinbase)?;

	let atx_count = match count_activations(conn, id) {
		Ok(count) => Some(u32::try_from(count).unwrap_or(u32::MAX)),
		Err(e) => {
			warn!("Failed to count activations for smesher {}: {}", id, e);
			None
		}
	};

	conn.execute(
		"INSERT INTO smeshers (id, name, lon, lat, commitment_size, coinbase, atx_count, timestamp)
		 VALUES (?1, '', 0.0, 0.0, ?2, ?3, COALESCE(?4, 0), ?5)
		 ON CONFLICT(id) DO UPDATE SET
			commitment_size = excluded.commitment_size,
			coinbase = excluded.coinbase,
			atx_count = COALESCE(?4, smeshers.atx_count),
			timestamp = excluded.timestamp",
		params![id, stored(commitment_size), coinbase, atx_count, timestamp],
	)?;
	Ok(())
}

impl Storage {
	/// Upsert a smesher, overwriting every mutable field.
	pub async fn save_smesher(&self, smesher: &Smesher) -> Result<(), StorageError> {
		let smesher = smesher.clone();
		self.call("save_smesher", move |conn| upsert_smesher(conn, &smesher))
			.await
	}

	/// Record a new coinbase and commitment for a smesher and recount its activations.
	///
	/// A failed recount is logged and the previously stored count is kept.
	pub async fn update_smesher(
		&self,
		id: &str,
		coinbase: &str,
		commitment_size: u64,
		timestamp: u32,
	) -> Result<(), StorageError> {
		let id = id.to_string();
		let coinbase = coinbase.to_string();
		self.call("update_smesher", move |conn| {
			apply_update(conn, &id, &coinbase, commitment_size, timestamp)
		})
		.await
	}

	/// Apply every queued write in one round trip. Returns the number of writes applied.
	pub async fn flush_smesher_batch(&self, batch: SmesherBatch) -> Result<usize, StorageError> {
		if batch.is_empty() {
			return Ok(0);
		}

		self.call("flush_smesher_batch", move |conn| {
			let tx = conn.transaction()?;
			for write in &batch.writes {
				match write {
					SmesherWrite::Save(smesher) => upsert_smesher(&tx, smesher)?,
					SmesherWrite::Update {
						id,
						coinbase,
						commitment_size,
						timestamp,
					} => apply_update(&tx, id, coinbase, *commitment_size, *timestamp)?,
				}
			}
			tx.commit()?;
			Ok(batch.len())
		})
		.await
	}

	pub async fn get_smesher(&self, id: &str) -> Result<Smesher, StorageError> {
		let id = id.to_string();
		self.call("get_smesher", move |conn| {
			conn.query_row(
				&format!("SELECT {} FROM smeshers WHERE id = ?1", SMESHER_COLUMNS),
				params![id],
				smesher_from_row,
			)
		})
		.await
	}

	/// Resolve a coinbase to its smesher through the coinbase mapping.
	pub async fn get_smesher_by_coinbase(&self, coinbase: &str) -> Result<Smesher, StorageError> {
		let coinbase = coinbase.to_string();
		self.call("get_smesher_by_coinbase", move |conn| {
			conn.query_row(
				"SELECT s.id, s.name, s.lon, s.lat, s.commitment_size, s.coinbase, s.atx_count, s.timestamp
				 FROM coinbases c JOIN smeshers s ON s.id = c.smesher_id
				 WHERE c.coinbase = ?1
				 ORDER BY s.timestamp DESC
				 LIMIT 1",
				params![coinbase],
				smesher_from_row,
			)
		})
		.await
	}

	/// The coinbase currently mapped to a smesher.
	pub async fn get_smesher_coinbase(&self, smesher_id: &str) -> Result<String, StorageError> {
		let smesher_id = smesher_id.to_string();
		self.call("get_smesher_coinbase", move |conn| {
			conn.query_row(
				"SELECT coinbase FROM coinbases WHERE smesher_id = ?1",
				params![smesher_id],
				|row| row.get(0),
			)
		})
		.await
	}

	/// A page of smeshers, most recently active first.
	pub async fn get_smeshers(&self, limit: u32, offset: u32) -> Result<Vec<Smesher>, StorageError> {
		self.call("get_smeshers", move |conn| {
			let mut stmt = conn.prepare(&format!(
				"SELECT {} FROM smeshers ORDER BY timestamp DESC, id ASC LIMIT ?1 OFFSET ?2",
				SMESHER_COLUMNS
			))?;
			let smeshers = stmt
				.query_map(params![limit, offset], smesher_from_row)?
				.collect::<rusqlite::Result<Vec<_>>>()?;
			Ok(smeshers)
		})
		.await
	}

	pub async fn count_smeshers(&self) -> Result<u64, StorageError> {
		self.call("count_smeshers", |conn| {
			conn.query_row("SELECT COUNT(*) FROM smeshers", [], |row| integer(row, 0))
		})
		.await
	}

	pub async fn smesher_exists(&self, id: &str) -> Result<bool, StorageError> {
		let id = id.to_string();
		self.call("smesher_exists", move |conn| {
			let found = conn
				.query_row(
					"SELECT 1 FROM smeshers WHERE id = ?1",
					params![id],
					|row| integer::<i64>(row, 0),
				)
				.optional()?;
			Ok(found.is_some())
		})
		.await
	}
}
