//!
//! Persistence store for the mesh collector.
//!
//! Every collection sits behind a unique index so that repeated writes from the live pump and
//! the gap reconciler converge on one row per logical entity. Calls run on the blocking pool
//! under a bounded deadline.

mod account;
mod activation;
pub mod decode;
mod error;
mod layer;
mod malfeasance;
mod network_info;
mod smesher;
mod transaction;

pub use error::StorageError;
pub use smesher::SmesherBatch;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Default deadline applied to every storage call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
	CREATE TABLE IF NOT EXISTS layers (
		number INTEGER NOT NULL,
		status INTEGER NOT NULL
	);
	CREATE UNIQUE INDEX IF NOT EXISTS layers_number ON layers(number);

	CREATE TABLE IF NOT EXISTS transactions (
		id TEXT NOT NULL,
		layer INTEGER NOT NULL,
		block TEXT NOT NULL,
		idx INTEGER NOT NULL,
		result INTEGER NOT NULL,
		gas_provided INTEGER NOT NULL,
		gas_price INTEGER NOT NULL,
		gas_used INTEGER NOT NULL,
		fee INTEGER NOT NULL,
		amount INTEGER NOT NULL,
		counter INTEGER NOT NULL,
		tx_type INTEGER NOT NULL,
		scheme INTEGER NOT NULL,
		signature TEXT NOT NULL,
		public_key TEXT NOT NULL,
		sender TEXT NOT NULL,
		receiver TEXT NOT NULL,
		svm_data TEXT NOT NULL
	);
	CREATE UNIQUE INDEX IF NOT EXISTS transactions_id ON transactions(id);
	CREATE INDEX IF NOT EXISTS transactions_layer ON transactions(layer);
	CREATE INDEX IF NOT EXISTS transactions_sender ON transactions(sender);
	CREATE INDEX IF NOT EXISTS transactions_receiver ON transactions(receiver);

	CREATE TABLE IF NOT EXISTS receipts (
		id TEXT NOT NULL,
		layer INTEGER NOT NULL,
		idx INTEGER NOT NULL,
		result INTEGER NOT NULL,
		gas_used INTEGER NOT NULL,
		fee INTEGER NOT NULL,
		svm_data TEXT NOT NULL
	);
	CREATE UNIQUE INDEX IF NOT EXISTS receipts_id ON receipts(id);

	CREATE TABLE IF NOT EXISTS smeshers (
		id TEXT NOT NULL,
		name TEXT NOT NULL,
		lon REAL NOT NULL,
		lat REAL NOT NULL,
		commitment_size INTEGER NOT NULL,
		coinbase TEXT NOT NULL,
		atx_count INTEGER NOT NULL,
		timestamp INTEGER NOT NULL
	);
	CREATE UNIQUE INDEX IF NOT EXISTS smeshers_id ON smeshers(id);

	CREATE TABLE IF NOT EXISTS coinbases (
		smesher_id TEXT NOT NULL,
		coinbase TEXT NOT NULL
	);
	CREATE UNIQUE INDEX IF NOT EXISTS coinbases_smesher_id ON coinbases(smesher_id);
	CREATE INDEX IF NOT EXISTS coinbases_coinbase ON coinbases(coinbase);

	CREATE TABLE IF NOT EXISTS activations (
		id TEXT NOT NULL,
		layer INTEGER NOT NULL,
		smesher_id TEXT NOT NULL,
		coinbase TEXT NOT NULL,
		prev_atx TEXT NOT NULL,
		num_units INTEGER NOT NULL,
		commitment_size INTEGER NOT NULL,
		timestamp INTEGER NOT NULL
	);
	CREATE UNIQUE INDEX IF NOT EXISTS activations_id ON activations(id);
	CREATE INDEX IF NOT EXISTS activations_smesher_id ON activations(smesher_id);

	CREATE TABLE IF NOT EXISTS accounts (
		address TEXT NOT NULL,
		balance INTEGER NOT NULL,
		counter INTEGER NOT NULL
	);
	CREATE UNIQUE INDEX IF NOT EXISTS accounts_address ON accounts(address);

	CREATE TABLE IF NOT EXISTS malfeasance_proofs (
		smesher_id TEXT NOT NULL,
		layer INTEGER NOT NULL,
		kind TEXT NOT NULL,
		debug_info TEXT NOT NULL
	);
	CREATE UNIQUE INDEX IF NOT EXISTS malfeasance_proofs_key
		ON malfeasance_proofs(smesher_id, kind, layer, debug_info);

	CREATE TABLE IF NOT EXISTS network_info (
		singleton INTEGER PRIMARY KEY CHECK (singleton = 1),
		genesis_id TEXT NOT NULL,
		genesis_time INTEGER NOT NULL,
		epoch_num_layers INTEGER NOT NULL,
		max_transactions_per_second INTEGER NOT NULL,
		layer_duration INTEGER NOT NULL,
		post_unit_size INTEGER NOT NULL
	);
";

/// SQLite-backed store shared by the pumps and the reconciler.
pub struct Storage {
	conn: Arc<Mutex<Connection>>,
	timeout: Duration,
}

impl Storage {
	/// Open (or create) an on-disk database and ensure the schema exists.
	pub fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self, StorageError> {
		let conn = Connection::open(path.as_ref()).map_err(|e| StorageError::sqlite("open", e))?;
		conn.execute_batch(
			"PRAGMA journal_mode=WAL;
			 PRAGMA synchronous=NORMAL;",
		)
		.map_err(|e| StorageError::sqlite("open", e))?;

		let storage = Self {
			conn: Arc::new(Mutex::new(conn)),
			timeout,
		};
		storage.init_schema()?;
		info!("Opened storage at {}", path.as_ref().display());
		Ok(storage)
	}

	/// Create an in-memory store for testing.
	pub fn in_memory() -> Result<Self, StorageError> {
		let conn = Connection::open_in_memory().map_err(|e| StorageError::sqlite("open", e))?;
		let storage = Self {
			conn: Arc::new(Mutex::new(conn)),
			timeout: DEFAULT_TIMEOUT,
		};
		storage.init_schema()?;
		Ok(storage)
	}

	fn init_schema(&self) -> Result<(), StorageError> {
		let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
		conn.execute_batch(SCHEMA)
			.map_err(|e| StorageError::sqlite("init_schema", e))
	}

	/// Run `f` against the connection on the blocking pool, bounded by the store deadline.
	///
	/// `op` names the operation in every error produced by the call.
	pub(crate) async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T, StorageError>
	where
		T: Send + 'static,
		F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
	{
		let conn = Arc::clone(&self.conn);
		let task = tokio::task::spawn_blocking(move || {
			let mut conn = conn.lock().map_err(|_| StorageError::Poisoned)?;
			f(&mut conn).map_err(|e| StorageError::sqlite(op, e))
		});

		match tokio::time::timeout(self.timeout, task).await {
			Ok(Ok(result)) => result,
			Ok(Err(e)) => Err(StorageError::Task(e.to_string())),
			Err(_) => {
				debug!("Storage call {} exceeded {:?}", op, self.timeout);
				Err(StorageError::Timeout(op))
			}
		}
	}
}
