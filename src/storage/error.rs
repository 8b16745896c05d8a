//! Error types for storage operations.

use rusqlite::ffi;

/// Errors returned by the persistence store. Every variant that concerns a specific call
/// carries the operation name.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	/// No row matched a point lookup.
	#[error("{0}: not found")]
	NotFound(&'static str),

	/// A write collided with a unique index.
	#[error("{0}: duplicate key")]
	Duplicate(&'static str),

	#[error("{op}: sqlite error: {source}")]
	Sqlite {
		op: &'static str,
		#[source]
		source: rusqlite::Error,
	},

	#[error("{0}: timed out")]
	Timeout(&'static str),

	#[error("storage connection lock poisoned")]
	Poisoned,

	#[error("storage task failed: {0}")]
	Task(String),
}

impl StorageError {
	/// Classify a driver error raised by `op`.
	pub(crate) fn sqlite(op: &'static str, err: rusqlite::Error) -> Self {
		match &err {
			rusqlite::Error::QueryReturnedNoRows => StorageError::NotFound(op),
			rusqlite::Error::SqliteFailure(failure, _)
				if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
					|| failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
			{
				StorageError::Duplicate(op)
			}
			_ => StorageError::Sqlite { op, source: err },
		}
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, StorageError::NotFound(_))
	}

	pub fn is_duplicate(&self) -> bool {
		matches!(self, StorageError::Duplicate(_))
	}
}
