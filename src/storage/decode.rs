//!
//! Width-aware column decoding.
//!
//! SQLite stores every integer as a signed 64-bit value. Readers declare the width they expect:
//! widening is lossless, narrowing is range-checked, and a non-integer value is an error rather
//! than a silent zero. `u64` columns are stored bit-for-bit in the signed column.

use rusqlite::Row;
use rusqlite::types::{Type, ValueRef};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
	#[error("expected an integer column, found {0}")]
	UnexpectedType(Type),

	#[error("stored value {value} does not fit in {target}")]
	OutOfRange { value: i64, target: &'static str },
}

/// An integer type that can be read from and written to an SQLite integer column.
pub trait IntegerColumn: Sized {
	const NAME: &'static str;

	fn from_stored(value: i64) -> Option<Self>;

	fn to_stored(self) -> i64;
}

impl IntegerColumn for i64 {
	const NAME: &'static str = "i64";

	fn from_stored(value: i64) -> Option<Self> {
		Some(value)
	}

	fn to_stored(self) -> i64 {
		self
	}
}

impl IntegerColumn for u64 {
	const NAME: &'static str = "u64";

	fn from_stored(value: i64) -> Option<Self> {
		Some(value as u64)
	}

	fn to_stored(self) -> i64 {
		self as i64
	}
}

impl IntegerColumn for u32 {
	const NAME: &'static str = "u32";

	fn from_stored(value: i64) -> Option<Self> {
		u32::try_from(value).ok()
	}

	fn to_stored(self) -> i64 {
		i64::from(self)
	}
}

impl IntegerColumn for i32 {
	const NAME: &'static str = "i32";

	fn from_stored(value: i64) -> Option<Self> {
		i32::try_from(value).ok()
	}

	fn to_stored(self) -> i64 {
		i64::from(self)
	}
}

/// Value to bind for an integer column.
pub fn stored<T: IntegerColumn>(value: T) -> i64 {
	value.to_stored()
}

fn conversion_failure(idx: usize, ty: Type, err: DecodeError) -> rusqlite::Error {
	rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

/// Read column `idx` as an integer of width `T`.
pub fn integer<T: IntegerColumn>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
	match row.get_ref(idx)? {
		ValueRef::Integer(value) => T::from_stored(value).ok_or_else(|| {
			conversion_failure(
				idx,
				Type::Integer,
				DecodeError::OutOfRange {
					value,
					target: T::NAME,
				},
			)
		}),
		other => {
			let ty = other.data_type();
			Err(conversion_failure(idx, ty, DecodeError::UnexpectedType(ty)))
		}
	}
}

/// Read column `idx` as a float. Integer values are accepted.
pub fn float(row: &Row<'_>, idx: usize) -> rusqlite::Result<f64> {
	match row.get_ref(idx)? {
		ValueRef::Real(value) => Ok(value),
		ValueRef::Integer(value) => Ok(value as f64),
		other => {
			let ty = other.data_type();
			Err(conversion_failure(idx, ty, DecodeError::UnexpectedType(ty)))
		}
	}
}
