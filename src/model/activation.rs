use super::MapError;
use crate::node::ActivationRecord;

/// An activation transaction published by a smesher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
	pub id: String,
	pub layer: u64,
	pub smesher_id: String,
	pub coinbase: String,
	pub prev_atx: String,
	pub num_units: u32,
	/// Committed storage in bytes.
	pub commitment_size: u64,
	pub timestamp: u32,
}

impl Activation {
	/// `unit_size` is the byte size of one storage unit, `timestamp` the wall-clock time of
	/// the activation's layer.
	pub fn from_wire(
		record: &ActivationRecord,
		unit_size: u64,
		timestamp: u32,
	) -> Result<Self, MapError> {
		if record.smesher_id.id.is_empty() {
			return Err(MapError::MissingField("smesherId"));
		}

		Ok(Self {
			id: hex::encode(&record.id.id),
			layer: record.layer.number,
			smesher_id: hex::encode(&record.smesher_id.id),
			coinbase: record.coinbase.address.clone(),
			prev_atx: hex::encode(&record.prev_atx.id),
			num_units: record.num_units,
			commitment_size: u64::from(record.num_units).saturating_mul(unit_size),
			timestamp,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::node::{AccountId, ActivationId, SmesherId};

	#[test]
	fn commitment_is_units_times_unit_size() {
		let record = ActivationRecord {
			id: ActivationId { id: vec![0xab] },
			smesher_id: SmesherId { id: vec![0x01] },
			coinbase: AccountId {
				address: "0xCB".to_string(),
			},
			num_units: 4,
			..Default::default()
		};

		let activation = Activation::from_wire(&record, 1024, 99).unwrap();

		assert_eq!(activation.id, "ab");
		assert_eq!(activation.smesher_id, "01");
		assert_eq!(activation.commitment_size, 4096);
		assert_eq!(activation.timestamp, 99);
	}

	#[test]
	fn rejects_missing_smesher() {
		let record = ActivationRecord::default();
		assert!(matches!(
			Activation::from_wire(&record, 1, 0),
			Err(MapError::MissingField("smesherId"))
		));
	}
}
