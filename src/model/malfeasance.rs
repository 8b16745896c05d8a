use super::MapError;
use crate::node::MalfeasanceProofRecord;

/// Evidence that a smesher violated protocol rules. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MalfeasanceProof {
	pub smesher_id: String,
	pub layer: u64,
	pub kind: String,
	pub debug_info: String,
}

impl MalfeasanceProof {
	pub fn from_wire(record: &MalfeasanceProofRecord) -> Result<Self, MapError> {
		if record.smesher_id.id.is_empty() {
			return Err(MapError::MissingField("smesherId"));
		}

		Ok(Self {
			smesher_id: hex::encode(&record.smesher_id.id),
			layer: record.layer.number,
			kind: record.kind.clone(),
			debug_info: record.debug_info.clone(),
		})
	}
}
