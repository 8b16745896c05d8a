use crate::node::{LayerRecord, LayerStatus};

/// A finalized layer. Only the status may change after the first write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layer {
	pub number: u64,
	pub status: LayerStatus,
}

impl Layer {
	pub fn from_wire(record: &LayerRecord) -> Self {
		Self {
			number: record.number.number,
			status: record.status,
		}
	}
}
