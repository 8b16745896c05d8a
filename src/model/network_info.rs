use crate::node::PostConfig;

/// Network parameters read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInfo {
	pub genesis_id: String,
	/// Unix seconds.
	pub genesis_time: u64,
	pub epoch_num_layers: u64,
	pub max_transactions_per_second: u64,
	/// Seconds.
	pub layer_duration: u64,
	/// Bytes per storage unit.
	pub post_unit_size: u64,
}

impl NetworkInfo {
	pub fn from_wire(
		genesis_id: &[u8],
		genesis_time: u64,
		epoch_num_layers: u64,
		max_transactions_per_second: u64,
		layer_duration: u64,
		post_config: &PostConfig,
	) -> Self {
		Self {
			genesis_id: hex::encode(genesis_id),
			genesis_time,
			epoch_num_layers,
			max_transactions_per_second,
			layer_duration,
			post_unit_size: post_config.unit_size(),
		}
	}

	/// Wall-clock start of `layer` in unix seconds.
	pub fn layer_timestamp(&self, layer: u64) -> u64 {
		self.genesis_time
			.saturating_add(layer.saturating_mul(self.layer_duration))
	}

	pub fn epoch_of(&self, layer: u64) -> u64 {
		if self.epoch_num_layers == 0 {
			return 0;
		}
		layer / self.epoch_num_layers
	}
}
