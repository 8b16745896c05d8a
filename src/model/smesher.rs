use super::Activation;

/// Aggregate view of one smesher. Never deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Smesher {
	pub id: String,
	pub name: String,
	pub lon: f64,
	pub lat: f64,
	pub commitment_size: u64,
	pub coinbase: String,
	pub atx_count: u32,
	pub timestamp: u32,
}

impl Smesher {
	/// First sighting of a smesher through one of its activations.
	pub fn from_activation(activation: &Activation) -> Self {
		Self {
			id: activation.smesher_id.clone(),
			commitment_size: activation.commitment_size,
			coinbase: activation.coinbase.clone(),
			timestamp: activation.timestamp,
			..Default::default()
		}
	}
}
