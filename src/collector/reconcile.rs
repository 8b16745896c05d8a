//! Gap reconciliation.
//!
//! Compares the node's synced layer against the listener's checkpoint and replays the missing
//! range one layer at a time, ascending. A failed run leaves the checkpoint at the last fully
//! applied layer, so calling again resumes where it stopped.

use super::{Collector, CollectorError};
use tracing::{debug, info};

impl Collector {
	/// Replay every layer between the listener's checkpoint and the node's head.
	///
	/// # Returns
	/// The number of layer records forwarded to the listener.
	pub async fn sync_missing_layers(&self) -> Result<u64, CollectorError> {
		let head = self
			.node
			.synced_layer()
			.await
			.map_err(CollectorError::NodeStatus)?;
		let checkpoint = self.listener.last_layer().await?;

		if head == checkpoint {
			debug!("Checkpoint {} matches node head", checkpoint);
			return Ok(0);
		}
		if head < checkpoint {
			return Err(CollectorError::StoreAheadOfNode { checkpoint, head });
		}

		let from = (checkpoint + 1).max(self.config.sync_from_layer);
		if from > head {
			debug!("Node head {} is below sync floor {}", head, from);
			return Ok(0);
		}

		info!(
			"Syncing missing layers {}..={} (checkpoint {})",
			from, head, checkpoint
		);
		let applied = self.replay_range(from, head).await?;
		info!("Synced {} missing layers up to {}", applied, head);
		Ok(applied)
	}

	/// Close the window between reconciliation and the first record of a new subscription.
	///
	/// Replays `checkpoint + 1 .. first_live` when the live stream starts beyond the checkpoint.
	pub(crate) async fn join_live_stream(&self, first_live: u64) -> Result<u64, CollectorError> {
		let checkpoint = self.listener.last_layer().await?;
		let from = (checkpoint + 1).max(self.config.sync_from_layer);
		if first_live <= from {
			return Ok(0);
		}

		debug!(
			"Live stream starts at {}, checkpoint is {}",
			first_live, checkpoint
		);
		self.replay_range(from, first_live - 1).await
	}

	/// Query and forward layers `from..=to` in ascending order, one layer per query.
	async fn replay_range(&self, from: u64, to: u64) -> Result<u64, CollectorError> {
		let mut applied = 0;
		for number in from..=to {
			let layers = self
				.node
				.layers_query(number, number)
				.await
				.map_err(|source| CollectorError::LayersQuery {
					layer: number,
					source,
				})?;

			for layer in &layers {
				self.listener.on_layer(layer).await?;
				applied += 1;
			}
		}
		Ok(applied)
	}
}
