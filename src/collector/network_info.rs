use super::{Collector, CollectorError};
use crate::model::NetworkInfo;
use crate::node::{AccountRecord, NodeError};
use tracing::info;

fn startup(call: &'static str) -> impl FnOnce(NodeError) -> CollectorError {
	move |source| CollectorError::Startup { call, source }
}

impl Collector {
	/// Read network parameters and the account snapshot, then hand them to the listener.
	///
	/// All node calls share one deadline. Any failure here is fatal to startup.
	pub async fn fetch_network_info(&self) -> Result<NetworkInfo, CollectorError> {
		let (info, accounts) =
			tokio::time::timeout(self.config.request_timeout, self.read_network_info())
				.await
				.map_err(|_| CollectorError::StartupTimeout)??;

		self.listener.on_network_info(&info).await?;
		for account in &accounts {
			self.listener.on_account(account).await?;
		}

		info!(
			"Recorded network info (genesis {}) and {} accounts",
			info.genesis_id,
			accounts.len()
		);
		Ok(info)
	}

	async fn read_network_info(&self) -> Result<(NetworkInfo, Vec<AccountRecord>), CollectorError> {
		let genesis_time = self
			.node
			.genesis_time()
			.await
			.map_err(startup("genesis_time"))?;
		let genesis_id = self
			.node
			.genesis_id()
			.await
			.map_err(startup("genesis_id"))?;
		let epoch_num_layers = self
			.node
			.epoch_num_layers()
			.await
			.map_err(startup("epoch_num_layers"))?;
		let max_tps = self
			.node
			.max_transactions_per_second()
			.await
			.map_err(startup("max_transactions_per_second"))?;
		let layer_duration = self
			.node
			.layer_duration()
			.await
			.map_err(startup("layer_duration"))?;
		let accounts = self.node.accounts().await.map_err(startup("accounts"))?;
		let post_config = self
			.node
			.post_config()
			.await
			.map_err(startup("post_config"))?;

		let info = NetworkInfo::from_wire(
			&genesis_id,
			genesis_time,
			epoch_num_layers,
			max_tps,
			layer_duration,
			&post_config,
		);
		Ok((info, accounts))
	}
}
