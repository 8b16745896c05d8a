//! Scripted node and recording listener for collector tests.

use super::PumpNotification;
use crate::listener::{Listener, ListenerError};
use crate::model::NetworkInfo;
use crate::node::{
	AccountId, AccountRecord, LayerNumber, LayerRecord, MalfeasanceProofRecord, NodeClient,
	NodeError, PostConfig, RecordStream, SmesherId,
};
use futures::stream;
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

/// Items one subscription yields, and whether it stays open afterwards.
pub struct Script {
	items: Vec<u64>,
	hold_open: bool,
}

impl Script {
	/// The stream ends after its items.
	pub fn closed(items: &[u64]) -> Self {
		Self {
			items: items.to_vec(),
			hold_open: false,
		}
	}

	/// The stream stays idle after its items.
	pub fn open(items: &[u64]) -> Self {
		Self {
			items: items.to_vec(),
			hold_open: true,
		}
	}

	fn into_stream<T, F>(self, make: F) -> RecordStream<T>
	where
		T: Send + 'static,
		F: Fn(u64) -> T + Send + 'static,
	{
		let items = stream::iter(self.items.into_iter().map(move |n| Ok::<T, NodeError>(make(n))));
		if self.hold_open {
			Box::pin(items.chain(stream::pending()))
		} else {
			Box::pin(items)
		}
	}
}

pub fn layer(number: u64) -> LayerRecord {
	LayerRecord {
		number: LayerNumber { number },
		..Default::default()
	}
}

fn proof(layer: u64) -> MalfeasanceProofRecord {
	MalfeasanceProofRecord {
		smesher_id: SmesherId { id: vec![1] },
		layer: LayerNumber { number: layer },
		kind: "MALFEASANCE_ATX".to_string(),
		..Default::default()
	}
}

/// Node whose synced layer is at least the highest layer it has streamed.
pub struct MockNode {
	head: u64,
	tip: Arc<AtomicU64>,
	layer_scripts: Mutex<VecDeque<Script>>,
	malfeasance_scripts: Mutex<VecDeque<Script>>,
	queries: Mutex<Vec<u64>>,
	fail_query_at: Option<u64>,
	fail_startup: bool,
}

impl MockNode {
	pub fn new(head: u64) -> Self {
		Self {
			head,
			tip: Arc::new(AtomicU64::new(0)),
			layer_scripts: Mutex::new(VecDeque::new()),
			malfeasance_scripts: Mutex::new(VecDeque::new()),
			queries: Mutex::new(Vec::new()),
			fail_query_at: None,
			fail_startup: false,
		}
	}

	/// One script per subscription, in order. Subscribing with no script left fails.
	pub fn with_layer_scripts(mut self, scripts: Vec<Script>) -> Self {
		self.layer_scripts = Mutex::new(scripts.into());
		self
	}

	pub fn with_malfeasance_scripts(mut self, scripts: Vec<Script>) -> Self {
		self.malfeasance_scripts = Mutex::new(scripts.into());
		self
	}

	pub fn failing_query_at(mut self, layer: u64) -> Self {
		self.fail_query_at = Some(layer);
		self
	}

	pub fn failing_startup(mut self) -> Self {
		self.fail_startup = true;
		self
	}

	/// Layers requested through `layers_query`, in call order.
	pub async fn queries(&self) -> Vec<u64> {
		self.queries.lock().await.clone()
	}
}

#[async_trait::async_trait]
impl NodeClient for MockNode {
	async fn genesis_time(&self) -> Result<u64, NodeError> {
		Ok(1_000)
	}

	async fn genesis_id(&self) -> Result<Vec<u8>, NodeError> {
		Ok(vec![0xab, 0xcd])
	}

	async fn epoch_num_layers(&self) -> Result<u64, NodeError> {
		Ok(4)
	}

	async fn max_transactions_per_second(&self) -> Result<u64, NodeError> {
		if self.fail_startup {
			return Err(NodeError::NoData);
		}
		Ok(100)
	}

	async fn layer_duration(&self) -> Result<u64, NodeError> {
		Ok(10)
	}

	async fn accounts(&self) -> Result<Vec<AccountRecord>, NodeError> {
		Ok(["0x01", "0x02"]
			.iter()
			.map(|address| AccountRecord {
				account_id: AccountId {
					address: address.to_string(),
				},
				..Default::default()
			})
			.collect())
	}

	async fn post_config(&self) -> Result<PostConfig, NodeError> {
		Ok(PostConfig {
			bits_per_label: 8,
			labels_per_unit: 16,
		})
	}

	async fn synced_layer(&self) -> Result<u64, NodeError> {
		Ok(self.head.max(self.tip.load(Ordering::SeqCst)))
	}

	async fn layers_query(&self, start: u64, end: u64) -> Result<Vec<LayerRecord>, NodeError> {
		let mut queries = self.queries.lock().await;
		let mut layers = Vec::new();
		for number in start..=end {
			queries.push(number);
			if self.fail_query_at == Some(number) {
				return Err(NodeError::NoData);
			}
			layers.push(layer(number));
		}
		Ok(layers)
	}

	async fn layer_stream(&self) -> Result<RecordStream<LayerRecord>, NodeError> {
		let script = self.layer_scripts.lock().await.pop_front();
		let tip = Arc::clone(&self.tip);
		script
			.map(|script| {
				script.into_stream(move |number| {
					tip.fetch_max(number, Ordering::SeqCst);
					layer(number)
				})
			})
			.ok_or(NodeError::NoData)
	}

	async fn malfeasance_stream(&self) -> Result<RecordStream<MalfeasanceProofRecord>, NodeError> {
		let script = self.malfeasance_scripts.lock().await.pop_front();
		script
			.map(|script| script.into_stream(proof))
			.ok_or(NodeError::NoData)
	}
}

/// Events observed by `MockListener`, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	NetworkInfo(NetworkInfo),
	Account(String),
	Layer(u64),
	Proof(u64),
}

/// Listener that records calls and tracks its checkpoint like a store would.
pub struct MockListener {
	checkpoint: Mutex<u64>,
	events: Mutex<Vec<Event>>,
	fail_at: Option<u64>,
}

impl MockListener {
	pub fn new(checkpoint: u64) -> Self {
		Self {
			checkpoint: Mutex::new(checkpoint),
			events: Mutex::new(Vec::new()),
			fail_at: None,
		}
	}

	/// Reject the given layer.
	pub fn failing_at(mut self, layer: u64) -> Self {
		self.fail_at = Some(layer);
		self
	}

	/// Move the checkpoint as if another writer had applied layers.
	pub async fn set_checkpoint(&self, layer: u64) {
		*self.checkpoint.lock().await = layer;
	}

	pub async fn events(&self) -> Vec<Event> {
		self.events.lock().await.clone()
	}

	/// Layers accepted, in call order.
	pub async fn layers(&self) -> Vec<u64> {
		self.events
			.lock()
			.await
			.iter()
			.filter_map(|event| match event {
				Event::Layer(number) => Some(*number),
				_ => None,
			})
			.collect()
	}

	pub async fn proofs(&self) -> Vec<u64> {
		self.events
			.lock()
			.await
			.iter()
			.filter_map(|event| match event {
				Event::Proof(layer) => Some(*layer),
				_ => None,
			})
			.collect()
	}

	pub async fn wait_for_layers(&self, count: usize) {
		while self.layers().await.len() < count {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	}

	pub async fn wait_for_proofs(&self, count: usize) {
		while self.proofs().await.len() < count {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	}
}

#[async_trait::async_trait]
impl Listener for MockListener {
	async fn on_network_info(&self, info: &NetworkInfo) -> Result<(), ListenerError> {
		self.events
			.lock()
			.await
			.push(Event::NetworkInfo(info.clone()));
		Ok(())
	}

	async fn on_account(&self, account: &AccountRecord) -> Result<(), ListenerError> {
		self.events
			.lock()
			.await
			.push(Event::Account(account.account_id.address.clone()));
		Ok(())
	}

	async fn on_layer(&self, layer: &LayerRecord) -> Result<(), ListenerError> {
		let number = layer.number.number;
		if self.fail_at == Some(number) {
			return Err(ListenerError::NetworkInfoMissing);
		}

		self.events.lock().await.push(Event::Layer(number));
		let mut checkpoint = self.checkpoint.lock().await;
		*checkpoint = (*checkpoint).max(number);
		Ok(())
	}

	async fn on_malfeasance_proof(
		&self,
		proof: &MalfeasanceProofRecord,
	) -> Result<(), ListenerError> {
		self.events
			.lock()
			.await
			.push(Event::Proof(proof.layer.number));
		Ok(())
	}

	async fn last_layer(&self) -> Result<u64, ListenerError> {
		Ok(*self.checkpoint.lock().await)
	}
}

/// Notifications queued so far.
pub fn drain(rx: &mut mpsc::Receiver<PumpNotification>) -> Vec<PumpNotification> {
	let mut notes = Vec::new();
	while let Ok(note) = rx.try_recv() {
		notes.push(note);
	}
	notes
}
