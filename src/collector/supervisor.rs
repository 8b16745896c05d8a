//! Pump supervision.
//!
//! Startup order is fixed: network info first, then a full gap reconciliation, then both pumps
//! concurrently. A failed pump is restarted with exponential backoff; the layer pump reconciles
//! again before every reconnect so live streaming never starts ahead of the stored checkpoint.
//! A permanent error from either pump stops the other one and ends the run.

use super::pump::wait_for_shutdown;
use super::{Collector, CollectorError, StreamKind};
use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use backoff::future::retry_notify;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

fn classify(e: CollectorError) -> backoff::Error<CollectorError> {
	if e.is_permanent() {
		backoff::Error::permanent(e)
	} else {
		backoff::Error::transient(e)
	}
}

/// Runs the collector until shutdown is requested or a permanent error occurs.
pub struct Supervisor {
	collector: Arc<Collector>,
	shutdown: watch::Receiver<bool>,
}

impl Supervisor {
	pub fn new(collector: Arc<Collector>, shutdown: watch::Receiver<bool>) -> Self {
		Self {
			collector,
			shutdown,
		}
	}

	fn policy(&self) -> ExponentialBackoff {
		let config = self.collector.config();
		ExponentialBackoffBuilder::new()
			.with_initial_interval(config.reconnect_initial)
			.with_max_interval(config.reconnect_max)
			.with_max_elapsed_time(None)
			.build()
	}

	/// Start the collector and block until it stops.
	///
	/// Network info failures are returned immediately. Reconciliation and pump failures are
	/// retried; only permanent errors end the run early.
	pub async fn run(self) -> Result<(), CollectorError> {
		let mut shutdown = self.shutdown.clone();

		tokio::select! {
			_ = wait_for_shutdown(&mut shutdown) => return Ok(()),
			info = self.collector.fetch_network_info() => { info?; }
		}

		let collector = &self.collector;
		let initial = retry_notify(
			self.policy(),
			|| async move { collector.sync_missing_layers().await.map_err(classify) },
			|e: CollectorError, wait: Duration| {
				warn!("Reconciliation failed, retrying in {:?}: {}", wait, e);
			},
		);
		tokio::select! {
			_ = wait_for_shutdown(&mut shutdown) => return Ok(()),
			applied = initial => {
				let applied = applied?;
				info!("Initial reconciliation applied {} layers", applied);
			}
		}

		let (stop_tx, stop_rx) = watch::channel(false);
		let mut pumps = JoinSet::new();
		for kind in [StreamKind::Layers, StreamKind::Malfeasance] {
			pumps.spawn(supervise_pump(
				Arc::clone(&self.collector),
				kind,
				self.policy(),
				stop_rx.clone(),
			));
		}

		let mut stopping = false;
		let mut failure = None;
		loop {
			tokio::select! {
				_ = wait_for_shutdown(&mut shutdown), if !stopping => {
					stopping = true;
					stop_tx.send_replace(true);
				}
				joined = pumps.join_next() => {
					let Some(joined) = joined else { break };
					let result = joined
						.map_err(|e| CollectorError::Task(e.to_string()))
						.and_then(|result| result);
					if let Err(e) = result {
						error!("Stopping collector: {}", e);
						failure.get_or_insert(e);
						stopping = true;
						stop_tx.send_replace(true);
					}
				}
			}
		}

		match failure {
			Some(e) => Err(e),
			None => {
				info!("Collector stopped");
				Ok(())
			}
		}
	}
}

/// Next reconnect delay. Any live record forwarded since the last failure restarts the
/// schedule from the initial interval.
fn reconnect_delay(policy: &mut ExponentialBackoff, progressed: bool) -> Duration {
	if progressed {
		policy.reset();
	}
	policy.next_backoff().unwrap_or(policy.max_interval)
}

/// Keep one pump running until shutdown or a permanent error, reconnecting with backoff.
async fn supervise_pump(
	collector: Arc<Collector>,
	kind: StreamKind,
	mut policy: ExponentialBackoff,
	shutdown: watch::Receiver<bool>,
) -> Result<(), CollectorError> {
	let mut stop = shutdown.clone();
	let mut reconnect = false;

	loop {
		let forwarded = collector.forwarded(kind);
		let attempt = async {
			if kind == StreamKind::Layers && reconnect {
				collector.sync_missing_layers().await?;
			}
			collector.run_pump(kind, shutdown.clone()).await
		};

		let e = tokio::select! {
			_ = wait_for_shutdown(&mut stop) => return Ok(()),
			result = attempt => match result {
				Ok(()) => return Ok(()),
				Err(e) if e.is_permanent() => return Err(e),
				Err(e) => e,
			},
		};

		let wait = reconnect_delay(&mut policy, collector.forwarded(kind) > forwarded);
		warn!("{} pump failed, reconnecting in {:?}: {}", kind, wait, e);
		tokio::select! {
			_ = wait_for_shutdown(&mut stop) => return Ok(()),
			_ = tokio::time::sleep(wait) => {}
		}
		reconnect = true;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::collector::mocks::{MockListener, MockNode, Script, drain};
	use crate::collector::{IngestConfig, PumpNotification};
	use tokio::sync::mpsc;

	fn config() -> IngestConfig {
		IngestConfig {
			reconnect_initial: Duration::from_millis(5),
			reconnect_max: Duration::from_millis(20),
			..Default::default()
		}
	}

	fn count(notes: &[PumpNotification], kind: StreamKind, started: bool) -> usize {
		notes
			.iter()
			.filter(|n| n.kind == kind && n.started == started)
			.count()
	}

	#[tokio::test]
	async fn reconciles_before_streaming_and_stops_on_shutdown() {
		let node = Arc::new(
			MockNode::new(3)
				.with_layer_scripts(vec![Script::open(&[4, 5])])
				.with_malfeasance_scripts(vec![Script::open(&[2])]),
		);
		let listener = Arc::new(MockListener::new(0));
		let (tx, mut rx) = mpsc::channel(16);
		let collector = Arc::new(Collector::new(node, listener.clone(), tx, config()));
		let (stop, shutdown) = watch::channel(false);

		let run = tokio::spawn(Supervisor::new(collector, shutdown).run());
		listener.wait_for_layers(5).await;
		listener.wait_for_proofs(1).await;
		stop.send(true).unwrap();
		run.await.unwrap().unwrap();

		assert_eq!(listener.layers().await, vec![1, 2, 3, 4, 5]);
		let notes = drain(&mut rx);
		assert_eq!(count(&notes, StreamKind::Layers, true), 1);
		assert_eq!(count(&notes, StreamKind::Layers, false), 1);
		assert_eq!(count(&notes, StreamKind::Malfeasance, true), 1);
		assert_eq!(count(&notes, StreamKind::Malfeasance, false), 1);
	}

	#[tokio::test]
	async fn ended_layer_stream_is_reconciled_and_reconnected() {
		let node = Arc::new(
			MockNode::new(2)
				.with_layer_scripts(vec![Script::closed(&[3]), Script::open(&[6])])
				.with_malfeasance_scripts(vec![Script::open(&[])]),
		);
		let listener = Arc::new(MockListener::new(0));
		let (tx, mut rx) = mpsc::channel(16);
		let collector = Arc::new(Collector::new(node.clone(), listener.clone(), tx, config()));
		let (stop, shutdown) = watch::channel(false);

		let run = tokio::spawn(Supervisor::new(collector, shutdown).run());
		listener.wait_for_layers(6).await;
		stop.send(true).unwrap();
		run.await.unwrap().unwrap();

		assert_eq!(listener.layers().await, vec![1, 2, 3, 4, 5, 6]);
		assert_eq!(node.queries().await, vec![1, 2, 4, 5]);
		let notes = drain(&mut rx);
		assert_eq!(count(&notes, StreamKind::Layers, true), 2);
		assert_eq!(count(&notes, StreamKind::Layers, false), 2);
	}

	#[tokio::test]
	async fn store_ahead_of_node_ends_the_run() {
		let node = Arc::new(MockNode::new(2));
		let listener = Arc::new(MockListener::new(8));
		let (tx, _rx) = mpsc::channel(16);
		let collector = Arc::new(Collector::new(node, listener, tx, config()));
		let (_stop, shutdown) = watch::channel(false);

		let err = Supervisor::new(collector, shutdown).run().await.unwrap_err();

		assert!(matches!(err, CollectorError::StoreAheadOfNode { .. }));
	}

	#[tokio::test]
	async fn permanent_error_on_reconnect_stops_both_pumps() {
		let node = Arc::new(
			MockNode::new(2)
				.with_layer_scripts(vec![Script::closed(&[3])])
				.with_malfeasance_scripts(vec![Script::open(&[])]),
		);
		let listener = Arc::new(MockListener::new(2));
		let (tx, mut rx) = mpsc::channel(256);
		let collector = Arc::new(Collector::new(node, listener.clone(), tx, config()));
		let (_stop, shutdown) = watch::channel(false);

		let run = tokio::spawn(Supervisor::new(collector, shutdown).run());
		listener.wait_for_layers(1).await;
		listener.set_checkpoint(50).await;

		let err = tokio::time::timeout(Duration::from_secs(5), run)
			.await
			.expect("supervisor kept running after a permanent error")
			.unwrap()
			.unwrap_err();

		assert!(matches!(
			err,
			CollectorError::StoreAheadOfNode {
				checkpoint: 50,
				head: 3
			}
		));
		let notes = drain(&mut rx);
		assert_eq!(count(&notes, StreamKind::Malfeasance, true), 1);
		assert_eq!(count(&notes, StreamKind::Malfeasance, false), 1);
	}

	#[test]
	fn progress_resets_reconnect_delay() {
		let mut policy = ExponentialBackoffBuilder::new()
			.with_initial_interval(Duration::from_millis(10))
			.with_multiplier(2.0)
			.with_randomization_factor(0.0)
			.with_max_interval(Duration::from_millis(40))
			.with_max_elapsed_time(None)
			.build();

		let mut delays = Vec::new();
		for progressed in [false, false, false, false, true, false] {
			delays.push(reconnect_delay(&mut policy, progressed).as_millis());
		}

		assert_eq!(delays, vec![10, 20, 40, 40, 10, 20]);
	}

	#[tokio::test]
	async fn startup_failure_is_fatal() {
		let node = Arc::new(MockNode::new(0).failing_startup());
		let listener = Arc::new(MockListener::new(0));
		let (tx, _rx) = mpsc::channel(16);
		let collector = Arc::new(Collector::new(node, listener.clone(), tx, config()));
		let (_stop, shutdown) = watch::channel(false);

		let err = Supervisor::new(collector, shutdown).run().await.unwrap_err();

		assert!(matches!(err, CollectorError::Startup { .. }));
		assert!(listener.layers().await.is_empty());
	}
}
