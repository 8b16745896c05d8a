//! Stream pumps.
//!
//! A pump owns one subscription and forwards its records to the listener one at a time, in the
//! order received. It never retries; the supervisor decides whether to reconnect.

use super::{Collector, CollectorError, PumpNotification, StreamKind};
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Publishes `started` on creation and `stopped` when dropped, whatever the exit path.
///
/// Publishing never blocks. A notification that does not fit in the queue is logged and
/// dropped; `PumpMonitor` treats a repeated `started` as the missing stop.
struct PumpGuard {
	kind: StreamKind,
	notify: mpsc::Sender<PumpNotification>,
}

impl PumpGuard {
	fn start(kind: StreamKind, notify: mpsc::Sender<PumpNotification>) -> Self {
		publish(&notify, kind, true);
		Self { kind, notify }
	}
}

impl Drop for PumpGuard {
	fn drop(&mut self) {
		publish(&self.notify, self.kind, false);
	}
}

fn publish(notify: &mpsc::Sender<PumpNotification>, kind: StreamKind, started: bool) {
	if let Err(e) = notify.try_send(PumpNotification { kind, started }) {
		warn!("Dropped {} pump notification (started: {}): {}", kind, started, e);
	}
}

/// Resolves once shutdown is requested. Never resolves if the sender is gone.
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
	if shutdown.wait_for(|stop| *stop).await.is_err() {
		std::future::pending::<()>().await;
	}
}

impl Collector {
	/// Run one pump until its stream fails, ends, or shutdown is requested.
	///
	/// Shutdown returns `Ok(())`. Every other exit is an error for the caller to act on.
	pub async fn run_pump(
		&self,
		kind: StreamKind,
		shutdown: watch::Receiver<bool>,
	) -> Result<(), CollectorError> {
		let _guard = PumpGuard::start(kind, self.notify.clone());
		info!("Starting {} pump", kind);

		let result = match kind {
			StreamKind::Layers => self.layers_pump(shutdown).await,
			StreamKind::Malfeasance => self.malfeasance_pump(shutdown).await,
		};

		match &result {
			Ok(()) => info!("{} pump stopped", kind),
			Err(e) => error!("{} pump stopped: {}", kind, e),
		}
		result
	}

	async fn layers_pump(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), CollectorError> {
		let kind = StreamKind::Layers;
		let mut stream = self
			.node
			.layer_stream()
			.await
			.map_err(|source| CollectorError::Subscribe { kind, source })?;

		let mut joined = false;
		loop {
			let next = tokio::select! {
				biased;
				_ = wait_for_shutdown(&mut shutdown) => return Ok(()),
				next = stream.next() => next,
			};

			let layer = match next {
				Some(Ok(layer)) => layer,
				Some(Err(source)) => return Err(CollectorError::Receive { kind, source }),
				None => return Err(CollectorError::StreamEnded(kind)),
			};

			let number = layer.number.number;
			if number < self.config.sync_from_layer {
				debug!(
					"Skipping layer {} below sync floor {}",
					number, self.config.sync_from_layer
				);
				continue;
			}

			if !joined {
				let replayed = self.join_live_stream(number).await?;
				if replayed > 0 {
					info!("Replayed {} layers before live layer {}", replayed, number);
				}
				joined = true;
			}

			debug!("Received layer {} ({:?})", number, layer.status);
			self.listener.on_layer(&layer).await?;
			self.record_forwarded(kind);
		}
	}

	async fn malfeasance_pump(
		&self,
		mut shutdown: watch::Receiver<bool>,
	) -> Result<(), CollectorError> {
		let kind = StreamKind::Malfeasance;
		let mut stream = self
			.node
			.malfeasance_stream()
			.await
			.map_err(|source| CollectorError::Subscribe { kind, source })?;

		loop {
			let next = tokio::select! {
				biased;
				_ = wait_for_shutdown(&mut shutdown) => return Ok(()),
				next = stream.next() => next,
			};

			let proof = match next {
				Some(Ok(proof)) => proof,
				Some(Err(source)) => return Err(CollectorError::Receive { kind, source }),
				None => return Err(CollectorError::StreamEnded(kind)),
			};

			debug!(
				"Received {} proof at layer {}",
				proof.kind, proof.layer.number
			);
			self.listener.on_malfeasance_proof(&proof).await?;
			self.record_forwarded(kind);
		}
	}
}
