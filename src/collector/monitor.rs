use super::{PumpNotification, StreamKind};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Tracks which pumps are online from the notification queue.
pub struct PumpMonitor {
	rx: mpsc::Receiver<PumpNotification>,
	online: HashSet<StreamKind>,
	stops: u64,
}

impl PumpMonitor {
	pub fn new(rx: mpsc::Receiver<PumpNotification>) -> Self {
		Self {
			rx,
			online: HashSet::new(),
			stops: 0,
		}
	}

	pub fn apply(&mut self, notification: PumpNotification) {
		let kind = notification.kind;
		if notification.started {
			if !self.online.insert(kind) {
				// The previous run's stop was dropped on a full queue.
				self.stops += 1;
				warn!("{} pump restarted without a stop notification", kind);
			}
			info!("{} pump online ({} online)", kind, self.online.len());
		} else {
			if self.online.remove(&kind) {
				self.stops += 1;
			}
			warn!("{} pump offline ({} online)", kind, self.online.len());
		}
	}

	/// Number of pumps currently online.
	pub fn online(&self) -> usize {
		self.online.len()
	}

	pub fn is_online(&self, kind: StreamKind) -> bool {
		self.online.contains(&kind)
	}

	/// Number of times a pump went offline, including stops inferred from a repeated start.
	pub fn stops(&self) -> u64 {
		self.stops
	}

	/// Consume notifications until every sender is dropped.
	pub async fn run(mut self) -> Self {
		while let Some(notification) = self.rx.recv().await {
			self.apply(notification);
		}
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn note(kind: StreamKind, started: bool) -> PumpNotification {
		PumpNotification { kind, started }
	}

	#[tokio::test]
	async fn counts_online_pumps() {
		let (tx, rx) = mpsc::channel(8);
		for n in [
			note(StreamKind::Layers, true),
			note(StreamKind::Malfeasance, true),
			note(StreamKind::Layers, false),
			note(StreamKind::Layers, true),
			note(StreamKind::Malfeasance, false),
		] {
			tx.send(n).await.unwrap();
		}
		drop(tx);

		let monitor = PumpMonitor::new(rx).run().await;

		assert_eq!(monitor.online(), 1);
		assert!(monitor.is_online(StreamKind::Layers));
		assert!(!monitor.is_online(StreamKind::Malfeasance));
		assert_eq!(monitor.stops(), 2);
	}

	#[test]
	fn restart_without_stop_counts_as_a_stop() {
		let (_tx, rx) = mpsc::channel(1);
		let mut monitor = PumpMonitor::new(rx);

		monitor.apply(note(StreamKind::Layers, true));
		monitor.apply(note(StreamKind::Layers, true));

		assert_eq!(monitor.online(), 1);
		assert_eq!(monitor.stops(), 1);

		monitor.apply(note(StreamKind::Layers, false));
		assert_eq!(monitor.online(), 0);
		assert_eq!(monitor.stops(), 2);
	}
}
