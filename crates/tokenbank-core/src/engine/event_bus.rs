//! Broadcast channel for deposit progress events.

use tokenbank_types::DepositEvent;
use tokio::sync::broadcast;

/// Cloneable handle to a broadcast channel of [`DepositEvent`]s.
///
/// Publishing never blocks; slow subscribers observe a `Lagged` error and
/// skip ahead.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<DepositEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns the number of subscribers that received it, or an error when
	/// nobody is listening.
	pub fn publish(
		&self,
		event: DepositEvent,
	) -> Result<usize, broadcast::error::SendError<DepositEvent>> {
		self.sender.send(event)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<DepositEvent> {
		self.sender.subscribe()
	}
}
