//! The announce bus: a registry of broadcasts published under string paths, and a way to learn
//! about paths coming and going over time.
//!
//! [`OriginProducer`] is the write side: either the local application publishing its own
//! broadcasts, or the session layer mirroring a peer's `ANNOUNCE` messages into a local
//! registry. [`OriginConsumer`] is the read side, used both by applications discovering
//! broadcasts and by the session layer when it needs to announce our broadcasts outward.
//!
//! The bus is backed by a single [`Producer`]/[`Consumer`] snapshot rather than an unbounded
//! event queue: every [`OriginConsumer::announced`] call diffs the latest snapshot against what
//! it has already reported, so intermediate flaps coalesce for free and a withdrawal is never
//! lost even if the consumer is slow to poll, since it remains visible until observed.
use std::collections::{HashMap, HashSet};

use super::{BroadcastConsumer, Consumer, Produce, Producer};
use crate::Error;

#[derive(Default)]
struct State {
	announced: HashMap<String, BroadcastConsumer>,
}

/// A registry of broadcasts, keyed by path.
pub struct Origin;

impl Origin {
	pub fn produce() -> Produce<OriginProducer, OriginConsumer> {
		let producer = OriginProducer::new();
		let consumer = producer.consume();
		Produce::new(producer, consumer)
	}
}

/// Publish broadcasts into the origin, or mirror a peer's announcements into it.
#[derive(Clone)]
pub struct OriginProducer {
	state: Producer<State>,
}

impl OriginProducer {
	pub fn new() -> Self {
		Self { state: Default::default() }
	}

	/// Announce `broadcast` under `path`.
	///
	/// The path is automatically withdrawn once `broadcast` closes, so callers don't need to
	/// call [`OriginProducer::unannounce`] on the happy path.
	pub fn publish_broadcast(&self, path: impl Into<String>, broadcast: BroadcastConsumer) -> Result<(), Error> {
		let path = path.into();

		self.state.modify(|state| {
			state.announced.insert(path.clone(), broadcast.clone());
		})?;

		let state = self.state.clone();
		web_async::spawn(async move {
			let _ = broadcast.closed().await;
			let _ = state.modify(|state| {
				state.announced.remove(&path);
			});
		});

		Ok(())
	}

	/// Explicitly withdraw a path, independent of whether its broadcast has closed.
	pub fn unannounce(&self, path: &str) -> Result<(), Error> {
		self.state.modify(|state| {
			state.announced.remove(path);
		})
	}

	pub fn consume_broadcast(&self, path: &str) -> Option<BroadcastConsumer> {
		self.state.borrow().announced.get(path).cloned()
	}

	pub fn consume(&self) -> OriginConsumer {
		OriginConsumer {
			state: self.state.consume(),
			seen: HashSet::new(),
		}
	}

	pub async fn unused(&self) {
		self.state.unused().await
	}
}

impl Default for OriginProducer {
	fn default() -> Self {
		Self::new()
	}
}

/// Discover broadcasts announced into an [`Origin`].
#[derive(Clone)]
pub struct OriginConsumer {
	state: Consumer<State>,
	seen: HashSet<String>,
}

impl OriginConsumer {
	pub fn consume_broadcast(&self, path: &str) -> Option<BroadcastConsumer> {
		self.state.borrow().announced.get(path).cloned()
	}

	pub fn announced_paths(&self) -> Vec<String> {
		self.state.borrow().announced.keys().cloned().collect()
	}

	/// Wait for the next announce (`true`) or withdrawal (`false`) event, or `None` once the
	/// origin closes and every previously-announced path has been withdrawn.
	pub async fn announced(&mut self) -> Option<(String, bool)> {
		loop {
			if let Some(event) = self.next_diff() {
				return Some(event);
			}

			let seen = self.seen.clone();
			let changed = self
				.state
				.wait_for(|state| Self::differs(&seen, &state.announced))
				.await;

			if changed.is_err() {
				// Closed: drain the paths we'd previously announced as withdrawals.
				if let Some(path) = self.seen.iter().next().cloned() {
					self.seen.remove(&path);
					return Some((path, false));
				}
				return None;
			}
		}
	}

	fn next_diff(&mut self) -> Option<(String, bool)> {
		let snapshot = self.state.borrow();

		for path in snapshot.announced.keys() {
			if !self.seen.contains(path) {
				let path = path.clone();
				drop(snapshot);
				self.seen.insert(path.clone());
				return Some((path, true));
			}
		}

		for path in &self.seen {
			if !snapshot.announced.contains_key(path) {
				let path = path.clone();
				drop(snapshot);
				self.seen.remove(&path);
				return Some((path, false));
			}
		}

		None
	}

	fn differs(seen: &HashSet<String>, announced: &HashMap<String, BroadcastConsumer>) -> bool {
		announced.len() != seen.len() || announced.keys().any(|path| !seen.contains(path))
	}

	pub async fn closed(&self) -> Result<(), Error> {
		self.state.closed().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::Broadcast;

	#[tokio::test]
	async fn announce_then_withdraw_on_close() {
		let origin = Origin::produce();
		let mut consumer = origin.consumer.clone();

		let broadcast = Broadcast::produce();
		origin.producer.publish_broadcast("room/alice", broadcast.consumer.clone()).unwrap();

		assert_eq!(consumer.announced().await, Some(("room/alice".to_string(), true)));

		drop(broadcast.producer);
		assert_eq!(consumer.announced().await, Some(("room/alice".to_string(), false)));
	}

	#[tokio::test]
	async fn explicit_unannounce() {
		let origin = Origin::produce();
		let mut consumer = origin.consumer.clone();

		let broadcast = Broadcast::produce();
		origin.producer.publish_broadcast("a", broadcast.consumer).unwrap();
		consumer.announced().await;

		origin.producer.unannounce("a").unwrap();
		assert_eq!(consumer.announced().await, Some(("a".to_string(), false)));
	}

	#[tokio::test]
	async fn consume_broadcast_by_path() {
		let origin = Origin::produce();
		let broadcast = Broadcast::produce();
		origin.producer.publish_broadcast("a", broadcast.consumer).unwrap();

		assert!(origin.consumer.consume_broadcast("a").is_some());
		assert!(origin.consumer.consume_broadcast("b").is_none());
	}
}
