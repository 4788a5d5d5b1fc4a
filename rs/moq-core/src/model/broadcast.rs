//! A broadcast is a named collection of [`Track`]s published by a single producer, split into a
//! [`BroadcastProducer`]/[`BroadcastConsumer`] pair.
use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use super::{Consumer, Produce, Producer, Track, TrackConsumer, TrackProducer};
use crate::Error;

#[derive(Default)]
struct State {
	tracks: HashMap<String, TrackProducer>,
}

/// A broadcast has no name of its own; it's named by the path under which it gets announced.
#[derive(Clone, Copy, Default)]
pub struct Broadcast;

impl Broadcast {
	pub fn produce() -> Produce<BroadcastProducer, BroadcastConsumer> {
		let producer = BroadcastProducer::new();
		let consumer = producer.consume();
		Produce::new(producer, consumer)
	}
}

type Pending = Arc<Mutex<HashMap<String, TrackProducer>>>;

/// Publish tracks into a broadcast, and learn about tracks a consumer has asked for that
/// haven't been published yet (used by the session layer to fetch remote tracks on demand).
#[derive(Clone)]
pub struct BroadcastProducer {
	state: Producer<State>,
	pending: Pending,
	requested_tx: async_channel::Sender<TrackProducer>,
	requested_rx: async_channel::Receiver<TrackProducer>,
}

impl BroadcastProducer {
	pub fn new() -> Self {
		let (requested_tx, requested_rx) = async_channel::unbounded();
		Self {
			state: Default::default(),
			pending: Default::default(),
			requested_tx,
			requested_rx,
		}
	}

	/// Create and publish a new track in one step.
	pub fn create_track(&self, track: impl Into<Track>) -> Result<TrackProducer, Error> {
		let track = TrackProducer::new(track.into());
		self.insert_track(track.clone())?;
		Ok(track)
	}

	/// Publish an existing track handle under its own name.
	///
	/// Fails with [`Error::Duplicate`] if a track with that name is already published.
	pub fn insert_track(&self, track: TrackProducer) -> Result<(), Error> {
		let name = track.name.to_string();
		self.state.modify(|state| {
			if state.tracks.contains_key(&name) {
				return Err(Error::Duplicate);
			}
			self.pending.lock().remove(&name);
			state.tracks.insert(name, track);
			Ok(())
		})?
	}

	pub fn remove_track(&self, name: &str) -> Result<TrackProducer, Error> {
		self.state.modify(|state| state.tracks.remove(name).ok_or(Error::NotFound))?
	}

	/// Wait for the next track a consumer asked for that isn't published yet.
	///
	/// Returns `None` once every [`BroadcastConsumer`] has been dropped.
	pub async fn requested_track(&self) -> Option<TrackProducer> {
		self.requested_rx.recv().await.ok()
	}

	pub fn consume(&self) -> BroadcastConsumer {
		BroadcastConsumer {
			state: self.state.consume(),
			pending: self.pending.clone(),
			requested: self.requested_tx.clone(),
		}
	}

	pub fn close(&self) -> Result<(), Error> {
		self.state.close()
	}

	pub fn abort(&self, err: Error) -> Result<(), Error> {
		self.state.abort(err)
	}

	pub async fn unused(&self) {
		self.state.unused().await
	}
}

impl Default for BroadcastProducer {
	fn default() -> Self {
		Self::new()
	}
}

/// Discover and subscribe to the tracks of a broadcast.
#[derive(Clone)]
pub struct BroadcastConsumer {
	state: Consumer<State>,
	pending: Pending,
	requested: async_channel::Sender<TrackProducer>,
}

impl BroadcastConsumer {
	/// Returns a consumer for `track`.
	///
	/// If the track is already published, its consumer is returned immediately. Otherwise a
	/// fresh [`TrackProducer`] is queued on [`BroadcastProducer::requested_track`] and its
	/// consumer is returned right away; repeated requests for the same name are deduplicated.
	pub fn subscribe_track(&self, track: impl Into<Track>) -> Result<TrackConsumer, Error> {
		let track = track.into();

		if let Some(existing) = self.state.borrow().tracks.get(&track.name) {
			return Ok(existing.consume());
		}

		let mut pending = self.pending.lock();
		if let Some(existing) = pending.get(&track.name) {
			return Ok(existing.consume());
		}

		let producer = TrackProducer::new(track.clone());
		let consumer = producer.consume();
		pending.insert(track.name.clone(), producer.clone());
		drop(pending);

		let _ = self.requested.try_send(producer);
		Ok(consumer)
	}

	/// The names of every track currently published in this broadcast.
	pub fn track_names(&self) -> Vec<String> {
		self.state.borrow().tracks.keys().cloned().collect()
	}

	pub async fn closed(&self) -> Result<(), Error> {
		self.state.closed().await
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.is_clone(&other.state)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::FutureExt;

	#[tokio::test]
	async fn publish_then_subscribe() {
		let producer = BroadcastProducer::new();
		let track = producer.create_track("video").unwrap();
		let consumer = producer.consume();

		let found = consumer.subscribe_track("video").unwrap();
		assert_eq!(found.name.as_ref(), "video");
		drop(track);
	}

	#[tokio::test]
	async fn unpublished_track_is_requested() {
		let producer = BroadcastProducer::new();
		let consumer = producer.consume();

		let _found = consumer.subscribe_track("missing").unwrap();
		let requested = producer.requested_track().await.unwrap();
		assert_eq!(requested.name.as_ref(), "missing");
	}

	#[tokio::test]
	async fn duplicate_requests_are_deduplicated() {
		let producer = BroadcastProducer::new();
		let consumer = producer.consume();

		consumer.subscribe_track("missing").unwrap();
		consumer.subscribe_track("missing").unwrap();

		producer.requested_track().await.unwrap();
		assert!(producer.requested_track().now_or_never().is_none());
	}

	#[tokio::test]
	async fn duplicate_track_rejected() {
		let producer = BroadcastProducer::new();
		producer.create_track("video").unwrap();
		assert_eq!(producer.create_track("video"), Err(Error::Duplicate));
	}

	#[tokio::test]
	async fn close_propagates_to_consumer() {
		let producer = BroadcastProducer::new();
		let consumer = producer.consume();
		producer.close().unwrap();
		assert!(consumer.closed().await.is_ok());
	}
}
