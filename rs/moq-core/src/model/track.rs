//! A track is a named, prioritized sequence of [`Group`]s, split into a [`TrackProducer`]/
//! [`TrackConsumer`] pair.
use std::{collections::VecDeque, fmt, future::Future, ops::Deref, sync::Arc};

use tokio::sync::watch;

use super::{Group, GroupConsumer, GroupProducer, Produce};
use crate::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
	pub name: String,
	/// Higher priority tracks are served first when the connection is congested.
	pub priority: u8,
}

impl Track {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			priority: 0,
		}
	}

	pub fn with_priority(mut self, priority: u8) -> Self {
		self.priority = priority;
		self
	}

	pub fn produce(self) -> Produce<TrackProducer, TrackConsumer> {
		let producer = TrackProducer::new(self);
		let consumer = producer.consume();
		Produce::new(producer, consumer)
	}
}

impl<T: AsRef<str>> From<T> for Track {
	fn from(name: T) -> Self {
		Self::new(name.as_ref())
	}
}

/// Static, cheaply-clonable identity of a track, independent of its live state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackInfo {
	pub name: Arc<str>,
	pub priority: u8,
}

#[derive(Debug, Default)]
struct State {
	groups: VecDeque<GroupConsumer>,
	latest: Option<u64>,
	closed: Option<Result<(), Error>>,
}

/// Produce groups for a track, in any sequence order.
#[derive(Clone)]
pub struct TrackProducer {
	info: TrackInfo,
	state: watch::Sender<State>,
}

impl TrackProducer {
	pub fn new(track: impl Into<Track>) -> Self {
		let track = track.into();
		Self {
			info: TrackInfo {
				name: track.name.into(),
				priority: track.priority,
			},
			state: watch::Sender::new(State::default()),
		}
	}

	pub fn info(&self) -> TrackInfo {
		self.info.clone()
	}

	/// Create a new group with an explicit sequence number.
	///
	/// Fails with [`Error::Duplicate`] if that sequence number has already been produced.
	pub fn create_group(&self, sequence: impl Into<Group>) -> Result<GroupProducer, Error> {
		let group = GroupProducer::new(sequence.into());
		let mut result = Err(Error::Cancel);

		self.state.send_if_modified(|state| {
			if let Some(closed) = &state.closed {
				result = Err(closed.clone().err().unwrap_or(Error::Cancel));
				return false;
			}

			if state.groups.iter().any(|g| g.info().sequence == group.info().sequence) {
				result = Err(Error::Duplicate);
				return false;
			}

			state.latest = Some(state.latest.map_or(group.info().sequence, |max| max.max(group.info().sequence)));
			state.groups.push_back(group.consume());
			result = Ok(group.clone());
			true
		});

		result
	}

	/// Create a new group with the next sequence number after the latest produced so far.
	pub fn append_group(&self) -> Result<GroupProducer, Error> {
		let next = self.state.borrow().latest.map_or(0, |seq| seq + 1);
		self.create_group(next)
	}

	pub fn close(&self) -> Result<(), Error> {
		let mut result = Ok(());

		self.state.send_if_modified(|state| {
			if let Some(closed) = &state.closed {
				result = closed.clone();
				return false;
			}
			state.closed = Some(Ok(()));
			true
		});

		result
	}

	pub fn abort(&self, err: Error) -> Result<(), Error> {
		let mut result = Ok(());

		self.state.send_if_modified(|state| {
			if let Some(Err(closed)) = &state.closed {
				result = Err(closed.clone());
				return false;
			}
			state.closed = Some(Err(err));
			true
		});

		result
	}

	pub fn consume(&self) -> TrackConsumer {
		TrackConsumer {
			info: self.info.clone(),
			state: self.state.subscribe(),
			index: 0,
		}
	}

	pub fn unused(&self) -> impl Future<Output = ()> {
		let state = self.state.clone();
		async move {
			state.closed().await;
		}
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.same_channel(&other.state)
	}
}

impl Deref for TrackProducer {
	type Target = TrackInfo;

	fn deref(&self) -> &Self::Target {
		&self.info
	}
}

impl Drop for TrackProducer {
	fn drop(&mut self) {
		if self.state.sender_count() > 1 {
			return;
		}

		self.state.send_if_modified(|state| {
			if state.closed.is_some() {
				return false;
			}
			state.closed = Some(Err(Error::Cancel));
			true
		});
	}
}

/// Read groups from a track, in arrival order (which may skip sequence numbers).
#[derive(Clone)]
pub struct TrackConsumer {
	info: TrackInfo,
	state: watch::Receiver<State>,
	index: usize,
}

impl fmt::Debug for TrackConsumer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TrackConsumer")
			.field("name", &self.info.name)
			.field("index", &self.index)
			.finish()
	}
}

impl TrackConsumer {
	pub fn info(&self) -> TrackInfo {
		self.info.clone()
	}

	/// Wait for and return the next group, in the order it was produced.
	pub async fn next_group(&mut self) -> Result<Option<GroupConsumer>, Error> {
		let state = self
			.state
			.wait_for(|state| state.closed.is_some() || self.index < state.groups.len())
			.await
			.map_err(|_| Error::Cancel)?;

		if let Some(group) = state.groups.get(self.index).cloned() {
			self.index += 1;
			return Ok(Some(group));
		}

		match &state.closed {
			Some(Ok(())) => Ok(None),
			Some(Err(err)) => Err(err.clone()),
			None => unreachable!("wait_for only returns when a group is ready or the track is closed"),
		}
	}

	pub fn closed(&self) -> impl Future<Output = Result<(), Error>> {
		let mut state = self.state.clone();
		async move {
			match state.wait_for(|state| state.closed.is_some()).await {
				Ok(state) => state.closed.clone().unwrap(),
				Err(_) => Err(Error::Cancel),
			}
		}
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.same_channel(&other.state)
	}
}

impl Deref for TrackConsumer {
	type Target = TrackInfo;

	fn deref(&self) -> &Self::Target {
		&self.info
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::Bytes;

	#[tokio::test]
	async fn append_group_increments_sequence() {
		let producer = TrackProducer::new("video");
		let g0 = producer.append_group().unwrap();
		let g1 = producer.append_group().unwrap();
		assert_eq!(g0.info().sequence, 0);
		assert_eq!(g1.info().sequence, 1);
	}

	#[tokio::test]
	async fn duplicate_sequence_rejected() {
		let producer = TrackProducer::new("video");
		producer.create_group(3u64).unwrap();
		assert_eq!(producer.create_group(3u64), Err(Error::Duplicate));
	}

	#[tokio::test]
	async fn out_of_order_groups_both_delivered() {
		let producer = TrackProducer::new("video");
		let mut consumer = producer.consume();

		let mut g1 = producer.create_group(1u64).unwrap();
		let mut g0 = producer.create_group(0u64).unwrap();
		g1.write_frame(Bytes::from("b")).unwrap();
		g1.close().unwrap();
		g0.write_frame(Bytes::from("a")).unwrap();
		g0.close().unwrap();

		let first = consumer.next_group().await.unwrap().unwrap();
		assert_eq!(first.info().sequence, 1);
		let second = consumer.next_group().await.unwrap().unwrap();
		assert_eq!(second.info().sequence, 0);
	}

	#[tokio::test]
	async fn close_ends_track_cleanly() {
		let producer = TrackProducer::new("video");
		let mut consumer = producer.consume();
		producer.close().unwrap();
		assert!(consumer.next_group().await.unwrap().is_none());
	}
}
