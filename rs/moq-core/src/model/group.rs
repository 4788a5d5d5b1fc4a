//! A group is an ordered run of [`Frame`]s, split into a [`GroupProducer`]/[`GroupConsumer`]
//! pair. Each group maps to its own QUIC stream on the wire; a clean half-close ends the group,
//! an abrupt reset aborts it.
use std::ops::Deref;

use super::{Consumer, Frame, Producer};
use crate::Error;

/// Groups arrive out of order over the network, so each carries its own sequence number.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Group {
	pub sequence: u64,
}

impl From<u64> for Group {
	fn from(sequence: u64) -> Self {
		Self { sequence }
	}
}

#[derive(Default, Debug)]
struct GroupState {
	frames: Vec<Frame>,
}

/// Write a group's frames in order.
#[derive(Clone, Debug)]
pub struct GroupProducer {
	info: Group,
	state: Producer<GroupState>,
}

impl GroupProducer {
	pub fn new(info: impl Into<Group>) -> Self {
		Self {
			info: info.into(),
			state: Default::default(),
		}
	}

	pub fn info(&self) -> Group {
		self.info
	}

	pub fn write_frame(&mut self, frame: impl Into<Frame>) -> Result<(), Error> {
		let frame = frame.into();
		self.state.modify(|state| state.frames.push(frame))
	}

	/// Clean, in-order end of the group.
	pub fn close(&self) -> Result<(), Error> {
		self.state.close()
	}

	/// Abrupt termination; the consumer sees `err` instead of a graceful end.
	pub fn abort(&self, err: Error) -> Result<(), Error> {
		self.state.abort(err)
	}

	pub fn consume(&self) -> GroupConsumer {
		GroupConsumer {
			info: self.info,
			state: self.state.consume(),
			index: 0,
		}
	}

	pub async fn unused(&self) {
		self.state.unused().await
	}
}

impl Deref for GroupProducer {
	type Target = Group;

	fn deref(&self) -> &Self::Target {
		&self.info
	}
}

/// Read a group's frames in order. Cloning gives the clone its own read cursor over the same
/// underlying frames (fanout).
#[derive(Clone, Debug)]
pub struct GroupConsumer {
	info: Group,
	state: Consumer<GroupState>,
	index: usize,
}

impl GroupConsumer {
	pub fn info(&self) -> Group {
		self.info
	}

	/// Read the next frame, or `None` once the group ends cleanly.
	pub async fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
		let state = self.state.wait_for(|state| self.index < state.frames.len()).await;

		let state = match state {
			Ok(state) => state,
			Err(err) => return Err(err),
		};

		if let Some(frame) = state.frames.get(self.index).cloned() {
			self.index += 1;
			return Ok(Some(frame));
		}

		Ok(None)
	}

	pub async fn closed(&self) -> Result<(), Error> {
		self.state.closed().await
	}
}

impl Deref for GroupConsumer {
	type Target = Group;

	fn deref(&self) -> &Self::Target {
		&self.info
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn write_then_read() {
		let producer = GroupProducer::new(0u64);
		let mut consumer = producer.consume();

		let mut producer = producer;
		producer.write_frame(Frame::new("hello")).unwrap();
		producer.close().unwrap();

		assert_eq!(consumer.read_frame().await.unwrap().unwrap().payload, "hello");
		assert!(consumer.read_frame().await.unwrap().is_none());
	}

	#[tokio::test]
	async fn multiple_consumers_fanout() {
		let mut producer = GroupProducer::new(5u64);
		let mut c1 = producer.consume();
		let mut c2 = producer.consume();

		producer.write_frame(Frame::new("data")).unwrap();
		producer.close().unwrap();

		assert_eq!(c1.read_frame().await.unwrap().unwrap().payload, "data");
		assert_eq!(c2.read_frame().await.unwrap().unwrap().payload, "data");
	}

	#[tokio::test]
	async fn abort_surfaces_error() {
		let mut producer = GroupProducer::new(0u64);
		let consumer = producer.consume();

		producer.write_frame(Frame::new("data")).unwrap();
		producer.abort(Error::Cancel).unwrap();

		assert!(consumer.closed().await.is_err());
	}
}
