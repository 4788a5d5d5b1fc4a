//! Publishes and consumes the catalog track itself: a live-updated JSON document describing which
//! tracks a broadcast currently offers.
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;

use crate::model::{Catalog, CATALOG_TRACK_NAME};
use crate::{parse, Error};

/// Publishes catalog updates onto a broadcast's catalog track.
///
/// Use [`CatalogProducer::update`] to mutate the catalog and publish the new snapshot as a group.
#[derive(Clone)]
pub struct CatalogProducer {
	track: moq_core::TrackProducer,
	current: Arc<Mutex<Catalog>>,
}

impl CatalogProducer {
	/// Create a catalog track on `broadcast` and start it empty.
	pub fn new(broadcast: &moq_core::BroadcastProducer) -> Result<Self, Error> {
		let track = broadcast.create_track(moq_core::Track::new(CATALOG_TRACK_NAME))?;
		Ok(Self {
			track,
			current: Arc::new(Mutex::new(Catalog::default())),
		})
	}

	/// Mutate the catalog, publishing the new snapshot as a single-frame group on drop of the guard.
	pub fn update(&mut self) -> CatalogGuard<'_> {
		CatalogGuard {
			catalog: self.current.lock().expect("catalog mutex poisoned"),
			track: &mut self.track,
		}
	}

	pub fn close(self) -> Result<(), moq_core::Error> {
		self.track.close()
	}
}

pub struct CatalogGuard<'a> {
	catalog: MutexGuard<'a, Catalog>,
	track: &'a mut moq_core::TrackProducer,
}

impl Deref for CatalogGuard<'_> {
	type Target = Catalog;

	fn deref(&self) -> &Self::Target {
		&self.catalog
	}
}

impl DerefMut for CatalogGuard<'_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.catalog
	}
}

impl Drop for CatalogGuard<'_> {
	fn drop(&mut self) {
		let bytes = parse::serialize(&self.catalog);
		if let Ok(mut group) = self.track.append_group() {
			let _ = group.write_frame(Bytes::from(bytes));
			let _ = group.close();
		}
	}
}

/// Subscribes to a broadcast's catalog track and yields each published snapshot.
pub struct CatalogConsumer {
	broadcast: Option<moq_core::BroadcastConsumer>,
	track: Option<moq_core::TrackConsumer>,
	group: Option<moq_core::GroupConsumer>,
}

impl CatalogConsumer {
	pub fn new(broadcast: moq_core::BroadcastConsumer) -> Self {
		Self {
			broadcast: Some(broadcast),
			track: None,
			group: None,
		}
	}

	/// Wait for the next catalog snapshot. Returns `None` once the broadcast or track ends.
	pub async fn next(&mut self) -> Result<Option<Catalog>, Error> {
		if let Some(broadcast) = &self.broadcast {
			let track = broadcast.subscribe_track(moq_core::Track::new(CATALOG_TRACK_NAME))?;
			self.track = Some(track);
			self.broadcast = None;
		}

		loop {
			if self.group.is_none() {
				let Some(track) = self.track.as_mut() else { return Ok(None) };
				match track.next_group().await? {
					Some(group) => self.group = Some(group),
					None => return Ok(None),
				}
			}

			let group = self.group.as_mut().expect("checked above");
			match group.read_frame().await? {
				Some(frame) => return Ok(Some(parse::parse(&frame.payload)?)),
				None => self.group = None,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::AvailableTrack;

	#[tokio::test]
	async fn publish_then_consume_round_trips() {
		let broadcast = moq_core::BroadcastProducer::new();
		let mut producer = CatalogProducer::new(&broadcast).unwrap();

		let mut consumer = CatalogConsumer::new(broadcast.consume());

		{
			let mut guard = producer.update();
			guard.tracks.insert(
				"video".into(),
				AvailableTrack {
					name: "video".into(),
					kind: "video".into(),
					priority: 2,
				},
			);
		}

		let catalog = consumer.next().await.unwrap().unwrap();
		assert_eq!(catalog.get("video").unwrap().priority, 2);
	}
}
