//! Drives the subscribing side of a session: mirrors the peer's announcements into a local
//! [`OriginProducer`], opens `Subscribe` control streams on demand when a caller asks for a track
//! via [`crate::BroadcastConsumer::subscribe_track`], and demultiplexes incoming group streams by
//! `track_id` back onto the matching [`crate::TrackProducer`].
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use super::control::{AnnounceEvent, ControlType, GroupHeader, SubscribeOk, SubscribeRequest};
use super::stream::Stream;
use crate::coding::Reader;
use crate::model::TrackProducer;
use crate::{BroadcastConsumer, BroadcastProducer, Error, OriginProducer};

type TrackRegistry = Arc<Mutex<HashMap<u64, TrackProducer>>>;
type RemoteBroadcasts = Arc<Mutex<HashMap<String, BroadcastProducer>>>;

#[derive(Clone)]
pub(crate) struct Subscriber<S: web_transport_trait::Session> {
	session: S,
	/// Mirrors the peer's `Announce` events so [`crate::Session::origin_consumer`] can surface them.
	announced: OriginProducer,
	/// Synthetic per-path producers backing [`crate::Session::consume`]; tracks requested on the
	/// consumer side become `Subscribe` requests via [`crate::BroadcastProducer::requested_track`].
	remote: RemoteBroadcasts,
	/// Session-scoped `track_id` registry for demultiplexing incoming group streams.
	tracks: TrackRegistry,
	next_id: Arc<AtomicU64>,
}

impl<S: web_transport_trait::Session> Subscriber<S> {
	pub fn new(session: S) -> Self {
		Self {
			session,
			announced: OriginProducer::new(),
			remote: Default::default(),
			tracks: Default::default(),
			next_id: Arc::new(AtomicU64::new(0)),
		}
	}

	pub fn origin_consumer(&self) -> crate::OriginConsumer {
		self.announced.consume()
	}

	pub fn consume(&self, path: &str) -> BroadcastConsumer {
		self.remote_producer(path).consume()
	}

	fn remote_producer(&self, path: &str) -> BroadcastProducer {
		let mut remote = self.remote.lock();
		if let Some(existing) = remote.get(path) {
			return existing.clone();
		}

		let producer = BroadcastProducer::new();
		remote.insert(path.to_string(), producer.clone());
		drop(remote);

		self.spawn_track_pump(path.to_string(), producer.clone());
		producer
	}

	/// Accept incoming group streams and run the announce mirror until the session ends.
	pub async fn run(self) -> Result<(), Error> {
		let announce = self.clone();
		web_async::spawn(async move {
			if let Err(err) = announce.run_announce().await {
				tracing::debug!(%err, "announce stream ended");
			}
		});

		loop {
			let recv = self.session.accept_uni().await.map_err(Error::from_transport)?;
			let tracks = self.tracks.clone();

			web_async::spawn(async move {
				if let Err(err) = Self::serve_incoming_group(recv, tracks).await {
					tracing::debug!(%err, "group stream ended");
				}
			});
		}
	}

	async fn run_announce(&self) -> Result<(), Error> {
		let mut stream = Stream::open(&self.session).await?;
		stream.writer.encode(&ControlType::Announce).await?;

		loop {
			match stream.reader.decode_maybe::<AnnounceEvent>().await? {
				Some(event) => {
					if event.active {
						let consumer = self.remote_producer(&event.path).consume();
						self.announced.publish_broadcast(event.path, consumer)?;
					} else {
						let _ = self.announced.unannounce(&event.path);
					}
				}
				None => return Ok(()),
			}
		}
	}

	fn spawn_track_pump(&self, path: String, producer: BroadcastProducer) {
		let session = self.session.clone();
		let tracks = self.tracks.clone();
		let next_id = self.next_id.clone();

		web_async::spawn(async move {
			while let Some(track_producer) = producer.requested_track().await {
				let id = next_id.fetch_add(1, Ordering::Relaxed);
				tracks.lock().insert(id, track_producer.clone());

				let session = session.clone();
				let path = path.clone();
				let tracks = tracks.clone();
				let track_producer2 = track_producer.clone();

				web_async::spawn(async move {
					if let Err(err) = Self::run_subscribe(session, path, id, track_producer).await {
						tracing::debug!(%id, %err, "subscribe cancelled");
						let _ = track_producer2.abort(err);
					}
					tracks.lock().remove(&id);
				});
			}
		});
	}

	async fn run_subscribe(session: S, broadcast: String, id: u64, producer: TrackProducer) -> Result<(), Error> {
		let info = producer.info();

		let mut stream = Stream::open(&session).await?;
		stream.writer.encode(&ControlType::Subscribe).await?;

		let req = SubscribeRequest {
			id,
			broadcast,
			track: info.name.to_string(),
			priority: info.priority,
		};
		stream.writer.encode(&req).await?;
		stream.reader.decode::<SubscribeOk>().await?;

		tracing::debug!(%id, track = %info.name, "subscribed ok");

		// Hold the control stream open for as long as anyone is reading this track; dropping
		// `stream` here resets it, which is the peer's signal to stop serving new groups.
		producer.unused().await;
		Ok(())
	}

	async fn serve_incoming_group(recv: S::RecvStream, tracks: TrackRegistry) -> Result<(), Error> {
		let mut reader = Reader::new(recv);
		let header = reader.decode::<GroupHeader>().await?;

		let track = tracks.lock().get(&header.track_id).cloned();

		let Some(track) = track else {
			tracing::warn!(track_id = header.track_id, "no subscriber for track_id; draining group");
			while reader.decode_maybe::<Bytes>().await?.is_some() {}
			return Ok(());
		};

		let mut group = track.create_group(header.sequence)?;

		loop {
			match reader.decode_maybe::<Bytes>().await {
				Ok(Some(payload)) => {
					let _ = group.write_frame(payload);
				}
				Ok(None) => {
					let _ = group.close();
					return Ok(());
				}
				Err(err) => {
					let _ = group.abort(err.clone());
					return Err(err);
				}
			}
		}
	}
}
