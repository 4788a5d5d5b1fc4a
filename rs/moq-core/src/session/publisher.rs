//! Serves the peer's control streams against our own locally-published [`OriginProducer`]:
//! answers `Announce` requests with our announced paths and `Subscribe` requests with groups
//! pulled from the matching [`crate::TrackConsumer`].
use futures::stream::FuturesUnordered;
use futures::StreamExt;

use super::control::{ControlType, GroupHeader, SubscribeOk, SubscribeRequest};
use super::stream::Stream;
use crate::coding::Writer;
use crate::model::{GroupConsumer, Track};
use crate::{Error, OriginProducer};

pub(crate) struct Publisher<S: web_transport_trait::Session> {
	session: S,
	origin: OriginProducer,
}

impl<S: web_transport_trait::Session> Publisher<S> {
	pub fn new(session: S, origin: OriginProducer) -> Self {
		Self { session, origin }
	}

	/// Accept and serve control streams until the session ends.
	pub async fn run(self) -> Result<(), Error> {
		loop {
			let mut stream = Stream::accept(&self.session).await?;
			let origin = self.origin.clone();
			let session = self.session.clone();

			web_async::spawn(async move {
				let result = Self::serve(session, &mut stream, origin).await;
				if let Err(err) = result {
					tracing::debug!(%err, "control stream ended");
					stream.writer.abort(&err);
				}
			});
		}
	}

	async fn serve(session: S, stream: &mut Stream<S>, origin: OriginProducer) -> Result<(), Error> {
		match stream.reader.decode::<ControlType>().await? {
			ControlType::Announce => Self::serve_announce(stream, origin).await,
			ControlType::Subscribe => Self::serve_subscribe(session, stream, origin).await,
		}
	}

	async fn serve_announce(stream: &mut Stream<S>, origin: OriginProducer) -> Result<(), Error> {
		use super::control::AnnounceEvent;

		let mut consumer = origin.consume();

		loop {
			tokio::select! {
				biased;
				res = stream.reader.closed() => return res,
				next = consumer.announced() => match next {
					Some((path, active)) => {
						stream.writer.encode(&AnnounceEvent { path, active }).await?;
					}
					None => {
						stream.writer.finish()?;
						return Ok(());
					}
				},
			}
		}
	}

	async fn serve_subscribe(session: S, stream: &mut Stream<S>, origin: OriginProducer) -> Result<(), Error> {
		let req = stream.reader.decode::<SubscribeRequest>().await?;

		tracing::debug!(id = req.id, broadcast = %req.broadcast, track = %req.track, "subscribed started");

		let broadcast = origin.consume_broadcast(&req.broadcast).ok_or(Error::NotFound)?;
		let track = Track::new(req.track.clone()).with_priority(req.priority);
		let mut track = broadcast.subscribe_track(track)?;

		stream.writer.encode(&SubscribeOk).await?;

		let mut tasks = FuturesUnordered::new();

		loop {
			tokio::select! {
				biased;
				res = stream.reader.closed() => {
					tracing::debug!(id = req.id, "subscribed cancelled");
					return res;
				}
				group = track.next_group() => match group? {
					Some(group) => {
						let msg = GroupHeader { track_id: req.id, sequence: group.sequence };
						let session = session.clone();
						let priority = req.priority;
						tasks.push(Self::serve_group(session, msg, priority, group));
					}
					None => {
						stream.writer.finish()?;
						tracing::debug!(id = req.id, "subscribed complete");
						return Ok(());
					}
				},
				Some(_) = tasks.next(), if !tasks.is_empty() => {},
			}
		}
	}

	async fn serve_group(session: S, msg: GroupHeader, priority: u8, mut group: GroupConsumer) -> Result<(), Error> {
		let send = session.open_uni().await.map_err(Error::from_transport)?;
		let mut writer = Writer::new(send);
		writer.set_priority(priority as i32);
		writer.encode(&msg).await?;

		loop {
			match group.read_frame().await {
				Ok(Some(frame)) => writer.encode(&frame.payload).await?,
				Ok(None) => {
					writer.finish()?;
					return Ok(());
				}
				Err(err) => {
					writer.abort(&err);
					return Err(err);
				}
			}
		}
	}
}
