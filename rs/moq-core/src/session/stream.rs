use crate::coding::{Reader, Writer};
use crate::Error;

/// A bidirectional control stream: a [`Reader`] paired with a [`Writer`] over the same
/// [`web_transport_trait::Session`]'s send/recv halves.
pub(crate) struct Stream<S: web_transport_trait::Session> {
	pub reader: Reader<S::RecvStream>,
	pub writer: Writer<S::SendStream>,
}

impl<S: web_transport_trait::Session> Stream<S> {
	/// Open a new bidirectional stream to the peer.
	pub async fn open(session: &S) -> Result<Self, Error> {
		let (send, recv) = session.open_bi().await.map_err(Error::from_transport)?;
		Ok(Self {
			reader: Reader::new(recv),
			writer: Writer::new(send),
		})
	}

	/// Accept the next bidirectional stream opened by the peer.
	pub async fn accept(session: &S) -> Result<Self, Error> {
		let (send, recv) = session.accept_bi().await.map_err(Error::from_transport)?;
		Ok(Self {
			reader: Reader::new(recv),
			writer: Writer::new(send),
		})
	}
}
