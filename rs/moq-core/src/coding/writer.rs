use bytes::{Buf, BytesMut};

use crate::Error;

use super::Encode;

/// Encodes length-prefixed messages onto a [`web_transport_trait::SendStream`].
///
/// Resets the underlying stream with [`Error::Cancel`] if dropped before [`Writer::finish`].
pub struct Writer<S: web_transport_trait::SendStream> {
	stream: Option<S>,
	buffer: BytesMut,
}

impl<S: web_transport_trait::SendStream> Writer<S> {
	pub fn new(stream: S) -> Self {
		Self {
			stream: Some(stream),
			buffer: Default::default(),
		}
	}

	pub async fn encode<T: Encode>(&mut self, msg: &T) -> Result<(), Error> {
		self.buffer.clear();
		msg.encode(&mut self.buffer);

		while self.buffer.has_remaining() {
			self.write_buf().await?;
		}

		Ok(())
	}

	pub async fn write_all<B: Buf + Send>(&mut self, mut buf: B) -> Result<(), Error> {
		while buf.has_remaining() {
			self.stream
				.as_mut()
				.expect("stream already finished")
				.write_buf(&mut buf)
				.await
				.map_err(Error::from_transport)?;
		}
		Ok(())
	}

	async fn write_buf(&mut self) -> Result<(), Error> {
		self.stream
			.as_mut()
			.expect("stream already finished")
			.write_buf(&mut self.buffer)
			.await
			.map_err(Error::from_transport)?;
		Ok(())
	}

	/// Mark the clean, graceful termination of the stream.
	pub fn finish(&mut self) -> Result<(), Error> {
		self.stream
			.take()
			.expect("stream already finished")
			.finish()
			.map_err(Error::from_transport)
	}

	/// Abruptly reset the stream, signalling `err` to the peer.
	pub fn abort(&mut self, err: &Error) {
		if let Some(mut stream) = self.stream.take() {
			stream.reset(err.to_code());
		}
	}

	pub fn set_priority(&mut self, priority: i32) {
		if let Some(stream) = self.stream.as_mut() {
			stream.set_priority(priority);
		}
	}
}

impl<S: web_transport_trait::SendStream> Drop for Writer<S> {
	fn drop(&mut self) {
		if let Some(mut stream) = self.stream.take() {
			stream.reset(Error::Cancel.to_code());
		}
	}
}
