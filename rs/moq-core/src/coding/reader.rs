use std::{cmp, io};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::Error;

use super::{Decode, DecodeError};

/// Buffers bytes off a [`web_transport_trait::RecvStream`] and decodes length-prefixed messages
/// from it.
pub struct Reader<S: web_transport_trait::RecvStream> {
	stream: S,
	buffer: BytesMut,
}

impl<S: web_transport_trait::RecvStream> Reader<S> {
	pub fn new(stream: S) -> Self {
		Self {
			stream,
			buffer: Default::default(),
		}
	}

	/// Decode the next message, reading more from the stream as needed.
	pub async fn decode<T: Decode>(&mut self) -> Result<T, Error> {
		loop {
			let mut cursor = io::Cursor::new(&self.buffer[..]);
			match T::decode(&mut cursor) {
				Ok(msg) => {
					let consumed = cursor.position() as usize;
					self.buffer.advance(consumed);
					return Ok(msg);
				}
				Err(DecodeError::Short) => {
					if !self.read_more().await? {
						return Err(Error::Decode);
					}
				}
				Err(e) => return Err(e.into()),
			}
		}
	}

	/// Decode the next message, or `None` if the stream ends cleanly with nothing buffered.
	pub async fn decode_maybe<T: Decode>(&mut self) -> Result<Option<T>, Error> {
		if !self.has_more().await? {
			return Ok(None);
		}

		Ok(Some(self.decode().await?))
	}

	/// Read exactly `size` bytes, blocking on the stream until they're available.
	pub async fn read_exact(&mut self, size: usize) -> Result<Bytes, Error> {
		if self.buffer.len() >= size {
			return Ok(self.buffer.split_to(size).freeze());
		}

		let mut out = BytesMut::with_capacity(size);
		out.put(self.buffer.split());

		while out.len() < size {
			match self
				.stream
				.read_chunk(size - out.len())
				.await
				.map_err(Error::from_transport)?
			{
				Some(chunk) => out.put(chunk),
				None => return Err(Error::Decode),
			}
		}

		Ok(out.freeze())
	}

	/// Read a chunk of at most `max` bytes, or `None` on clean end-of-stream.
	pub async fn read(&mut self, max: usize) -> Result<Option<Bytes>, Error> {
		if !self.buffer.is_empty() {
			let size = cmp::min(max, self.buffer.len());
			return Ok(Some(self.buffer.split_to(size).freeze()));
		}

		self.stream.read_chunk(max).await.map_err(Error::from_transport)
	}

	/// Returns an error unless the stream closes cleanly with nothing left unread.
	pub async fn closed(&mut self) -> Result<(), Error> {
		if self.has_more().await? {
			return Err(Error::Decode);
		}
		Ok(())
	}

	async fn has_more(&mut self) -> Result<bool, Error> {
		if !self.buffer.is_empty() {
			return Ok(true);
		}
		self.read_more().await
	}

	async fn read_more(&mut self) -> Result<bool, Error> {
		match self.stream.read_chunk(64 * 1024).await.map_err(Error::from_transport)? {
			Some(chunk) => {
				self.buffer.put(chunk);
				Ok(true)
			}
			None => Ok(false),
		}
	}
}
