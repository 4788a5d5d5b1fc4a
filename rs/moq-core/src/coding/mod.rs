//! Wire framing: varints, length-prefixed messages, and the [`Reader`]/[`Writer`] helpers used
//! to speak them over a [`web_transport_trait`] stream.

mod reader;
mod string;
mod varint;
mod writer;

pub use reader::*;
pub use string::*;
pub use varint::*;
pub use writer::*;

use bytes::{Buf, BufMut};

/// An error while decoding a message from a buffer.
///
/// [`DecodeError::Short`] is special: it means "not enough bytes yet", and callers like
/// [`Reader::decode`] use it to know when to read more from the stream instead of failing.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
	#[error("not enough bytes buffered yet")]
	Short,

	#[error("varint bounds exceeded")]
	BoundsExceeded,

	#[error("invalid value")]
	InvalidValue,
}

/// Encode a message into a growable buffer.
pub trait Encode {
	fn encode<B: BufMut>(&self, buf: &mut B);
}

/// Decode a message from a buffer, returning [`DecodeError::Short`] if more bytes are needed.
pub trait Decode: Sized {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError>;
}
