//! Control-stream wire messages: announce propagation and subscribe setup.
//!
//! Every control message is framed the same way as everything else in [`crate::coding`]: no
//! separate header format, just [`Encode`]/[`Decode`] impls consumed by [`crate::coding::Reader`]
//! and [`crate::coding::Writer`].
use bytes::{Buf, BufMut};

use crate::coding::{decode_varint, encode_varint, Decode, DecodeError, Encode};

/// The first varint on a freshly opened bidirectional control stream, selecting how the rest of
/// the stream is framed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ControlType {
	/// Subscribe to announcements; see [`AnnounceEvent`].
	Announce,
	/// Subscribe to a single track; see [`SubscribeRequest`]/[`SubscribeOk`].
	Subscribe,
}

impl Encode for ControlType {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		let v: u64 = match self {
			Self::Announce => 0,
			Self::Subscribe => 1,
		};
		encode_varint(buf, v);
	}
}

impl Decode for ControlType {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		match decode_varint(buf)? {
			0 => Ok(Self::Announce),
			1 => Ok(Self::Subscribe),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}

/// One `(path, active)` transition, sent on an announce control stream.
///
/// The initial burst sent when the stream opens is just a sequence of these with `active: true`,
/// one per currently-announced path; there is no separate "init" message type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AnnounceEvent {
	pub path: String,
	pub active: bool,
}

impl Encode for AnnounceEvent {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		self.path.encode(buf);
		self.active.encode(buf);
	}
}

impl Decode for AnnounceEvent {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let path = String::decode(buf)?;
		let active = bool::decode(buf)?;
		Ok(Self { path, active })
	}
}

/// Sent by a subscriber to request a track. `id` is chosen by the subscriber and is echoed back
/// on every group opened for this subscription, so the publisher never needs to re-send the
/// broadcast path and track name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SubscribeRequest {
	pub id: u64,
	pub broadcast: String,
	pub track: String,
	pub priority: u8,
}

impl Encode for SubscribeRequest {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		encode_varint(buf, self.id);
		self.broadcast.encode(buf);
		self.track.encode(buf);
		self.priority.encode(buf);
	}
}

impl Decode for SubscribeRequest {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let id = decode_varint(buf)?;
		let broadcast = String::decode(buf)?;
		let track = String::decode(buf)?;
		let priority = u8::decode(buf)?;
		Ok(Self {
			id,
			broadcast,
			track,
			priority,
		})
	}
}

/// Acknowledges a [`SubscribeRequest`]; carries no data of its own today but keeps the control
/// stream a proper request/response so a future field doesn't need a new message type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SubscribeOk;

impl Encode for SubscribeOk {
	fn encode<B: BufMut>(&self, _buf: &mut B) {}
}

impl Decode for SubscribeOk {
	fn decode<B: Buf>(_buf: &mut B) -> Result<Self, DecodeError> {
		Ok(Self)
	}
}

/// The header written at the start of every group's unidirectional stream. The frames that
/// follow are each just a length-prefixed [`bytes::Bytes`], reusing the `Encode`/`Decode` impl in
/// [`crate::coding::string`]; end-of-group is the stream's clean half-close.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GroupHeader {
	pub track_id: u64,
	pub sequence: u64,
}

impl Encode for GroupHeader {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		encode_varint(buf, self.track_id);
		encode_varint(buf, self.sequence);
	}
}

impl Decode for GroupHeader {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let track_id = decode_varint(buf)?;
		let sequence = decode_varint(buf)?;
		Ok(Self { track_id, sequence })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	#[test]
	fn control_type_roundtrip() {
		for kind in [ControlType::Announce, ControlType::Subscribe] {
			let mut buf = BytesMut::new();
			kind.encode(&mut buf);
			let mut cursor = &buf[..];
			assert_eq!(ControlType::decode(&mut cursor).unwrap(), kind);
		}
	}

	#[test]
	fn subscribe_request_roundtrip() {
		let msg = SubscribeRequest {
			id: 7,
			broadcast: "room/alice".into(),
			track: "video".into(),
			priority: 3,
		};
		let mut buf = BytesMut::new();
		msg.encode(&mut buf);
		let mut cursor = &buf[..];
		assert_eq!(SubscribeRequest::decode(&mut cursor).unwrap(), msg);
	}

	#[test]
	fn group_header_roundtrip() {
		let msg = GroupHeader {
			track_id: 42,
			sequence: u64::MAX,
		};
		let mut buf = BytesMut::new();
		msg.encode(&mut buf);
		let mut cursor = &buf[..];
		assert_eq!(GroupHeader::decode(&mut cursor).unwrap(), msg);
	}
}
