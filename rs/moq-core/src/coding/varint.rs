use bytes::{Buf, BufMut};

use super::{Decode, DecodeError, Encode};

/// A QUIC-style variable-length integer, encoding values up to 2^62-1 in 1/2/4/8 bytes.
///
/// The two high bits of the first byte select the length, exactly as in RFC 9000 §16.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarInt(pub u64);

impl VarInt {
	pub const MAX: u64 = (1 << 62) - 1;

	pub fn new(v: u64) -> Result<Self, DecodeError> {
		if v > Self::MAX {
			return Err(DecodeError::BoundsExceeded);
		}
		Ok(Self(v))
	}
}

impl From<VarInt> for u64 {
	fn from(v: VarInt) -> Self {
		v.0
	}
}

impl TryFrom<u64> for VarInt {
	type Error = DecodeError;

	fn try_from(v: u64) -> Result<Self, Self::Error> {
		Self::new(v)
	}
}

impl Encode for VarInt {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		let v = self.0;
		if v < (1 << 6) {
			buf.put_u8(v as u8);
		} else if v < (1 << 14) {
			buf.put_u16((0b01 << 14) | v as u16);
		} else if v < (1 << 30) {
			buf.put_u32((0b10 << 30) | v as u32);
		} else {
			buf.put_u64((0b11 << 62) | v);
		}
	}
}

impl Decode for VarInt {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		if !buf.has_remaining() {
			return Err(DecodeError::Short);
		}

		let first = buf.chunk()[0];
		let tag = first >> 6;
		let len = 1usize << tag;

		if buf.remaining() < len {
			return Err(DecodeError::Short);
		}

		let v = match len {
			1 => (buf.get_u8() & 0x3f) as u64,
			2 => (buf.get_u16() & 0x3fff) as u64,
			4 => (buf.get_u32() & 0x3fff_ffff) as u64,
			8 => buf.get_u64() & 0x3fff_ffff_ffff_ffff,
			_ => unreachable!(),
		};

		Ok(Self(v))
	}
}

/// Helper to write a `u64` as a [`VarInt`].
pub fn encode_varint<B: BufMut>(buf: &mut B, v: u64) {
	VarInt(v).encode(buf)
}

/// Helper to read a `u64` encoded as a [`VarInt`].
pub fn decode_varint<B: Buf>(buf: &mut B) -> Result<u64, DecodeError> {
	VarInt::decode(buf).map(u64::from)
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	#[test]
	fn roundtrip() {
		for v in [0u64, 1, 63, 64, 16383, 16384, (1 << 30) - 1, 1 << 30, VarInt::MAX] {
			let mut buf = BytesMut::new();
			encode_varint(&mut buf, v);
			let mut cursor = &buf[..];
			let out = decode_varint(&mut cursor).unwrap();
			assert_eq!(out, v);
			assert!(cursor.is_empty());
		}
	}
}
