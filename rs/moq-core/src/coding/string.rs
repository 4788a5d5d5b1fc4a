use bytes::{Buf, BufMut};

use super::{decode_varint, encode_varint, Decode, DecodeError, Encode};

impl Encode for str {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		encode_varint(buf, self.len() as u64);
		buf.put_slice(self.as_bytes());
	}
}

impl Encode for String {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		self.as_str().encode(buf)
	}
}

impl Decode for String {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let mut cursor = std::io::Cursor::new(buf.chunk());
		let len = decode_varint(&mut cursor)? as usize;
		let header = cursor.position() as usize;

		if buf.remaining() < header + len {
			return Err(DecodeError::Short);
		}

		buf.advance(header);
		let mut data = vec![0u8; len];
		buf.copy_to_slice(&mut data);

		String::from_utf8(data).map_err(|_| DecodeError::InvalidValue)
	}
}

impl Encode for bytes::Bytes {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		encode_varint(buf, self.len() as u64);
		buf.put_slice(self);
	}
}

impl Decode for bytes::Bytes {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let mut cursor = std::io::Cursor::new(buf.chunk());
		let len = decode_varint(&mut cursor)? as usize;
		let header = cursor.position() as usize;

		if buf.remaining() < header + len {
			return Err(DecodeError::Short);
		}

		buf.advance(header);
		Ok(buf.copy_to_bytes(len))
	}
}

impl Encode for bool {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		encode_varint(buf, *self as u64)
	}
}

impl Decode for bool {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		match decode_varint(buf)? {
			0 => Ok(false),
			1 => Ok(true),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}

impl Encode for u64 {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		encode_varint(buf, *self)
	}
}

impl Decode for u64 {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		decode_varint(buf)
	}
}

impl Encode for u8 {
	fn encode<B: BufMut>(&self, buf: &mut B) {
		encode_varint(buf, *self as u64)
	}
}

impl Decode for u8 {
	fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let v = decode_varint(buf)?;
		u8::try_from(v).map_err(|_| DecodeError::BoundsExceeded)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::BytesMut;

	#[test]
	fn string_roundtrip() {
		let s = "hello moq".to_string();
		let mut buf = BytesMut::new();
		s.encode(&mut buf);

		let mut cursor = &buf[..];
		let out = String::decode(&mut cursor).unwrap();
		assert_eq!(out, s);
	}

	#[test]
	fn string_short() {
		let mut buf = BytesMut::new();
		encode_varint(&mut buf, 5);
		buf.extend_from_slice(b"hi");

		let mut cursor = &buf[..];
		assert_eq!(String::decode(&mut cursor), Err(DecodeError::Short));
	}
}
