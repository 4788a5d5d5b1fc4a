use crate::coding;

/// Errors that can occur while driving a session, or any handle derived from it.
///
/// Every variant has a stable wire code via [`Error::to_code`] so it can be carried across a
/// QUIC stream reset and reconstructed by the peer with [`Error::from_code`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
	#[error("transport error")]
	Transport,

	#[error("decode error")]
	Decode,

	#[error("unexpected stream type")]
	UnexpectedStream,

	#[error("varint bounds exceeded")]
	BoundsExceeded,

	#[error("duplicate")]
	Duplicate,

	/// Returned when the last handle to a producer/consumer pair is dropped.
	#[error("cancelled")]
	Cancel,

	#[error("timeout")]
	Timeout,

	#[error("not found")]
	NotFound,

	#[error("wrong frame size")]
	WrongSize,

	#[error("protocol violation")]
	ProtocolViolation,

	#[error("unexpected message")]
	UnexpectedMessage,

	/// A session operation was attempted before `connect` completes or after `close`/`terminated`.
	#[error("not connected")]
	NotConnected,

	/// `publish`/`consume`/`origin_consumer` called against a session opened in an incompatible
	/// [`crate::SessionMode`].
	#[error("mode mismatch")]
	ModeMismatch,

	/// The application closed the stream with this code.
	#[error("app code={0}")]
	App(u32),
}

impl Error {
	/// An integer code that is sent over the wire, e.g. as a QUIC stream reset code.
	pub fn to_code(&self) -> u32 {
		match self {
			Self::Cancel => 0,
			Self::Timeout => 1,
			Self::Transport => 2,
			Self::Decode => 3,
			Self::UnexpectedStream => 4,
			Self::BoundsExceeded => 5,
			Self::Duplicate => 6,
			Self::NotFound => 7,
			Self::WrongSize => 8,
			Self::ProtocolViolation => 9,
			Self::UnexpectedMessage => 10,
			Self::NotConnected => 11,
			Self::ModeMismatch => 12,
			Self::App(code) => *code + 64,
		}
	}

	/// Decode an error from a wire code, the inverse of [`Error::to_code`].
	pub fn from_code(code: u32) -> Self {
		match code {
			0 => Self::Cancel,
			1 => Self::Timeout,
			2 => Self::Transport,
			3 => Self::Decode,
			4 => Self::UnexpectedStream,
			5 => Self::BoundsExceeded,
			6 => Self::Duplicate,
			7 => Self::NotFound,
			8 => Self::WrongSize,
			9 => Self::ProtocolViolation,
			10 => Self::UnexpectedMessage,
			11 => Self::NotConnected,
			12 => Self::ModeMismatch,
			code if code >= 64 => Self::App(code - 64),
			_ => Self::ProtocolViolation,
		}
	}

	/// Convert a transport-level error into an [`Error`], decoding a stream reset code if present.
	pub fn from_transport(err: impl web_transport_trait::Error) -> Self {
		if let Some(code) = err.stream_error() {
			return Self::from_code(code);
		}

		tracing::warn!(%err, "transport error");
		Self::Transport
	}
}

impl From<coding::DecodeError> for Error {
	fn from(err: coding::DecodeError) -> Self {
		match err {
			coding::DecodeError::Short => Error::Decode,
			coding::DecodeError::BoundsExceeded => Error::BoundsExceeded,
			coding::DecodeError::InvalidValue => Error::Decode,
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
