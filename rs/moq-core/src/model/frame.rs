use bytes::Bytes;

/// A single unit of media, delivered whole: a video frame, a key frame, a packet of audio
/// samples. Frames within a [`crate::GroupConsumer`] are delivered in order; frames are never
/// split across groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
	pub payload: Bytes,
}

impl Frame {
	pub fn new(payload: impl Into<Bytes>) -> Self {
		Self { payload: payload.into() }
	}
}

impl<B: Into<Bytes>> From<B> for Frame {
	fn from(payload: B) -> Self {
		Self::new(payload)
	}
}
