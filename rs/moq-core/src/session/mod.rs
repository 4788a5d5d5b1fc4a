//! The session engine: connects to a peer, multiplexes concurrent publish/subscribe traffic over
//! it, and tracks connection state.
//!
//! [`Session::connect`] spins up two long-running tasks over the transport: a [`publisher::Publisher`]
//! that answers the peer's `Announce`/`Subscribe` control streams against our locally-published
//! [`OriginProducer`], and a [`subscriber::Subscriber`] that mirrors the peer's announcements into
//! our own origin and demultiplexes incoming group streams back onto the track that requested
//! them. Both tasks run regardless of [`SessionMode`]; the mode only gates the public
//! `publish`/`consume`/`origin_consumer` surface, so a subscribe-only session still answers an
//! empty `Announce` stream instead of leaving the peer's request dangling.
mod control;
mod publisher;
mod stream;
mod subscriber;

use std::sync::Arc;

use parking_lot::Mutex;

use publisher::Publisher;
use subscriber::Subscriber;

use crate::{BroadcastConsumer, Error, OriginConsumer, OriginProducer};

/// ALPN protocol identifiers this crate's client is willing to negotiate, in preference order.
pub const ALPNS: &[&str] = &["moq-lite"];

/// Which direction(s) of traffic a session is allowed to carry.
///
/// Wire/FFI boundaries observe this as an integer tag: `0 = publish-only`, `1 = subscribe-only`,
/// `2 = both`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
	Publish,
	Subscribe,
	Both,
}

impl SessionMode {
	pub fn can_publish(&self) -> bool {
		matches!(self, Self::Publish | Self::Both)
	}

	pub fn can_subscribe(&self) -> bool {
		matches!(self, Self::Subscribe | Self::Both)
	}
}

impl TryFrom<u8> for SessionMode {
	type Error = Error;

	fn try_from(tag: u8) -> Result<Self, Error> {
		match tag {
			0 => Ok(Self::Publish),
			1 => Ok(Self::Subscribe),
			2 => Ok(Self::Both),
			_ => Err(Error::ModeMismatch),
		}
	}
}

impl From<SessionMode> for u8 {
	fn from(mode: SessionMode) -> Self {
		match mode {
			SessionMode::Publish => 0,
			SessionMode::Subscribe => 1,
			SessionMode::Both => 2,
		}
	}
}

/// The lifecycle state of a [`Session`], per §4.3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
	Connecting,
	Connected,
	Closing,
	Closed,
	Terminated,
}

/// A connected session to a single MoQ peer (typically a relay).
///
/// Cheap to clone; clones share the same underlying transport and registries. Dropping every
/// clone does not close the transport — call [`Session::close`] explicitly.
pub struct Session<S: web_transport_trait::Session> {
	transport: S,
	mode: SessionMode,
	state: Arc<Mutex<SessionState>>,
	publish: OriginProducer,
	subscriber: Subscriber<S>,
}

impl<S: web_transport_trait::Session> Clone for Session<S> {
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			mode: self.mode,
			state: self.state.clone(),
			publish: self.publish.clone(),
			subscriber: self.subscriber.clone(),
		}
	}
}

impl<S: web_transport_trait::Session> Session<S> {
	/// Take ownership of an already-handshaked transport session and start serving it.
	///
	/// The transport handshake itself (TLS, QUIC, WebTransport upgrade) happens before this is
	/// called; see [`crate`] module docs. This only spins up the internal publish/subscribe
	/// pumps and transitions `connecting -> connected`.
	pub async fn connect(transport: S, mode: SessionMode) -> Result<Self, Error> {
		let publish = OriginProducer::new();
		let subscriber = Subscriber::new(transport.clone());
		let state = Arc::new(Mutex::new(SessionState::Connecting));

		let session = Self {
			transport: transport.clone(),
			mode,
			state: state.clone(),
			publish: publish.clone(),
			subscriber: subscriber.clone(),
		};

		*state.lock() = SessionState::Connected;

		let publisher = Publisher::new(transport.clone(), publish);
		let publisher_state = state.clone();
		web_async::spawn(async move {
			if let Err(err) = publisher.run().await {
				tracing::debug!(%err, "publisher task ended");
			}
			Self::terminate(&publisher_state);
		});

		let subscriber_state = state.clone();
		web_async::spawn(async move {
			if let Err(err) = subscriber.run().await {
				tracing::debug!(%err, "subscriber task ended");
			}
			Self::terminate(&subscriber_state);
		});

		Ok(session)
	}

	fn terminate(state: &Mutex<SessionState>) {
		let mut state = state.lock();
		if !matches!(*state, SessionState::Closing | SessionState::Closed) {
			*state = SessionState::Terminated;
		}
	}

	/// Publish a broadcast under `path`. The peer observes `announce(path, active=true)`.
	pub fn publish(&self, path: impl Into<String>, consumable: BroadcastConsumer) -> Result<(), Error> {
		if !self.mode.can_publish() {
			return Err(Error::ModeMismatch);
		}
		if !self.is_connected() {
			return Err(Error::NotConnected);
		}

		let path = path.into();
		if self.publish.consume_broadcast(&path).is_some() {
			return Err(Error::Duplicate);
		}

		self.publish.publish_broadcast(path, consumable)
	}

	/// Bind a [`BroadcastConsumer`] to `path`, local to this session.
	///
	/// Subscribing to a track on the returned consumer before the peer has announced anything
	/// under this path is not an error; the track consumer simply never yields a group until the
	/// peer starts serving it (§4.3).
	pub fn consume(&self, path: &str) -> Result<BroadcastConsumer, Error> {
		if !self.mode.can_subscribe() {
			return Err(Error::ModeMismatch);
		}
		if !self.is_connected() {
			return Err(Error::NotConnected);
		}

		Ok(self.subscriber.consume(path))
	}

	/// A lazy, non-restartable sequence of the peer's `(path, active)` announcements.
	///
	/// At most one should be kept alive per session; further calls return independent cursors
	/// over the same underlying bus (see [`crate::model::origin`]).
	pub fn origin_consumer(&self) -> Result<OriginConsumer, Error> {
		if !self.is_connected() {
			return Err(Error::NotConnected);
		}

		Ok(self.subscriber.origin_consumer())
	}

	pub fn is_connected(&self) -> bool {
		matches!(*self.state.lock(), SessionState::Connected)
	}

	/// Like [`Session::is_connected`], but also `false` after an abrupt transport failure.
	pub fn is_alive(&self) -> bool {
		!matches!(*self.state.lock(), SessionState::Terminated | SessionState::Closed)
	}

	pub fn state(&self) -> SessionState {
		*self.state.lock()
	}

	/// Gracefully close the session. Idempotent: a second call is a no-op.
	pub fn close(&self) -> Result<(), Error> {
		let mut state = self.state.lock();
		if matches!(*state, SessionState::Closed | SessionState::Terminated) {
			return Ok(());
		}

		*state = SessionState::Closing;
		drop(state);

		self.transport.close(0, "");
		*self.state.lock() = SessionState::Closed;

		Ok(())
	}
}
