use std::time::Duration;

use moq_core::SessionMode;
use url::Url;

/// A single track the application wants delivered, gated against the publisher's catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionConfig {
	pub track: String,
	pub priority: u8,
}

impl SubscriptionConfig {
	pub fn new(track: impl Into<String>) -> Self {
		Self { track: track.into(), priority: 0 }
	}

	pub fn with_priority(mut self, priority: u8) -> Self {
		self.priority = priority;
		self
	}
}

/// A track the producer side of a manager publishes on connect, advertised in the catalog
/// alongside the broadcast it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastConfig {
	pub track: String,
	pub priority: u8,
	/// The catalog `type`/`kind` field for this track, e.g. `"video"` or `"audio"`.
	pub kind: String,
}

impl BroadcastConfig {
	pub fn new(track: impl Into<String>) -> Self {
		Self {
			track: track.into(),
			priority: 0,
			kind: "application".to_string(),
		}
	}

	pub fn with_priority(mut self, priority: u8) -> Self {
		self.priority = priority;
		self
	}

	pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
		self.kind = kind.into();
		self
	}
}

/// Bounded reconnection policy. Reconnection is opt-in: a [`ManagerConfig`] with `reconnect: None`
/// gives up permanently after the session first drops.
#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
	/// Minimum delay between reconnect attempts.
	pub min_interval: Duration,
	/// Give up after this many consecutive failed attempts. `None` retries indefinitely.
	pub max_retries: Option<u32>,
}

impl Default for ReconnectPolicy {
	fn default() -> Self {
		Self {
			min_interval: Duration::from_secs(3),
			max_retries: Some(5),
		}
	}
}

/// Configuration for a [`crate::Manager`].
#[derive(Clone, Debug)]
pub struct ManagerConfig {
	pub url: Url,
	pub mode: SessionMode,
	pub client: moq_native::ClientConfig,
	/// `None` disables automatic reconnection entirely.
	pub reconnect: Option<ReconnectPolicy>,
}

impl ManagerConfig {
	pub fn new(url: Url) -> Self {
		Self {
			url,
			mode: SessionMode::Both,
			client: moq_native::ClientConfig::default(),
			reconnect: Some(ReconnectPolicy::default()),
		}
	}
}
