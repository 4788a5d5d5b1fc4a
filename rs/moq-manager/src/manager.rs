use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::callbacks::{Callbacks, ClosedCallback, ErrorCallback, FrameCallback, PathCallback, Status, StatusCallback};
use crate::config::{BroadcastConfig, ManagerConfig, SubscriptionConfig};
use crate::error::{Error, ResultCode};
use crate::runtime::Runtime;
use crate::worker::{self, WorkerHandle};

pub(crate) type ConcreteSession = moq_core::Session<web_transport_quinn::Session>;

type Key = (String, String);

pub(crate) struct Inner {
	pub runtime: Runtime,
	config: ManagerConfig,
	state: Mutex<State>,
}

struct State {
	status: Status,
	session: Option<ConcreteSession>,
	/// Set by [`Manager::close`] so a session drop racing with it doesn't trigger a reconnect.
	closing: bool,
	callbacks: Callbacks,
	/// Tracks the application wants, per broadcast path.
	requested: HashMap<String, HashMap<String, SubscriptionConfig>>,
	/// The most recent catalog seen for each broadcast path.
	available: HashMap<String, moq_catalog::Catalog>,
	/// Running workers for the tracks currently in `requested ∩ available`.
	workers: HashMap<Key, WorkerHandle>,
	/// Paths with a running catalog consumer, so reconnects and new subscriptions don't duplicate it.
	catalog_tasks: Vec<String>,
	/// Broadcasts the producer side publishes on every (re)connect, per path.
	broadcasts: HashMap<String, HashMap<String, BroadcastConfig>>,
	/// Broadcasts currently published against a live session, keyed by path.
	publishing: HashMap<String, PublishedBroadcast>,
	/// The most recently reported error, for callers that poll instead of installing a callback.
	last_error: Option<String>,
}

/// A broadcast this manager is actively publishing: its producer, its catalog (kept in sync with
/// the tracks created so far), and the track producers created for it.
struct PublishedBroadcast {
	broadcast: moq_core::BroadcastProducer,
	catalog: moq_catalog::CatalogProducer,
	tracks: HashMap<String, moq_core::TrackProducer>,
}

impl Default for State {
	fn default() -> Self {
		Self {
			status: Status::Closed,
			session: None,
			closing: false,
			callbacks: Callbacks::default(),
			requested: HashMap::new(),
			available: HashMap::new(),
			workers: HashMap::new(),
			catalog_tasks: Vec::new(),
			broadcasts: HashMap::new(),
			publishing: HashMap::new(),
			last_error: None,
		}
	}
}

impl Inner {
	fn lock(&self) -> parking_lot::MutexGuard<'_, State> {
		self.state.lock()
	}

	pub fn is_active(&self, path: &str, track: &str) -> bool {
		let state = self.lock();
		state.requested.get(path).is_some_and(|tracks| tracks.contains_key(track))
			&& state.available.get(path).is_some_and(|catalog| catalog.get(track).is_some())
	}

	pub fn subscription_priority(&self, path: &str, track: &str) -> Option<u8> {
		self.lock().requested.get(path)?.get(track).map(|s| s.priority)
	}

	fn set_status(&self, status: Status) {
		let callback = {
			let mut state = self.lock();
			state.status = status;
			state.callbacks.on_status.clone()
		};
		if let Some(callback) = callback {
			callback(status);
		}
	}

	pub fn invoke_on_error(&self, err: Error) {
		tracing::warn!(%err, "manager error");
		let callback = {
			let mut state = self.lock();
			state.last_error = Some(err.to_string());
			state.callbacks.on_error.clone()
		};
		if let Some(callback) = callback {
			callback(&err);
		}
	}

	pub fn invoke_on_frame(&self, path: &str, track: &str, payload: Bytes) {
		let callback = self.lock().callbacks.on_frame.clone();
		if let Some(callback) = callback {
			callback(path, track, payload);
		}
	}

	fn invoke_on_broadcast_announced(&self, path: &str) {
		let callback = self.lock().callbacks.on_broadcast_announced.clone();
		if let Some(callback) = callback {
			callback(path);
		}
	}

	fn invoke_on_broadcast_cancelled(&self, path: &str) {
		let callback = self.lock().callbacks.on_broadcast_cancelled.clone();
		if let Some(callback) = callback {
			callback(path);
		}
	}

	fn invoke_on_connection_closed(&self) {
		let callback = self.lock().callbacks.on_connection_closed.clone();
		if let Some(callback) = callback {
			callback();
		}
	}

	/// Recompute active workers for `path` against the latest requested/available snapshot.
	fn reconcile_path(self: &Arc<Self>, session: &ConcreteSession, path: &str) {
		let wanted: Vec<String> = {
			let state = self.lock();
			let requested = state.requested.get(path);
			let available = state.available.get(path);
			match (requested, available) {
				(Some(requested), Some(available)) => requested
					.keys()
					.filter(|track| available.get(track).is_some())
					.cloned()
					.collect(),
				_ => Vec::new(),
			}
		};

		let mut state = self.lock();

		state.workers.retain(|(worker_path, track), _| {
			worker_path != path || wanted.contains(track)
		});

		for track in wanted {
			let key = (path.to_string(), track.clone());
			if state.workers.contains_key(&key) {
				continue;
			}
			let handle = worker::spawn(self.clone(), session.clone(), path.to_string(), track);
			state.workers.insert(key, handle);
		}
	}

	fn reconcile_all(self: &Arc<Self>, session: &ConcreteSession) {
		let paths: Vec<String> = self.lock().requested.keys().cloned().collect();
		for path in paths {
			self.reconcile_path(session, &path);
		}
	}

	fn ensure_catalog_task(self: &Arc<Self>, session: &ConcreteSession, path: &str) {
		{
			let mut state = self.lock();
			if state.catalog_tasks.iter().any(|p| p == path) {
				return;
			}
			state.catalog_tasks.push(path.to_string());
		}

		let inner = self.clone();
		let session = session.clone();
		let path = path.to_string();

		self.runtime.spawn(async move {
			let broadcast = match session.consume(&path) {
				Ok(broadcast) => broadcast,
				Err(err) => {
					inner.invoke_on_error(err.into());
					return;
				}
			};
			let mut consumer = moq_catalog::CatalogConsumer::new(broadcast);

			loop {
				match consumer.next().await {
					Ok(Some(catalog)) => {
						inner.lock().available.insert(path.clone(), catalog);
						inner.reconcile_path(&session, &path);
					}
					Ok(None) => {
						inner.lock().available.remove(&path);
						inner.reconcile_path(&session, &path);
						break;
					}
					Err(err) => {
						inner.invoke_on_error(err.into());
						break;
					}
				}
			}

			inner.lock().catalog_tasks.retain(|p| p != &path);
		});
	}

	fn stop_all_workers(&self) {
		let mut state = self.lock();
		state.workers.clear();
		state.catalog_tasks.clear();
		state.available.clear();
		state.publishing.clear();
	}

	/// Publish every configured broadcast against a freshly (re)connected session: create a
	/// [`moq_core::BroadcastProducer`] and [`moq_catalog::CatalogProducer`] the first time a path
	/// is seen, then create any track that isn't published yet and record it in the catalog.
	fn publish_all(self: &Arc<Self>, session: &ConcreteSession) {
		let paths: Vec<String> = self.lock().broadcasts.keys().cloned().collect();
		for path in paths {
			self.publish_broadcast(session, &path);
		}
	}

	fn publish_broadcast(self: &Arc<Self>, session: &ConcreteSession, path: &str) {
		let configs = self.lock().broadcasts.get(path).cloned();
		let configs = match configs {
			Some(configs) if !configs.is_empty() => configs,
			_ => return,
		};

		let mut state = self.lock();

		if !state.publishing.contains_key(path) {
			let broadcast = moq_core::BroadcastProducer::new();
			let catalog = match moq_catalog::CatalogProducer::new(&broadcast) {
				Ok(catalog) => catalog,
				Err(err) => {
					drop(state);
					self.invoke_on_error(err.into());
					return;
				}
			};

			if let Err(err) = session.publish(path, broadcast.consume()) {
				drop(state);
				self.invoke_on_error(err.into());
				return;
			}

			state.publishing.insert(
				path.to_string(),
				PublishedBroadcast {
					broadcast,
					catalog,
					tracks: HashMap::new(),
				},
			);
		}

		let mut track_error = None;
		let mut created = Vec::new();

		{
			let published = state.publishing.get_mut(path).expect("just inserted above");

			for (name, config) in &configs {
				if published.tracks.contains_key(name) {
					continue;
				}

				let track = moq_core::Track::new(name.clone()).with_priority(config.priority);
				match published.broadcast.create_track(track) {
					Ok(producer) => {
						published.tracks.insert(name.clone(), producer);
						created.push(config.clone());
					}
					Err(err) => {
						track_error = Some(err);
						break;
					}
				}
			}

			if !created.is_empty() {
				let mut guard = published.catalog.update();
				for config in created {
					guard.tracks.insert(
						config.track.clone(),
						moq_catalog::AvailableTrack {
							name: config.track,
							kind: config.kind,
							priority: config.priority,
						},
					);
				}
			}
		}

		drop(state);

		if let Some(err) = track_error {
			self.invoke_on_error(err.into());
		}
	}
}

/// Supervises a single MoQ session: connects (and reconnects, per [`crate::ReconnectPolicy`]),
/// mirrors the peer's catalog for every subscribed broadcast, and keeps exactly one worker
/// running per track in `requested ∩ available`.
///
/// Cheap to clone; every clone shares the same background thread and state.
#[derive(Clone)]
pub struct Manager {
	inner: Arc<Inner>,
}

impl Manager {
	pub fn new(config: ManagerConfig) -> Self {
		let inner = Arc::new(Inner {
			runtime: Runtime::new("moq-manager"),
			config,
			state: Mutex::new(State::default()),
		});
		Self { inner }
	}

	/// Start connecting in the background. Returns immediately; use [`Manager::set_status_callback`]
	/// to observe progress. A second call while already connected or connecting is a no-op.
	pub fn connect(&self) -> ResultCode {
		{
			let mut state = self.inner.lock();
			if !matches!(state.status, Status::Closed) {
				return ResultCode::AlreadyConnected;
			}
			state.closing = false;
		}

		let inner = self.inner.clone();
		self.inner.runtime.spawn(Self::connect_loop(inner));
		ResultCode::Success
	}

	async fn connect_loop(inner: Arc<Inner>) {
		let mut attempt: u32 = 0;

		loop {
			inner.set_status(Status::Connecting);

			match Self::try_connect(&inner).await {
				Ok(session) => {
					attempt = 0;
					inner.lock().session = Some(session.clone());
					inner.set_status(Status::Connected);

					Self::spawn_announce_task(inner.clone(), session.clone());

					inner.publish_all(&session);

					let paths: Vec<String> = inner.lock().requested.keys().cloned().collect();
					for path in &paths {
						inner.ensure_catalog_task(&session, path);
					}
					inner.reconcile_all(&session);

					while session.is_alive() {
						tokio::time::sleep(Duration::from_millis(250)).await;
					}

					inner.lock().session = None;
					inner.stop_all_workers();
					inner.invoke_on_connection_closed();
				}
				Err(err) => {
					inner.invoke_on_error(err);
				}
			}

			if inner.lock().closing {
				inner.set_status(Status::Closed);
				return;
			}

			let policy = match &inner.config.reconnect {
				Some(policy) => policy.clone(),
				None => {
					inner.set_status(Status::Closed);
					return;
				}
			};

			attempt += 1;
			if let Some(max) = policy.max_retries {
				if attempt > max {
					tracing::warn!(attempt, "giving up after exceeding max reconnect attempts");
					inner.set_status(Status::Closed);
					return;
				}
			}

			inner.set_status(Status::Reconnecting);
			tokio::time::sleep(policy.min_interval).await;
		}
	}

	async fn try_connect(inner: &Inner) -> crate::Result<ConcreteSession> {
		let client = inner.config.client.clone().init()?;
		let session = client.connect(inner.config.url.clone(), inner.config.mode).await?;
		Ok(session)
	}

	fn spawn_announce_task(inner: Arc<Inner>, session: ConcreteSession) {
		inner.runtime.spawn(async move {
			let mut origin = match session.origin_consumer() {
				Ok(origin) => origin,
				Err(err) => {
					inner.invoke_on_error(err.into());
					return;
				}
			};

			while let Some((path, active)) = origin.announced().await {
				if active {
					inner.invoke_on_broadcast_announced(&path);
				} else {
					inner.invoke_on_broadcast_cancelled(&path);
				}
			}
		});
	}

	/// Add `track` to the requested set for `path`. Has no visible effect until the publisher's
	/// catalog for `path` lists a matching track.
	pub fn subscribe(&self, path: impl Into<String>, track: SubscriptionConfig) -> ResultCode {
		if track.track.is_empty() {
			return ResultCode::InvalidParameter;
		}

		let path = path.into();
		let session = {
			let mut state = self.inner.lock();
			state.requested.entry(path.clone()).or_default().insert(track.track.clone(), track);
			state.session.clone()
		};

		if let Some(session) = session {
			self.inner.ensure_catalog_task(&session, &path);
			self.inner.reconcile_path(&session, &path);
		}

		ResultCode::Success
	}

	/// Remove `track` from the requested set for `path`, stopping its worker if running.
	pub fn unsubscribe(&self, path: &str, track: &str) -> ResultCode {
		let session = {
			let mut state = self.inner.lock();
			if let Some(tracks) = state.requested.get_mut(path) {
				tracks.remove(track);
			}
			state.session.clone()
		};

		if let Some(session) = session {
			self.inner.reconcile_path(&session, path);
		}

		ResultCode::Success
	}

	/// Add `track` to the set of tracks published under `path`, creating the broadcast the first
	/// time a path is used. Has effect immediately if already connected; otherwise the broadcast
	/// is published on the next successful [`Manager::connect`].
	pub fn add_broadcast(&self, path: impl Into<String>, track: BroadcastConfig) -> ResultCode {
		if track.track.is_empty() {
			return ResultCode::InvalidParameter;
		}

		let path = path.into();
		let session = {
			let mut state = self.inner.lock();
			state.broadcasts.entry(path.clone()).or_default().insert(track.track.clone(), track);
			state.session.clone()
		};

		if let Some(session) = session {
			self.inner.publish_broadcast(&session, &path);
		}

		ResultCode::Success
	}

	/// Write `payload` as a single-frame group on `track` of the broadcast published at `path`.
	///
	/// Returns [`ResultCode::NotConnected`] if `path` isn't currently published, or
	/// [`ResultCode::InvalidParameter`] if `track` wasn't registered with [`Manager::add_broadcast`].
	pub fn publish_frame(&self, path: &str, track: &str, payload: Bytes) -> ResultCode {
		let mut state = self.inner.lock();

		let Some(published) = state.publishing.get_mut(path) else {
			return ResultCode::NotConnected;
		};
		let Some(producer) = published.tracks.get_mut(track) else {
			return ResultCode::InvalidParameter;
		};

		match producer.append_group() {
			Ok(mut group) => {
				let _ = group.write_frame(payload);
				let _ = group.close();
				ResultCode::Success
			}
			Err(_) => ResultCode::Internal,
		}
	}

	pub fn set_error_callback(&self, callback: ErrorCallback) {
		self.inner.lock().callbacks.on_error = Some(callback);
	}

	pub fn set_status_callback(&self, callback: StatusCallback) {
		self.inner.lock().callbacks.on_status = Some(callback);
	}

	pub fn set_frame_callback(&self, callback: FrameCallback) {
		self.inner.lock().callbacks.on_frame = Some(callback);
	}

	pub fn on_broadcast_announced(&self, callback: PathCallback) {
		self.inner.lock().callbacks.on_broadcast_announced = Some(callback);
	}

	pub fn on_broadcast_cancelled(&self, callback: PathCallback) {
		self.inner.lock().callbacks.on_broadcast_cancelled = Some(callback);
	}

	pub fn on_connection_closed(&self, callback: ClosedCallback) {
		self.inner.lock().callbacks.on_connection_closed = Some(callback);
	}

	pub fn status(&self) -> Status {
		self.inner.lock().status
	}

	/// `true` once a session is up and at least the announce loop is running.
	pub fn is_running(&self) -> bool {
		matches!(self.status(), Status::Connected)
	}

	/// The most recently reported error, for callers that poll instead of installing
	/// [`Manager::set_error_callback`]. Cleared only by overwriting with a newer error;
	/// a successful reconnect does not reset it.
	pub fn last_error(&self) -> Option<String> {
		self.inner.lock().last_error.clone()
	}

	/// Gracefully close the session and stop reconnecting. Idempotent.
	pub fn close(&self) -> ResultCode {
		let session = {
			let mut state = self.inner.lock();
			state.closing = true;
			state.status = Status::Closed;
			state.session.take()
		};

		self.inner.stop_all_workers();

		if let Some(session) = session {
			if session.close().is_err() {
				return ResultCode::Internal;
			}
		}

		ResultCode::Success
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use url::Url;

	fn config() -> ManagerConfig {
		ManagerConfig::new(Url::parse("https://localhost:4443").unwrap())
	}

	#[test]
	fn starts_closed_and_not_running() {
		let manager = Manager::new(config());
		assert_eq!(manager.status(), Status::Closed);
		assert!(!manager.is_running());
		assert_eq!(manager.last_error(), None);
	}

	#[test]
	fn subscribe_rejects_empty_track_name() {
		let manager = Manager::new(config());
		let code = manager.subscribe("room/alice", SubscriptionConfig::new(""));
		assert_eq!(code, ResultCode::InvalidParameter);
	}

	#[test]
	fn add_broadcast_rejects_empty_track_name() {
		let manager = Manager::new(config());
		let code = manager.add_broadcast("room/alice", BroadcastConfig::new(""));
		assert_eq!(code, ResultCode::InvalidParameter);
	}

	#[test]
	fn subscribe_before_connect_is_recorded_but_inactive() {
		let manager = Manager::new(config());
		let code = manager.subscribe("room/alice", SubscriptionConfig::new("video/hd"));
		assert_eq!(code, ResultCode::Success);

		// No session yet, so the catalog never arrives and the track can't be active.
		assert!(!manager.inner.is_active("room/alice", "video/hd"));
	}

	#[test]
	fn publish_frame_before_publishing_is_not_connected() {
		let manager = Manager::new(config());
		let code = manager.publish_frame("room/alice", "video/hd", Bytes::from("x"));
		assert_eq!(code, ResultCode::NotConnected);
	}

	#[test]
	fn close_before_connect_is_idempotent() {
		let manager = Manager::new(config());
		assert_eq!(manager.close(), ResultCode::Success);
		assert_eq!(manager.close(), ResultCode::Success);
		assert_eq!(manager.status(), Status::Closed);
	}

	#[test]
	fn unsubscribe_unknown_track_is_a_no_op() {
		let manager = Manager::new(config());
		assert_eq!(manager.unsubscribe("room/alice", "video/hd"), ResultCode::Success);
	}
}
