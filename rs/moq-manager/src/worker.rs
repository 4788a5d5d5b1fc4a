//! Per-track worker: holds a subscription open and pumps frames to the application callback,
//! retrying on transient failure for as long as the track stays in the requested ∩ available set.
use std::sync::Arc;
use std::time::Duration;

use crate::manager::{ConcreteSession, Inner};

/// Delay between retries of a single worker after a transient read failure.
const RETRY_DELAY: Duration = Duration::from_secs(2);

pub(crate) struct WorkerHandle {
	task: tokio::task::JoinHandle<()>,
}

impl Drop for WorkerHandle {
	fn drop(&mut self) {
		self.task.abort();
	}
}

pub(crate) fn spawn(inner: Arc<Inner>, session: ConcreteSession, path: String, track: String) -> WorkerHandle {
	let task = inner.runtime.spawn(run(inner, session, path, track));
	WorkerHandle { task }
}

async fn run(inner: Arc<Inner>, session: ConcreteSession, path: String, track: String) {
	loop {
		if let Err(err) = pump(&inner, &session, &path, &track).await {
			inner.invoke_on_error(err);
		}

		if !inner.is_active(&path, &track) {
			return;
		}

		tokio::time::sleep(RETRY_DELAY).await;
	}
}

async fn pump(inner: &Arc<Inner>, session: &ConcreteSession, path: &str, track: &str) -> crate::Result<()> {
	let priority = inner.subscription_priority(path, track).unwrap_or(0);

	let broadcast = session.consume(path)?;
	let config = moq_core::Track::new(track).with_priority(priority);
	let mut track_consumer = broadcast.subscribe_track(config)?;

	loop {
		let Some(mut group) = track_consumer.next_group().await? else {
			return Ok(());
		};

		loop {
			match group.read_frame().await? {
				Some(frame) => inner.invoke_on_frame(path, track, frame.payload),
				None => break,
			}
		}
	}
}
