//! The producer/consumer split underlying every handle in [`crate::model`].
//!
//! A [`Producer<T>`] owns the canonical value and can [`Producer::modify`] it; any number of
//! [`Consumer<T>`] handles can be cloned off of it and will each independently track how much of
//! the state they've observed. The pair is backed by a [`tokio::sync::watch`] channel so clones
//! fan out for free instead of requiring a broadcast channel per reader.
use std::{
	fmt,
	future::Future,
	ops::Deref,
	sync::{
		atomic::{self, AtomicUsize},
		Arc,
	},
};

use tokio::sync::watch;

use crate::Error;

#[derive(Default)]
struct State<T> {
	value: T,
	closed: Option<Result<(), Error>>,
}

/// The writable half of a producer/consumer pair.
///
/// Closing is terminal: once `closed` is `Some`, no further modification succeeds. Dropping the
/// last clone of a `Producer` implicitly closes it with [`Error::Cancel`] unless it was already
/// closed explicitly.
pub struct Producer<T> {
	state: watch::Sender<State<T>>,
	active: Arc<AtomicUsize>,
}

impl<T> Producer<T> {
	pub fn new(value: T) -> Self {
		Self {
			state: watch::Sender::new(State { value, closed: None }),
			active: Arc::new(AtomicUsize::new(1)),
		}
	}

	pub fn consume(&self) -> Consumer<T> {
		Consumer::new(self.state.subscribe())
	}

	/// Close cleanly. Idempotent: closing twice returns the first close's result.
	pub fn close(&self) -> Result<(), Error> {
		let mut res = Ok(());

		self.state.send_if_modified(|state| {
			if let Some(Err(err)) = state.closed.clone() {
				res = Err(err);
				return false;
			}

			state.closed = Some(Ok(()));
			true
		});

		res
	}

	/// Close with an error, propagated to every consumer.
	pub fn abort(&self, err: Error) -> Result<(), Error> {
		let mut res = Ok(());

		self.state.send_if_modified(|state| {
			if let Some(Err(closed)) = state.closed.clone() {
				res = Err(closed);
				return false;
			}

			state.closed = Some(Err(err));
			true
		});

		res
	}

	pub fn modify<F, R>(&self, modify: F) -> Result<R, Error>
	where
		F: FnOnce(&mut T) -> R,
	{
		let mut result = Err(Error::Cancel);

		self.state.send_if_modified(|state| {
			if let Some(Err(err)) = state.closed.clone() {
				result = Err(err);
				false
			} else {
				result = Ok(modify(&mut state.value));
				true
			}
		});

		result
	}

	pub fn borrow(&self) -> Ref<'_, T> {
		Ref {
			inner: self.state.borrow(),
		}
	}

	/// Resolves once there are no more consumers for this producer.
	pub fn unused(&self) -> impl Future<Output = ()> {
		let state = self.state.clone();
		async move {
			let _ = state.closed().await;
		}
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.state.same_channel(&other.state)
	}
}

impl<T: Default> Default for Producer<T> {
	fn default() -> Self {
		Self::new(Default::default())
	}
}

impl<T> Clone for Producer<T> {
	fn clone(&self) -> Self {
		self.active.fetch_add(1, atomic::Ordering::Relaxed);
		Self {
			state: self.state.clone(),
			active: self.active.clone(),
		}
	}
}

impl<T> Drop for Producer<T> {
	fn drop(&mut self) {
		let active = self.active.fetch_sub(1, atomic::Ordering::Release);
		if active != 1 {
			return;
		}

		atomic::fence(atomic::Ordering::Acquire);

		self.state.send_if_modified(|state| {
			if state.closed.is_some() {
				return false;
			}

			state.closed = Some(Err(Error::Cancel));
			true
		});
	}
}

impl<T: fmt::Debug> fmt::Debug for Producer<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("Producer")
			.field("value", &state.value)
			.field("closed", &state.closed)
			.finish()
	}
}

/// The readable half of a producer/consumer pair. Clone freely; each clone tracks its own cursor
/// into the state, if the underlying `T` is itself something with an incremental read API.
pub struct Consumer<T> {
	inner: watch::Receiver<State<T>>,
}

impl<T> Consumer<T> {
	fn new(inner: watch::Receiver<State<T>>) -> Self {
		Self { inner }
	}

	/// Resolves with the producer's terminal result once it closes.
	pub fn closed(&self) -> impl Future<Output = Result<(), Error>> {
		let mut inner = self.inner.clone();
		async move {
			match inner.wait_for(|state| state.closed.is_some()).await {
				Ok(state) => state.closed.clone().unwrap(),
				Err(_) => unreachable!("producer can't be dropped without setting closed"),
			}
		}
	}

	/// Waits until `f` matches the current value, or the producer closes.
	pub async fn wait_for(&mut self, mut f: impl FnMut(&T) -> bool) -> Result<Ref<'_, T>, Error> {
		let mut matched = false;

		let state = self
			.inner
			.wait_for(|state| {
				matched = f(&state.value);
				matched || state.closed.is_some()
			})
			.await
			.expect("sender can't be dropped without setting closed");

		if !matched {
			if let Some(Err(err)) = state.closed.clone() {
				return Err(err);
			}
		}

		Ok(Ref { inner: state })
	}

	pub fn borrow(&self) -> Ref<'_, T> {
		Ref {
			inner: self.inner.borrow(),
		}
	}

	pub fn is_clone(&self, other: &Self) -> bool {
		self.inner.same_channel(&other.inner)
	}
}

impl<T: fmt::Debug> fmt::Debug for Consumer<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.borrow();
		f.debug_struct("Consumer")
			.field("value", &inner.value)
			.field("closed", &inner.closed)
			.finish()
	}
}

impl<T> Clone for Consumer<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

pub struct Ref<'a, T> {
	inner: tokio::sync::watch::Ref<'a, State<T>>,
}

impl<'a, T> Deref for Ref<'a, T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		&self.inner.value
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn close_is_idempotent() {
		let producer = Producer::new(0u32);
		assert!(producer.close().is_ok());
		assert!(producer.close().is_ok());
	}

	#[tokio::test]
	async fn abort_propagates_to_consumer() {
		let producer = Producer::new(0u32);
		let consumer = producer.consume();
		producer.abort(Error::NotFound).unwrap();
		assert_eq!(consumer.closed().await, Err(Error::NotFound));
	}

	#[tokio::test]
	async fn drop_closes_with_cancel() {
		let producer = Producer::new(0u32);
		let consumer = producer.consume();
		drop(producer);
		assert_eq!(consumer.closed().await, Err(Error::Cancel));
	}

	#[tokio::test]
	async fn unused_resolves_after_consumers_drop() {
		let producer = Producer::new(0u32);
		let consumer = producer.consume();
		assert!(futures::FutureExt::now_or_never(producer.unused()).is_none());
		drop(consumer);
		assert!(futures::FutureExt::now_or_never(producer.unused()).is_some());
	}
}
