//! A dedicated background OS thread running a single-threaded tokio runtime.
//!
//! The manager owns its connect loop, catalog consumers, and per-track workers independent of
//! whatever async runtime (if any) the embedding application uses; every manager instance gets
//! its own thread so its internal tasks keep running even if the caller never polls a future.
use std::future::Future;

pub(crate) struct Runtime {
	handle: tokio::runtime::Handle,
	shutdown: Option<tokio::sync::oneshot::Sender<()>>,
	thread: Option<std::thread::JoinHandle<()>>,
}

impl Runtime {
	pub fn new(name: &str) -> Self {
		let (ready_tx, ready_rx) = std::sync::mpsc::channel();
		let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

		let thread = std::thread::Builder::new()
			.name(name.to_string())
			.spawn(move || {
				let runtime = tokio::runtime::Builder::new_current_thread()
					.enable_all()
					.build()
					.expect("failed to build manager runtime");
				let _ = ready_tx.send(runtime.handle().clone());
				runtime.block_on(async {
					let _ = shutdown_rx.await;
				});
			})
			.expect("failed to spawn manager thread");

		let handle = ready_rx.recv().expect("manager runtime thread panicked during startup");

		Self {
			handle,
			shutdown: Some(shutdown_tx),
			thread: Some(thread),
		}
	}

	pub fn spawn<F>(&self, fut: F) -> tokio::task::JoinHandle<()>
	where
		F: Future<Output = ()> + Send + 'static,
	{
		self.handle.spawn(fut)
	}
}

impl Drop for Runtime {
	fn drop(&mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}
		if let Some(thread) = self.thread.take() {
			let _ = thread.join();
		}
	}
}
