use std::sync::Arc;

use bytes::Bytes;

use crate::Error;

/// Connectivity status reported to [`Callbacks::on_status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
	Connecting,
	Connected,
	Reconnecting,
	Closed,
}

pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;
pub type StatusCallback = Arc<dyn Fn(Status) + Send + Sync>;
pub type PathCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type ClosedCallback = Arc<dyn Fn() + Send + Sync>;
pub type FrameCallback = Arc<dyn Fn(&str, &str, Bytes) + Send + Sync>;

/// The hook set an application can install on a [`crate::Manager`]. Every hook is optional and
/// runs on the manager's own background thread, never on the caller's.
#[derive(Clone, Default)]
pub(crate) struct Callbacks {
	pub on_error: Option<ErrorCallback>,
	pub on_status: Option<StatusCallback>,
	pub on_broadcast_announced: Option<PathCallback>,
	pub on_broadcast_cancelled: Option<PathCallback>,
	pub on_connection_closed: Option<ClosedCallback>,
	pub on_frame: Option<FrameCallback>,
}
