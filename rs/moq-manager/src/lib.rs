//! # moq-manager
//!
//! A supervisor that sits on top of [`moq_core::Session`] for long-lived client applications:
//! drives reconnection under a bounded retry policy, mirrors a publisher's catalog for every
//! broadcast path the application has subscribed to, and keeps exactly one worker running per
//! track that is both requested and currently listed in that catalog.
//!
//! [`Manager`] owns a dedicated background OS thread (see [`runtime`]) so its connect loop,
//! catalog consumers, and workers all keep running independent of whatever async runtime (if
//! any) the embedding application drives itself.
mod callbacks;
mod config;
mod error;
mod manager;
mod runtime;
mod worker;

pub use callbacks::{ClosedCallback, ErrorCallback, FrameCallback, PathCallback, Status, StatusCallback};
pub use config::{BroadcastConfig, ManagerConfig, ReconnectPolicy, SubscriptionConfig};
pub use error::{Error, Result, ResultCode};
pub use manager::Manager;
