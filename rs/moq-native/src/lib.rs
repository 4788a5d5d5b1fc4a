//! Helper library for native MoQ applications.
//!
//! Establishes MoQ sessions over raw QUIC using [quinn](https://crates.io/crates/quinn) and
//! [web-transport-quinn](https://crates.io/crates/web-transport-quinn), and performs the
//! one-time process-wide setup (logging) that every native binary needs.
//!
//! See [`Client`] and [`ClientConfig`] for connecting to a relay.

mod client;
mod log;

pub use client::*;
pub use log::*;

// Re-export these crates.
pub use moq_core;
pub use rustls;
pub use web_transport_quinn;
