//! # moq-core: the Media over QUIC session engine
//!
//! A client-side library for MoQ publish/subscribe: connect to a relay, announce and consume
//! named broadcasts organized as a `broadcast -> track -> group -> frame` hierarchy.
//!
//! ## API
//!
//! The API is built around producer/consumer pairs, with the hierarchy:
//! - [Origin]: a registry of [Broadcast]s announced under string paths.
//! - [Broadcast]: a collection of [Track]s, produced by a single publisher.
//! - [Track]: a sequence of [Group]s, delivered out of order across groups.
//! - [Group]: a sequence of [Frame]s, delivered in order within the group until it ends or aborts.
//!
//! To publish:
//! - [Session::connect], then [Broadcast::produce] and [Session::publish] to announce it.
//! - [BroadcastProducer::create_track] for each track, [TrackProducer::create_group] or
//!   [TrackProducer::append_group] for each group, [GroupProducer::write_frame] per frame.
//!
//! To subscribe:
//! - [Session::connect], then [Session::origin_consumer] to discover announced paths, or
//!   [Session::consume] to bind directly to a known path.
//! - [BroadcastConsumer::subscribe_track] for a [TrackConsumer], [TrackConsumer::next_group] to
//!   block for the next group, [GroupConsumer::read_frame] to block for the next frame.

mod error;
mod model;
mod session;

pub mod coding;

pub use error::*;
pub use model::*;
pub use session::*;
