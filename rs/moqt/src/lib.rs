//! # moqt: a Media over QUIC Transport subscriber
//!
//! `moqt` implements the client side of the IETF MoQ Transport draft-07 wire protocol:
//! the WebTransport and SETUP handshake, track subscriptions, and accounting of the objects that arrive.
//!
//! The crate does no I/O of its own. QUIC, TLS, HTTP/3 and WebTransport are provided by the caller through
//! the [Transport] trait, and everything the transport observes is fed back as an [Event].
//!
//! ## API
//!
//! - [Session::new] wraps a [Transport].
//! - [Session::start] processes [Event]s from a channel in the background, or call [Session::handle_event] directly.
//! - [Session::initialize] performs the handshake, bounded by separate WebTransport and SETUP deadlines.
//! - [Session::subscribe] sends SUBSCRIBE and returns a pending [Subscription].
//! - [Session::subscribed] and [Session::subscribe_done] wait for the publisher's replies.
//! - [Session::groups] returns the objects received so far, per group.
//!
//! The wire encoding lives in [coding] and [ietf] for callers that need it directly.

mod config;
mod error;
mod handshake;
mod session;
mod stats;
mod subscriber;
mod transport;


pub mod coding;
pub mod ietf;

pub use config::*;
pub use error::*;
pub use handshake::*;
pub use session::*;
pub use stats::*;
pub use subscriber::*;
pub use transport::*;
