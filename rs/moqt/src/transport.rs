//! The transport collaborator.
//!
//! QUIC, TLS, HTTP/3 framing and WebTransport negotiation live outside this crate.
//! The session drives a [Transport] for outgoing operations and is fed [Event]s for everything inbound.
//! WebTransport stream framing is removed by the transport before data is delivered.

use std::fmt;

use bytes::Bytes;

/// A transport-assigned stream identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Debug for StreamId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl fmt::Display for StreamId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Something the transport observed, delivered to the session in arrival order.
#[derive(Clone, Debug)]
pub enum Event {
	/// Response headers for a request stream.
	Headers {
		stream_id: StreamId,
		headers: Vec<(String, String)>,
	},

	/// Bytes received on a stream, with `fin` set on the final delivery.
	StreamData { stream_id: StreamId, data: Bytes, fin: bool },

	/// The connection was closed.
	ConnectionError { code: u64, reason: String },
}

/// Outgoing operations the session needs from the transport.
///
/// Writes are enqueued and only transmitted after [Transport::flush].
pub trait Transport: Send + 'static {
	type Error: std::error::Error + Send + Sync + 'static;

	/// Open a request stream and send the given headers, returning the stream id.
	fn send_request(&mut self, headers: &[(String, String)]) -> Result<StreamId, Self::Error>;

	/// Open a bidirectional stream scoped to the given WebTransport session.
	fn open_bi(&mut self, session: StreamId) -> Result<StreamId, Self::Error>;

	/// Enqueue bytes on a stream.
	fn write(&mut self, stream: StreamId, data: Bytes, fin: bool) -> Result<(), Self::Error>;

	/// Transmit anything enqueued.
	fn flush(&mut self) -> Result<(), Self::Error>;
}
