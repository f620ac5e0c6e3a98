use std::sync::Arc;

use crate::{
	coding::{DecodeError, EncodeError, Version},
	HandshakeState,
};

/// An error that can be shared between threads, used to wrap transport errors.
pub trait SendSyncError: std::error::Error + Send + Sync {}

impl<T> SendSyncError for T where T: std::error::Error + Send + Sync {}

/// The handshake stage or wait that expired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
	WebTransport,
	Setup,
	Subscribe,
	SubscribeDone,
}

impl std::fmt::Display for Stage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::WebTransport => write!(f, "webtransport connect"),
			Self::Setup => write!(f, "setup"),
			Self::Subscribe => write!(f, "subscribe"),
			Self::SubscribeDone => write!(f, "subscribe done"),
		}
	}
}

/// A failure during session establishment.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
	#[error("unexpected response status: {0}")]
	Status(String),

	#[error("unsupported version: {0:?}")]
	Version(Version),

	#[error("invalid server setup: {0}")]
	Decode(DecodeError),

	#[error("unexpected message before setup: {0:#x}")]
	Unexpected(u64),
}

/// A list of possible errors that can occur during the session.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
	#[error("transport error: {0}")]
	Transport(Arc<dyn SendSyncError>),

	#[error("connection error: code={code} reason={reason}")]
	Connection { code: u64, reason: String },

	#[error("setup failed: {0}")]
	Setup(#[from] SetupError),

	#[error("timeout waiting for {0}")]
	Timeout(Stage),

	#[error("decode error: {0}")]
	Decode(#[from] DecodeError),

	#[error("encode error: {0}")]
	Encode(#[from] EncodeError),

	#[error("subscribe error: code={code} reason={reason}")]
	Subscribe { code: u64, reason: String },

	#[error("session not ready: {0:?}")]
	NotReady(HandshakeState),

	#[error("not found")]
	NotFound,

	#[error("duplicate")]
	Duplicate,

	#[error("too many subscribes")]
	TooManySubscribes,

	#[error("closed")]
	Closed,
}

impl Error {
	pub(crate) fn transport<E: SendSyncError + 'static>(err: E) -> Self {
		Self::Transport(Arc::new(err))
	}

	/// Returns true if the error terminates the session.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Self::Transport(_) | Self::Connection { .. } | Self::Setup(_) | Self::Timeout(Stage::WebTransport | Stage::Setup)
		)
	}
}
