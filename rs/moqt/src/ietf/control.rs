use crate::{
	ietf::{encode_message, Message, Version},
	Error, Stats, StreamId, Transport,
};

/// The write half of the control stream.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Control {
	stream: StreamId,
	version: Version,
}

impl Control {
	pub fn new(stream: StreamId, version: Version) -> Self {
		Self { stream, version }
	}

	pub fn stream(&self) -> StreamId {
		self.stream
	}

	/// Encode, enqueue and flush a control message.
	pub fn send<T: Transport, M: Message>(&self, transport: &mut T, stats: &dyn Stats, msg: &M) -> Result<(), Error> {
		tracing::debug!(message = ?msg, "sending control message");

		let buf = encode_message(msg, self.version)?;
		tracing::trace!(id = M::ID, size = buf.len(), hex = %hex::encode(&buf), "encoded control message");

		let size = buf.len() as u64;
		transport.write(self.stream, buf, false).map_err(Error::transport)?;
		transport.flush().map_err(Error::transport)?;
		stats.add_tx_bytes(size);

		Ok(())
	}
}
