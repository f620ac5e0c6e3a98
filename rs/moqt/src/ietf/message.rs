use std::fmt::Debug;

use bytes::{Buf, Bytes, BytesMut};

use crate::{
	coding::*,
	ietf::{
		ClientSetup, MaxSubscribeId, ServerSetup, Subscribe, SubscribeDone, SubscribeError, SubscribeOk, Unsubscribe,
		Version,
	},
};

/// A control message payload, framed by [encode_message].
pub trait Message: Sized + Debug {
	const ID: u64;

	/// Encode the payload, without the type and length.
	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W, version: Version) -> Result<(), EncodeError>;

	/// Decode the payload, without the type and length.
	fn decode_msg<R: bytes::Buf>(r: &mut R, version: Version) -> Result<Self, DecodeError>;
}

/// Frame a message as `type | length | payload`.
pub fn encode_message<M: Message>(msg: &M, version: Version) -> Result<Bytes, EncodeError> {
	let mut payload = BytesMut::new();
	msg.encode_msg(&mut payload, version)?;

	let mut buf = BytesMut::with_capacity(payload.len() + 16);
	M::ID.encode(&mut buf, version)?;
	payload.len().encode(&mut buf, version)?;
	buf.extend_from_slice(&payload);

	Ok(buf.freeze())
}

/// Decode a complete payload as the given message.
///
/// The payload length is declared by the frame, so running out of bytes means the message lied about its size.
pub fn decode_payload<M: Message>(mut payload: Bytes, version: Version) -> Result<M, DecodeError> {
	let msg = M::decode_msg(&mut payload, version).map_err(|err| match err {
		DecodeError::Short => DecodeError::Truncated,
		err => err,
	})?;

	if payload.has_remaining() {
		return Err(DecodeError::Long);
	}

	Ok(msg)
}

/// A framed control message before its payload is interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
	pub id: u64,
	pub payload: Bytes,
}

impl RawMessage {
	/// The length declared in the frame.
	pub fn length(&self) -> usize {
		self.payload.len()
	}

	/// Interpret the payload based on the type tag.
	pub fn parse(self, version: Version) -> Result<ControlMessage, DecodeError> {
		let payload = self.payload;

		Ok(match self.id {
			ClientSetup::ID => ControlMessage::ClientSetup(decode_payload(payload, version)?),
			ServerSetup::ID => ControlMessage::ServerSetup(decode_payload(payload, version)?),
			Subscribe::ID => ControlMessage::Subscribe(decode_payload(payload, version)?),
			SubscribeOk::ID => ControlMessage::SubscribeOk(decode_payload(payload, version)?),
			SubscribeError::ID => ControlMessage::SubscribeError(decode_payload(payload, version)?),
			SubscribeDone::ID => ControlMessage::SubscribeDone(decode_payload(payload, version)?),
			Unsubscribe::ID => ControlMessage::Unsubscribe(decode_payload(payload, version)?),
			MaxSubscribeId::ID => ControlMessage::MaxSubscribeId(decode_payload(payload, version)?),
			id => ControlMessage::Unknown { id, payload },
		})
	}
}

impl Decode<Version> for RawMessage {
	fn decode<R: bytes::Buf>(r: &mut R, version: Version) -> Result<Self, DecodeError> {
		let id = u64::decode(r, version)?;
		let payload = Bytes::decode(r, version)?;
		Ok(Self { id, payload })
	}
}

impl Encode<Version> for RawMessage {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: Version) -> Result<(), EncodeError> {
		self.id.encode(w, version)?;
		self.payload.encode(w, version)
	}
}

/// Any control message this crate understands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlMessage {
	ClientSetup(ClientSetup),
	ServerSetup(ServerSetup),
	Subscribe(Subscribe),
	SubscribeOk(SubscribeOk),
	SubscribeError(SubscribeError),
	SubscribeDone(SubscribeDone),
	Unsubscribe(Unsubscribe),
	MaxSubscribeId(MaxSubscribeId),

	/// A message type we don't support, kept so the caller can log and skip it.
	Unknown { id: u64, payload: Bytes },
}

impl ControlMessage {
	pub fn id(&self) -> u64 {
		match self {
			Self::ClientSetup(_) => ClientSetup::ID,
			Self::ServerSetup(_) => ServerSetup::ID,
			Self::Subscribe(_) => Subscribe::ID,
			Self::SubscribeOk(_) => SubscribeOk::ID,
			Self::SubscribeError(_) => SubscribeError::ID,
			Self::SubscribeDone(_) => SubscribeDone::ID,
			Self::Unsubscribe(_) => Unsubscribe::ID,
			Self::MaxSubscribeId(_) => MaxSubscribeId::ID,
			Self::Unknown { id, .. } => *id,
		}
	}
}

/// Parse a single framed control message from the front of the buffer.
///
/// The buffer is expected to contain the whole frame; anything missing is reported as [DecodeError::Truncated].
pub fn parse_control_message<B: bytes::Buf>(buf: &mut B, version: Version) -> Result<ControlMessage, DecodeError> {
	let raw = RawMessage::decode(buf, version).map_err(|err| match err {
		DecodeError::Short => DecodeError::Truncated,
		err => err,
	})?;

	raw.parse(version)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ietf::*;

	#[test]
	fn test_unsubscribe_frame() {
		let buf = encode_message(&Unsubscribe { id: SubscribeId(1) }, Version::Draft07).unwrap();
		assert_eq!(buf.as_ref(), &[0x0a, 0x01, 0x01]);

		let msg = parse_control_message(&mut buf.clone(), Version::Draft07).unwrap();
		assert_eq!(msg, ControlMessage::Unsubscribe(Unsubscribe { id: SubscribeId(1) }));
	}

	#[test]
	fn test_unknown_type() {
		let mut buf = Bytes::from_static(&[0x20, 0x02, 0xaa, 0xbb]);
		let msg = parse_control_message(&mut buf, Version::Draft07).unwrap();

		assert_eq!(msg.id(), 0x20);
		assert_eq!(
			msg,
			ControlMessage::Unknown {
				id: 0x20,
				payload: Bytes::from_static(&[0xaa, 0xbb]),
			}
		);
		assert!(buf.is_empty());
	}

	#[test]
	fn test_truncated_payload() {
		// SUBSCRIBE_OK declaring two bytes: the id and nothing else.
		let mut buf = Bytes::from_static(&[0x04, 0x01, 0x01]);
		let err = parse_control_message(&mut buf, Version::Draft07).unwrap_err();
		assert_eq!(err, DecodeError::Truncated);
		assert_eq!(err.to_string(), "truncated message");

		// The frame itself is cut short.
		let mut buf = Bytes::from_static(&[0x0a, 0x05, 0x01]);
		assert_eq!(parse_control_message(&mut buf, Version::Draft07), Err(DecodeError::Truncated));
	}

	#[test]
	fn test_trailing_payload() {
		let mut buf = Bytes::from_static(&[0x0a, 0x02, 0x01, 0x00]);
		assert_eq!(parse_control_message(&mut buf, Version::Draft07), Err(DecodeError::Long));
	}

	#[test]
	fn test_partial_frame() {
		let mut reader = Reader::new(Version::Draft07);
		reader.push(&[0x0a, 0x01]);
		assert_eq!(reader.decode::<RawMessage>().unwrap(), None);

		reader.push(&[0x07]);
		let raw = reader.decode::<RawMessage>().unwrap().unwrap();
		assert_eq!(raw.length(), 1);
		assert_eq!(
			raw.parse(Version::Draft07).unwrap(),
			ControlMessage::Unsubscribe(Unsubscribe { id: SubscribeId(7) })
		);
	}
}
