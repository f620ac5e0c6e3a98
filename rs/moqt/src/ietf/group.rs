use bytes::Bytes;

use crate::{coding::*, ietf::Version};

/// The stream type tag for a subgroup stream.
pub const STREAM_HEADER_SUBGROUP: u8 = 0x04;

/// The optional header at the start of a subgroup stream, consumed once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubgroupHeader {
	pub group_id: u32,
	pub subgroup_id: u32,
	pub publisher_priority: u8,
}

impl<V: Copy> Decode<V> for SubgroupHeader {
	fn decode<R: bytes::Buf>(r: &mut R, version: V) -> Result<Self, DecodeError> {
		let kind = u8::decode(r, version)?;
		if kind != STREAM_HEADER_SUBGROUP {
			return Err(DecodeError::InvalidMessage(kind.into()));
		}

		let group_id = u32::decode(r, version)?;
		let subgroup_id = u32::decode(r, version)?;
		let publisher_priority = u8::decode(r, version)?;

		Ok(Self {
			group_id,
			subgroup_id,
			publisher_priority,
		})
	}
}

impl<V: Copy> Encode<V> for SubgroupHeader {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: V) -> Result<(), EncodeError> {
		STREAM_HEADER_SUBGROUP.encode(w, version)?;
		self.group_id.encode(w, version)?;
		self.subgroup_id.encode(w, version)?;
		self.publisher_priority.encode(w, version)
	}
}

/// The fixed-width ids in front of every object record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectHeader {
	pub group_id: u32,
	pub subgroup_id: u32,
	pub object_id: u32,
}

impl ObjectHeader {
	pub const SIZE: usize = 12;
}

impl<V: Copy> Decode<V> for ObjectHeader {
	fn decode<R: bytes::Buf>(r: &mut R, version: V) -> Result<Self, DecodeError> {
		let group_id = u32::decode(r, version)?;
		let subgroup_id = u32::decode(r, version)?;
		let object_id = u32::decode(r, version)?;

		Ok(Self {
			group_id,
			subgroup_id,
			object_id,
		})
	}
}

impl<V: Copy> Encode<V> for ObjectHeader {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: V) -> Result<(), EncodeError> {
		self.group_id.encode(w, version)?;
		self.subgroup_id.encode(w, version)?;
		self.object_id.encode(w, version)
	}
}

/// An object parsed from a data stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Object {
	pub header: ObjectHeader,
	pub payload: Bytes,
}

/// Parses the objects of a single data stream.
///
/// Objects carry no payload length, so the payload of an object is everything left in the delivery
/// that completed its ids. Partial ids are buffered until the next delivery.
pub struct GroupReader {
	reader: Reader<Version>,
	header: Option<SubgroupHeader>,
	started: bool,
}

impl GroupReader {
	pub fn new(version: Version) -> Self {
		Self {
			reader: Reader::new(version),
			header: None,
			started: false,
		}
	}

	/// The subgroup header, if the stream had one.
	pub fn header(&self) -> Option<&SubgroupHeader> {
		self.header.as_ref()
	}

	/// Feed a delivery, returning the object it completed, if any.
	///
	/// A stream that finishes in the middle of a header or object ids returns [DecodeError::Truncated].
	pub fn push(&mut self, data: &[u8], fin: bool) -> Result<Option<Object>, DecodeError> {
		self.reader.push(data);
		if fin {
			self.reader.finish();
		}

		if self.reader.is_empty() {
			return Ok(None);
		}

		if !self.started {
			let Some(kind) = self.reader.decode_peek::<u8>()? else {
				return Ok(None);
			};

			if kind == STREAM_HEADER_SUBGROUP {
				match self.reader.decode::<SubgroupHeader>() {
					Ok(Some(header)) => self.header = Some(header),
					Ok(None) => return Ok(None),
					Err(DecodeError::Short) => return Err(DecodeError::Truncated),
					Err(err) => return Err(err),
				}
			}

			self.started = true;

			if self.reader.is_empty() {
				return Ok(None);
			}
		}

		match self.reader.decode::<ObjectHeader>() {
			Ok(Some(header)) => {
				let payload = self.reader.read_all();
				Ok(Some(Object { header, payload }))
			}
			Ok(None) => Ok(None),
			Err(DecodeError::Short) => Err(DecodeError::Truncated),
			Err(err) => Err(err),
		}
	}
}
