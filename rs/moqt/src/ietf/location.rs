use crate::coding::*;

/// A position within a track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Location {
	pub group: u64,
	pub object: u64,
}

impl Location {
	pub const fn new(group: u64, object: u64) -> Self {
		Self { group, object }
	}
}

impl<V: Copy> Encode<V> for Location {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: V) -> Result<(), EncodeError> {
		self.group.encode(w, version)?;
		self.object.encode(w, version)
	}
}

impl<V: Copy> Decode<V> for Location {
	fn decode<R: bytes::Buf>(r: &mut R, version: V) -> Result<Self, DecodeError> {
		let group = u64::decode(r, version)?;
		let object = u64::decode(r, version)?;
		Ok(Self { group, object })
	}
}
