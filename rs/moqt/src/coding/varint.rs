// Based on quinn-proto
// https://github.com/quinn-rs/quinn/blob/main/quinn-proto/src/varint.rs
// Licensed via Apache 2.0 and MIT

use std::convert::TryFrom;
use std::fmt;

use thiserror::Error;

use super::{Decode, DecodeError, Encode, EncodeError};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
#[error("value too large for varint encoding")]
pub struct BoundsExceeded;

/// An integer less than 2^62
///
/// Values of this type are suitable for encoding as QUIC variable-length integer.
#[derive(Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarInt(u64);

impl VarInt {
	pub const MAX: Self = Self((1 << 62) - 1);

	/// Extract the integer value
	pub const fn into_inner(self) -> u64 {
		self.0
	}

	/// The number of bytes needed to encode this value.
	pub const fn size(self) -> usize {
		let x = self.0;
		if x < (1 << 6) {
			1
		} else if x < (1 << 14) {
			2
		} else if x < (1 << 30) {
			4
		} else {
			8
		}
	}
}

impl From<VarInt> for u64 {
	fn from(x: VarInt) -> Self {
		x.0
	}
}

impl From<u8> for VarInt {
	fn from(x: u8) -> Self {
		Self(x.into())
	}
}

impl From<u16> for VarInt {
	fn from(x: u16) -> Self {
		Self(x.into())
	}
}

impl From<u32> for VarInt {
	fn from(x: u32) -> Self {
		Self(x.into())
	}
}

impl TryFrom<u64> for VarInt {
	type Error = BoundsExceeded;

	/// Succeeds iff `x` < 2^62
	fn try_from(x: u64) -> Result<Self, BoundsExceeded> {
		if x <= Self::MAX.into_inner() {
			Ok(Self(x))
		} else {
			Err(BoundsExceeded)
		}
	}
}

impl TryFrom<usize> for VarInt {
	type Error = BoundsExceeded;

	/// Succeeds iff `x` < 2^62
	fn try_from(x: usize) -> Result<Self, BoundsExceeded> {
		Self::try_from(x as u64)
	}
}

impl fmt::Debug for VarInt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl fmt::Display for VarInt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl<V> Decode<V> for VarInt {
	fn decode<R: bytes::Buf>(r: &mut R, _: V) -> Result<Self, DecodeError> {
		if !r.has_remaining() {
			return Err(DecodeError::Short);
		}

		let first = r.chunk()[0];
		let size = 1usize << (first >> 6);

		if r.remaining() < size {
			return Err(DecodeError::Short);
		}

		// The two high bits of the first byte are the length tag, not part of the value.
		let x = match size {
			1 => u64::from(r.get_u8() & 0b0011_1111),
			2 => u64::from(r.get_u16() & 0x3fff),
			4 => u64::from(r.get_u32() & 0x3fff_ffff),
			_ => r.get_u64() & 0x3fff_ffff_ffff_ffff,
		};

		Ok(Self(x))
	}
}

impl<V> Encode<V> for VarInt {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, _: V) -> Result<(), EncodeError> {
		let x = self.0;
		match self.size() {
			1 => w.put_u8(x as u8),
			2 => w.put_u16((0b01 << 14) | x as u16),
			4 => w.put_u32((0b10 << 30) | x as u32),
			_ => w.put_u64((0b11 << 62) | x),
		}

		Ok(())
	}
}

impl<V> Decode<V> for u64 {
	fn decode<R: bytes::Buf>(r: &mut R, version: V) -> Result<Self, DecodeError> {
		VarInt::decode(r, version).map(u64::from)
	}
}

impl<V> Encode<V> for u64 {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: V) -> Result<(), EncodeError> {
		VarInt::try_from(*self)?.encode(w, version)
	}
}

impl<V> Decode<V> for usize {
	fn decode<R: bytes::Buf>(r: &mut R, version: V) -> Result<Self, DecodeError> {
		let v = u64::decode(r, version)?;
		usize::try_from(v).map_err(|_| DecodeError::BoundsExceeded)
	}
}

impl<V> Encode<V> for usize {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: V) -> Result<(), EncodeError> {
		VarInt::try_from(*self)?.encode(w, version)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn encode(v: u64) -> Vec<u8> {
		let mut buf = Vec::new();
		v.encode(&mut buf, ()).unwrap();
		buf
	}

	fn decode(buf: &[u8]) -> Result<u64, DecodeError> {
		let mut buf = buf;
		u64::decode(&mut buf, ())
	}

	#[test]
	fn test_boundaries() {
		let cases: [(u64, usize); 8] = [
			(0, 1),
			(0x3f, 1),
			(0x40, 2),
			(0x3fff, 2),
			(0x4000, 4),
			(0x3fff_ffff, 4),
			(0x4000_0000, 8),
			(0x3fff_ffff_ffff_ffff, 8),
		];

		for (value, size) in cases {
			let encoded = encode(value);
			assert_eq!(encoded.len(), size, "width of {value:#x}");
			assert_eq!(decode(&encoded).unwrap(), value);
		}
	}

	#[test]
	fn test_tag_bits() {
		assert_eq!(encode(0x25), [0x25]);
		assert_eq!(encode(0x3fff), [0x7f, 0xff]);
		assert_eq!(encode(0xff00_0007), [0xc0, 0x00, 0x00, 0x00, 0xff, 0x00, 0x00, 0x07]);
		assert_eq!(encode(494_878_333), [0x9d, 0x7f, 0x3e, 0x7d]);
	}

	#[test]
	fn test_decode_non_minimal() {
		// Decoders must accept wider encodings than necessary.
		assert_eq!(decode(&[0x40, 0x25]).unwrap(), 0x25);
	}

	#[test]
	fn test_short() {
		assert_eq!(decode(&[]), Err(DecodeError::Short));
		assert_eq!(decode(&[0x7f]), Err(DecodeError::Short));
		assert_eq!(decode(&[0xc0, 0, 0, 0]), Err(DecodeError::Short));
	}

	#[test]
	fn test_bounds_exceeded() {
		let mut buf = Vec::new();
		let err = (1u64 << 62).encode(&mut buf, ()).unwrap_err();
		assert_eq!(err, EncodeError::BoundsExceeded(BoundsExceeded));
		assert!(buf.is_empty());
	}

	#[test]
	fn test_cursor_advances() {
		let mut buf: &[u8] = &[0x25, 0x7f, 0xff, 0x01];
		assert_eq!(u64::decode(&mut buf, ()).unwrap(), 0x25);
		assert_eq!(u64::decode(&mut buf, ()).unwrap(), 0x3fff);
		assert_eq!(buf, [0x01]);
	}
}
