use bytes::Bytes;
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::coding::*;

const MAX_PARAMS: u64 = 64;

/// Parameter ids used in CLIENT_SETUP and SERVER_SETUP.
#[derive(Debug, Copy, Clone, FromPrimitive, IntoPrimitive, Eq, Hash, PartialEq)]
#[repr(u64)]
pub enum SetupParameter {
	Role = 0,
	Path = 1,
	MaxSubscribeId = 2,
	#[num_enum(catch_all)]
	Unknown(u64),
}

/// An ordered list of `(id, value)` parameters.
///
/// Every value is length prefixed on the wire, so ids we don't recognize are kept as raw bytes.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Parameters(Vec<(u64, Bytes)>);

impl Parameters {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, id: impl Into<u64>) -> Option<&Bytes> {
		let id = id.into();
		self.0.iter().find(|(k, _)| *k == id).map(|(_, v)| v)
	}

	/// Interpret a parameter value as a single varint.
	pub fn get_varint(&self, id: impl Into<u64>) -> Result<Option<u64>, DecodeError> {
		let Some(value) = self.get(id) else {
			return Ok(None);
		};

		let mut value = value.clone();
		let v = u64::decode(&mut value, ())?;
		if !value.is_empty() {
			return Err(DecodeError::Long);
		}

		Ok(Some(v))
	}

	/// Insert or replace a parameter, keeping the original position on replace.
	pub fn set(&mut self, id: impl Into<u64>, value: Bytes) {
		let id = id.into();
		match self.0.iter_mut().find(|(k, _)| *k == id) {
			Some(entry) => entry.1 = value,
			None => self.0.push((id, value)),
		}
	}

	pub fn set_varint(&mut self, id: impl Into<u64>, value: u64) -> Result<(), EncodeError> {
		let value = value.encode_bytes(())?;
		self.set(id, value);
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (u64, &Bytes)> {
		self.0.iter().map(|(k, v)| (*k, v))
	}
}

impl<V: Copy> Decode<V> for Parameters {
	fn decode<R: bytes::Buf>(r: &mut R, version: V) -> Result<Self, DecodeError> {
		let count = u64::decode(r, version)?;

		if count > MAX_PARAMS {
			return Err(DecodeError::TooMany);
		}

		let mut params: Vec<(u64, Bytes)> = Vec::with_capacity(count as usize);

		for _ in 0..count {
			let id = u64::decode(r, version)?;
			if params.iter().any(|(k, _)| *k == id) {
				return Err(DecodeError::Duplicate);
			}

			let value = Bytes::decode(r, version)?;
			params.push((id, value));
		}

		Ok(Self(params))
	}
}

impl<V: Copy> Encode<V> for Parameters {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: V) -> Result<(), EncodeError> {
		self.0.len().encode(w, version)?;

		for (id, value) in &self.0 {
			id.encode(w, version)?;
			value.encode(w, version)?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_retained() {
		// role=2, an unknown id 0x21 with three bytes, max subscribe id=100
		let mut buf = Bytes::from_static(&[0x03, 0x00, 0x01, 0x02, 0x21, 0x03, 0xde, 0xad, 0x01, 0x02, 0x02, 0x40, 0x64]);
		let params = Parameters::decode(&mut buf, ()).unwrap();
		assert!(buf.is_empty());

		assert_eq!(params.len(), 3);
		assert_eq!(params.get_varint(SetupParameter::Role).unwrap(), Some(2));
		assert_eq!(params.get_varint(SetupParameter::MaxSubscribeId).unwrap(), Some(100));
		assert_eq!(params.get(0x21u64).map(|v| &v[..]), Some(&[0xde, 0xad, 0x01][..]));
		assert_eq!(SetupParameter::from(0x21), SetupParameter::Unknown(0x21));

		// Order is preserved on the way back out.
		let ids: Vec<u64> = params.iter().map(|(id, _)| id).collect();
		assert_eq!(ids, vec![0, 0x21, 2]);
	}

	#[test]
	fn test_duplicate() {
		let mut buf = Bytes::from_static(&[0x02, 0x00, 0x01, 0x02, 0x00, 0x01, 0x03]);
		assert_eq!(Parameters::decode(&mut buf, ()), Err(DecodeError::Duplicate));
	}

	#[test]
	fn test_set_replaces() {
		let mut params = Parameters::new();
		params.set_varint(SetupParameter::Role, 1).unwrap();
		params.set_varint(SetupParameter::Role, 2).unwrap();

		assert_eq!(params.len(), 1);
		assert_eq!(params.get_varint(SetupParameter::Role).unwrap(), Some(2));
	}
}
