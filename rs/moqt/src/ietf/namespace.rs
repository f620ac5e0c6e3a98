use std::fmt;

use bytes::Bytes;

use crate::coding::*;

/// The maximum number of namespace entries.
const MAX_ENTRIES: usize = 32;

/// A track namespace, an ordered tuple of byte strings.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct TrackNamespace(pub Vec<Bytes>);

impl TrackNamespace {
	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
		self.0.iter()
	}
}

impl From<&str> for TrackNamespace {
	fn from(entry: &str) -> Self {
		Self(vec![Bytes::copy_from_slice(entry.as_bytes())])
	}
}

impl From<Vec<Bytes>> for TrackNamespace {
	fn from(entries: Vec<Bytes>) -> Self {
		Self(entries)
	}
}

impl<const N: usize> From<[&str; N]> for TrackNamespace {
	fn from(entries: [&str; N]) -> Self {
		Self(entries.iter().map(|e| Bytes::copy_from_slice(e.as_bytes())).collect())
	}
}

impl fmt::Debug for TrackNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list()
			.entries(self.0.iter().map(|e| String::from_utf8_lossy(e)))
			.finish()
	}
}

impl fmt::Display for TrackNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, entry) in self.0.iter().enumerate() {
			if i > 0 {
				write!(f, "/")?;
			}
			write!(f, "{}", String::from_utf8_lossy(entry))?;
		}
		Ok(())
	}
}

impl<V: Copy> Encode<V> for TrackNamespace {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: V) -> Result<(), EncodeError> {
		if self.0.len() > MAX_ENTRIES {
			return Err(EncodeError::InvalidValue);
		}

		self.0.len().encode(w, version)?;
		for entry in &self.0 {
			entry.encode(w, version)?;
		}
		Ok(())
	}
}

impl<V: Copy> Decode<V> for TrackNamespace {
	fn decode<R: bytes::Buf>(r: &mut R, version: V) -> Result<Self, DecodeError> {
		let count = usize::decode(r, version)?;
		if count > MAX_ENTRIES {
			return Err(DecodeError::TooMany);
		}

		let mut entries = Vec::with_capacity(count);
		for _ in 0..count {
			entries.push(Bytes::decode(r, version)?);
		}

		Ok(Self(entries))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_single_entry() {
		// A slash is just another byte within an entry.
		let ns = TrackNamespace::from("live/cam");
		assert_eq!(ns.len(), 1);

		let mut buf = Vec::new();
		ns.encode(&mut buf, ()).unwrap();
		assert_eq!(buf, b"\x01\x08live/cam");
		assert_eq!(TrackNamespace::decode(&mut buf.as_slice(), ()).unwrap(), ns);
	}

	#[test]
	fn test_tuple() {
		let ns = TrackNamespace::from(["live", "room1"]);
		assert_eq!(ns.len(), 2);
		assert_eq!(ns.to_string(), "live/room1");
	}

	#[test]
	fn test_too_many() {
		let mut buf = bytes::BytesMut::new();
		33u64.encode(&mut buf, ()).unwrap();
		assert_eq!(TrackNamespace::decode(&mut buf, ()), Err(DecodeError::TooMany));
	}
}
