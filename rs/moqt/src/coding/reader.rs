use std::{fmt::Debug, io};

use bytes::{Buf, Bytes, BytesMut};

use crate::coding::*;

/// A decode cursor for a single stream.
///
/// The transport delivers stream data in arbitrary chunks, so a message may be split across deliveries.
/// Bytes are buffered with [Reader::push] until [Reader::decode] has enough to produce a message.
pub struct Reader<V> {
	buffer: BytesMut,
	version: V,
	fin: bool,
}

impl<V> Reader<V> {
	pub fn new(version: V) -> Self {
		Self {
			buffer: Default::default(),
			version,
			fin: false,
		}
	}

	/// Append a delivery to the buffer.
	pub fn push(&mut self, data: &[u8]) {
		self.buffer.extend_from_slice(data);
	}

	/// Mark that no more data will arrive.
	pub fn finish(&mut self) {
		self.fin = true;
	}

	/// Decode the next message from the buffer.
	///
	/// Returns `None` if more data is needed, unless the stream is finished, in which case it's an error.
	pub fn decode<T: Decode<V> + Debug>(&mut self) -> Result<Option<T>, DecodeError>
	where
		V: Clone,
	{
		let mut cursor = io::Cursor::new(&self.buffer);
		match T::decode(&mut cursor, self.version.clone()) {
			Ok(msg) => {
				self.buffer.advance(cursor.position() as usize);
				Ok(Some(msg))
			}
			Err(DecodeError::Short) if !self.fin => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Decode the next message from the buffer without consuming it.
	pub fn decode_peek<T: Decode<V> + Debug>(&self) -> Result<Option<T>, DecodeError>
	where
		V: Clone,
	{
		let mut cursor = io::Cursor::new(&self.buffer);
		match T::decode(&mut cursor, self.version.clone()) {
			Ok(msg) => Ok(Some(msg)),
			Err(DecodeError::Short) if !self.fin => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Take every buffered byte.
	pub fn read_all(&mut self) -> Bytes {
		self.buffer.split().freeze()
	}

	/// The number of buffered bytes.
	pub fn len(&self) -> usize {
		self.buffer.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buffer.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_split_delivery() {
		let mut reader = Reader::new(());

		// 0x3fff split across two deliveries.
		reader.push(&[0x7f]);
		assert_eq!(reader.decode::<u64>().unwrap(), None);
		assert_eq!(reader.len(), 1);

		reader.push(&[0xff, 0x05]);
		assert_eq!(reader.decode::<u64>().unwrap(), Some(0x3fff));
		assert_eq!(reader.decode::<u64>().unwrap(), Some(5));
		assert!(reader.is_empty());
	}

	#[test]
	fn test_finished_short() {
		let mut reader = Reader::new(());
		reader.push(&[0x00, 0x00]);
		reader.finish();

		assert_eq!(reader.decode::<u32>(), Err(DecodeError::Short));
	}

	#[test]
	fn test_peek() {
		let mut reader = Reader::new(());
		reader.push(&[0x04, 0x01]);

		assert_eq!(reader.decode_peek::<u8>().unwrap(), Some(4));
		assert_eq!(reader.len(), 2);
		assert_eq!(reader.read_all().as_ref(), &[0x04, 0x01]);
		assert!(reader.is_empty());
	}
}
