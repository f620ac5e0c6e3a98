//! Subscribe messages for draft-07.

use std::fmt;

use bytes::Bytes;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

use crate::{
	coding::*,
	ietf::{Location, Message, Parameters, TrackNamespace, Version},
};

/// A client-assigned subscription identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscribeId(pub u64);

impl SubscribeId {
	/// Return the current id and move to the next one.
	pub fn increment(&mut self) -> SubscribeId {
		let prev = self.0;
		self.0 += 1;
		SubscribeId(prev)
	}
}

impl fmt::Debug for SubscribeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl fmt::Display for SubscribeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl<V> Encode<V> for SubscribeId {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: V) -> Result<(), EncodeError> {
		self.0.encode(w, version)
	}
}

impl<V> Decode<V> for SubscribeId {
	fn decode<R: bytes::Buf>(r: &mut R, version: V) -> Result<Self, DecodeError> {
		Ok(Self(u64::decode(r, version)?))
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum GroupOrder {
	/// Use the publisher's order.
	Publisher = 0x0,
	Ascending = 0x1,
	Descending = 0x2,
}

impl Default for GroupOrder {
	fn default() -> Self {
		Self::Ascending
	}
}

impl<V> Encode<V> for GroupOrder {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: V) -> Result<(), EncodeError> {
		u8::from(*self).encode(w, version)
	}
}

impl<V> Decode<V> for GroupOrder {
	fn decode<R: bytes::Buf>(r: &mut R, version: V) -> Result<Self, DecodeError> {
		Self::try_from(u8::decode(r, version)?).map_err(|_| DecodeError::InvalidValue)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u64)]
pub enum FilterType {
	LatestGroup = 0x1,
	LatestObject = 0x2,
	AbsoluteStart = 0x3,
	AbsoluteRange = 0x4,
}

impl Default for FilterType {
	fn default() -> Self {
		Self::LatestGroup
	}
}

impl<V> Encode<V> for FilterType {
	fn encode<W: bytes::BufMut>(&self, w: &mut W, version: V) -> Result<(), EncodeError> {
		u64::from(*self).encode(w, version)
	}
}

impl<V> Decode<V> for FilterType {
	fn decode<R: bytes::Buf>(r: &mut R, version: V) -> Result<Self, DecodeError> {
		Self::try_from(u64::decode(r, version)?).map_err(|_| DecodeError::InvalidValue)
	}
}

/// Subscribe message (0x03)
/// Sent by the subscriber to request objects for the given track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscribe {
	pub id: SubscribeId,
	pub track_alias: u64,
	pub track_namespace: TrackNamespace,
	pub track_name: Bytes,
	pub subscriber_priority: u8,
	pub group_order: GroupOrder,
	pub filter_type: FilterType,

	/// Required for [FilterType::AbsoluteStart] and [FilterType::AbsoluteRange].
	pub start: Option<Location>,

	/// Required for [FilterType::AbsoluteRange].
	pub end: Option<Location>,

	pub parameters: Parameters,
}

impl Message for Subscribe {
	const ID: u64 = 0x03;

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W, version: Version) -> Result<(), EncodeError> {
		self.id.encode(w, version)?;
		self.track_alias.encode(w, version)?;
		self.track_namespace.encode(w, version)?;
		self.track_name.encode(w, version)?;
		self.subscriber_priority.encode(w, version)?;
		self.group_order.encode(w, version)?;
		self.filter_type.encode(w, version)?;

		match self.filter_type {
			FilterType::AbsoluteStart => {
				self.start.ok_or(EncodeError::MissingField)?.encode(w, version)?;
			}
			FilterType::AbsoluteRange => {
				self.start.ok_or(EncodeError::MissingField)?.encode(w, version)?;
				self.end.ok_or(EncodeError::MissingField)?.encode(w, version)?;
			}
			FilterType::LatestGroup | FilterType::LatestObject => {}
		}

		self.parameters.encode(w, version)
	}

	fn decode_msg<R: bytes::Buf>(r: &mut R, version: Version) -> Result<Self, DecodeError> {
		let id = SubscribeId::decode(r, version)?;
		let track_alias = u64::decode(r, version)?;
		let track_namespace = TrackNamespace::decode(r, version)?;
		let track_name = Bytes::decode(r, version)?;
		let subscriber_priority = u8::decode(r, version)?;
		let group_order = GroupOrder::decode(r, version)?;
		let filter_type = FilterType::decode(r, version)?;

		let (start, end) = match filter_type {
			FilterType::AbsoluteStart => (Some(Location::decode(r, version)?), None),
			FilterType::AbsoluteRange => {
				let start = Location::decode(r, version)?;
				let end = Location::decode(r, version)?;
				(Some(start), Some(end))
			}
			FilterType::LatestGroup | FilterType::LatestObject => (None, None),
		};

		let parameters = Parameters::decode(r, version)?;

		Ok(Self {
			id,
			track_alias,
			track_namespace,
			track_name,
			subscriber_priority,
			group_order,
			filter_type,
			start,
			end,
			parameters,
		})
	}
}

/// SubscribeOk message (0x04)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeOk {
	pub id: SubscribeId,

	/// Milliseconds until the subscription expires, or 0 for never.
	pub expires: u64,
	pub group_order: GroupOrder,
	pub largest: Option<Location>,
	pub parameters: Parameters,
}

impl Message for SubscribeOk {
	const ID: u64 = 0x04;

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W, version: Version) -> Result<(), EncodeError> {
		self.id.encode(w, version)?;
		self.expires.encode(w, version)?;
		self.group_order.encode(w, version)?;

		match self.largest {
			Some(largest) => {
				true.encode(w, version)?;
				largest.encode(w, version)?;
			}
			None => false.encode(w, version)?,
		}

		self.parameters.encode(w, version)
	}

	fn decode_msg<R: bytes::Buf>(r: &mut R, version: Version) -> Result<Self, DecodeError> {
		let id = SubscribeId::decode(r, version)?;
		let expires = u64::decode(r, version)?;
		let group_order = GroupOrder::decode(r, version)?;

		let largest = match bool::decode(r, version)? {
			true => Some(Location::decode(r, version)?),
			false => None,
		};

		let parameters = Parameters::decode(r, version)?;

		Ok(Self {
			id,
			expires,
			group_order,
			largest,
			parameters,
		})
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u64)]
pub enum SubscribeErrorCode {
	InternalError = 0x0,
	InvalidRange = 0x1,
	RetryTrackAlias = 0x2,
	TrackDoesNotExist = 0x3,
	Unauthorized = 0x4,
	Timeout = 0x5,
	#[num_enum(catch_all)]
	Unknown(u64),
}

/// SubscribeError message (0x05)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeError {
	pub id: SubscribeId,
	pub code: SubscribeErrorCode,
	pub reason: String,

	/// The alias to use when retrying, meaningful for [SubscribeErrorCode::RetryTrackAlias].
	pub track_alias: u64,
}

impl Message for SubscribeError {
	const ID: u64 = 0x05;

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W, version: Version) -> Result<(), EncodeError> {
		self.id.encode(w, version)?;
		u64::from(self.code).encode(w, version)?;
		self.reason.encode(w, version)?;
		self.track_alias.encode(w, version)
	}

	fn decode_msg<R: bytes::Buf>(r: &mut R, version: Version) -> Result<Self, DecodeError> {
		let id = SubscribeId::decode(r, version)?;
		let code = SubscribeErrorCode::from(u64::decode(r, version)?);
		let reason = String::decode(r, version)?;
		let track_alias = u64::decode(r, version)?;

		Ok(Self {
			id,
			code,
			reason,
			track_alias,
		})
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u64)]
pub enum SubscribeDoneCode {
	Unsubscribed = 0x0,
	InternalError = 0x1,
	Unauthorized = 0x2,
	TrackEnded = 0x3,
	SubscriptionEnded = 0x4,
	GoingAway = 0x5,
	Expired = 0x6,
	#[num_enum(catch_all)]
	Unknown(u64),
}

/// SubscribeDone message (0x0b)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeDone {
	pub id: SubscribeId,
	pub code: SubscribeDoneCode,
	pub reason: String,

	/// The last object delivered, if any.
	pub final_location: Option<Location>,
}

impl Message for SubscribeDone {
	const ID: u64 = 0x0b;

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W, version: Version) -> Result<(), EncodeError> {
		self.id.encode(w, version)?;
		u64::from(self.code).encode(w, version)?;
		self.reason.encode(w, version)?;

		match self.final_location {
			Some(location) => {
				true.encode(w, version)?;
				location.encode(w, version)
			}
			None => false.encode(w, version),
		}
	}

	fn decode_msg<R: bytes::Buf>(r: &mut R, version: Version) -> Result<Self, DecodeError> {
		let id = SubscribeId::decode(r, version)?;
		let code = SubscribeDoneCode::from(u64::decode(r, version)?);
		let reason = String::decode(r, version)?;

		let final_location = match bool::decode(r, version)? {
			true => Some(Location::decode(r, version)?),
			false => None,
		};

		Ok(Self {
			id,
			code,
			reason,
			final_location,
		})
	}
}

/// Unsubscribe message (0x0a)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unsubscribe {
	pub id: SubscribeId,
}

impl Message for Unsubscribe {
	const ID: u64 = 0x0a;

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W, version: Version) -> Result<(), EncodeError> {
		self.id.encode(w, version)
	}

	fn decode_msg<R: bytes::Buf>(r: &mut R, version: Version) -> Result<Self, DecodeError> {
		let id = SubscribeId::decode(r, version)?;
		Ok(Self { id })
	}
}

/// MaxSubscribeId message (0x15)
/// Sent by the server to raise the subscribe ids the client may use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaxSubscribeId {
	pub id: SubscribeId,
}

impl Message for MaxSubscribeId {
	const ID: u64 = 0x15;

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W, version: Version) -> Result<(), EncodeError> {
		self.id.encode(w, version)
	}

	fn decode_msg<R: bytes::Buf>(r: &mut R, version: Version) -> Result<Self, DecodeError> {
		let id = SubscribeId::decode(r, version)?;
		Ok(Self { id })
	}
}
