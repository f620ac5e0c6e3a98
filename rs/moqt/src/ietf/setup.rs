use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
	coding::{self, *},
	ietf::{Message, Parameters, SetupParameter, Version},
};

/// The role advertised in the ROLE setup parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u64)]
pub enum Role {
	Publisher = 0x01,
	Subscriber = 0x02,
	PubSub = 0x03,
}

/// Sent by the client to offer versions and parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSetup {
	pub versions: Versions,
	pub parameters: Parameters,
}

impl ClientSetup {
	pub fn new(versions: impl Into<Versions>) -> Self {
		Self {
			versions: versions.into(),
			parameters: Parameters::default(),
		}
	}

	pub fn with_role(mut self, role: Role) -> Result<Self, EncodeError> {
		self.parameters.set_varint(SetupParameter::Role, role.into())?;
		Ok(self)
	}
}

impl Message for ClientSetup {
	const ID: u64 = 0x40;

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W, version: Version) -> Result<(), EncodeError> {
		self.versions.encode(w, version)?;
		self.parameters.encode(w, version)
	}

	fn decode_msg<R: bytes::Buf>(r: &mut R, version: Version) -> Result<Self, DecodeError> {
		let versions = Versions::decode(r, version)?;
		let parameters = Parameters::decode(r, version)?;
		Ok(Self { versions, parameters })
	}
}

/// Sent by the server with the selected version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSetup {
	pub version: coding::Version,
	pub parameters: Parameters,
}

impl ServerSetup {
	/// The MAX_SUBSCRIBE_ID parameter, if advertised.
	pub fn max_subscribe_id(&self) -> Result<Option<u64>, DecodeError> {
		self.parameters.get_varint(SetupParameter::MaxSubscribeId)
	}

	pub fn role(&self) -> Result<Option<Role>, DecodeError> {
		match self.parameters.get_varint(SetupParameter::Role)? {
			Some(role) => Role::try_from(role).map(Some).map_err(|_| DecodeError::InvalidValue),
			None => Ok(None),
		}
	}
}

impl Message for ServerSetup {
	const ID: u64 = 0x41;

	fn encode_msg<W: bytes::BufMut>(&self, w: &mut W, version: Version) -> Result<(), EncodeError> {
		self.version.encode(w, version)?;
		self.parameters.encode(w, version)
	}

	fn decode_msg<R: bytes::Buf>(r: &mut R, version: Version) -> Result<Self, DecodeError> {
		let selected = coding::Version::decode(r, version)?;
		let parameters = Parameters::decode(r, version)?;
		Ok(Self {
			version: selected,
			parameters,
		})
	}
}
