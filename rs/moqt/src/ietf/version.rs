use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::coding;

/// The draft versions supported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u64)]
pub enum Version {
	Draft07 = 0xff000007,
}

impl Version {
	pub const ALL: [Version; 1] = [Version::Draft07];
}

impl From<Version> for coding::Version {
	fn from(v: Version) -> Self {
		coding::Version(v.into())
	}
}

impl TryFrom<coding::Version> for Version {
	type Error = coding::Version;

	fn try_from(v: coding::Version) -> Result<Self, Self::Error> {
		Self::try_from(v.0).map_err(|_| v)
	}
}

impl From<Version> for coding::Versions {
	fn from(v: Version) -> Self {
		[coding::Version::from(v)].into()
	}
}
