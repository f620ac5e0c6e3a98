use std::time::Duration;

use crate::ietf::{FilterType, GroupOrder, Location, Role, Version};

/// Per-subscription options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeOptions {
	pub priority: u8,
	pub group_order: GroupOrder,
	pub filter_type: FilterType,
	pub start: Option<Location>,
	pub end: Option<Location>,
}

impl Default for SubscribeOptions {
	fn default() -> Self {
		Self {
			priority: 128,
			group_order: GroupOrder::Ascending,
			filter_type: FilterType::LatestGroup,
			start: None,
			end: None,
		}
	}
}

/// Settings for a single session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
	/// The versions offered in CLIENT_SETUP, in preferred order.
	pub versions: Vec<Version>,

	/// The `:path` of the WebTransport CONNECT request.
	pub path: String,

	pub user_agent: String,

	/// Advertise a ROLE parameter in CLIENT_SETUP; none are sent by default.
	pub role: Option<Role>,

	/// The deadline for SERVER_SETUP after CLIENT_SETUP is sent.
	pub setup_timeout: Duration,

	pub subscribe: SubscribeOptions,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			versions: Version::ALL.to_vec(),
			path: "/moq".to_string(),
			user_agent: concat!("moqt/", env!("CARGO_PKG_VERSION")).to_string(),
			role: None,
			setup_timeout: Duration::from_secs(5),
			subscribe: SubscribeOptions::default(),
		}
	}
}
