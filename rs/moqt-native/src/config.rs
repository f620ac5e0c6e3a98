use std::{path::Path, time::Duration};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::Log;

/// The ROLE parameter to advertise during setup.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
	Publisher,
	Subscriber,
	PubSub,
}

impl From<ClientRole> for moqt::ietf::Role {
	fn from(role: ClientRole) -> Self {
		match role {
			ClientRole::Publisher => Self::Publisher,
			ClientRole::Subscriber => Self::Subscriber,
			ClientRole::PubSub => Self::PubSub,
		}
	}
}

/// Settings for subscribing to a single track.
#[derive(Parser, Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
#[command(name = "moqt-sub", about = "Subscribe to a MoQ track and report the objects received")]
pub struct ClientConfig {
	/// The relay to connect to.
	#[arg(long, env = "MOQT_HOST", default_value = "localhost")]
	pub host: String,

	#[arg(long, env = "MOQT_PORT", default_value_t = 4433)]
	pub port: u16,

	/// The path of the WebTransport CONNECT request.
	#[arg(long, env = "MOQT_PATH", default_value = "/moq")]
	pub path: String,

	/// The track namespace, with entries separated by `/`.
	#[arg(long, env = "MOQT_NAMESPACE")]
	pub namespace: String,

	/// The track name.
	#[arg(long, env = "MOQT_TRACK")]
	pub track: String,

	/// The deadline for the WebTransport session.
	#[arg(long, env = "MOQT_CONNECT_TIMEOUT", default_value = "30s", value_parser = humantime::parse_duration)]
	#[serde(with = "humantime_serde")]
	pub connect_timeout: Duration,

	/// The deadline for SERVER_SETUP.
	#[arg(long, env = "MOQT_SETUP_TIMEOUT", default_value = "5s", value_parser = humantime::parse_duration)]
	#[serde(with = "humantime_serde")]
	pub setup_timeout: Duration,

	/// How long to stay subscribed before unsubscribing.
	#[arg(long, env = "MOQT_DURATION", default_value = "30s", value_parser = humantime::parse_duration)]
	#[serde(with = "humantime_serde")]
	pub duration: Duration,

	/// How long to wait for SUBSCRIBE_DONE after unsubscribing.
	#[arg(long, env = "MOQT_DONE_TIMEOUT", default_value = "5s", value_parser = humantime::parse_duration)]
	#[serde(with = "humantime_serde")]
	pub done_timeout: Duration,

	/// Advertise a ROLE parameter in CLIENT_SETUP.
	#[arg(long, env = "MOQT_ROLE", value_enum)]
	pub role: Option<ClientRole>,

	#[command(flatten)]
	#[serde(default)]
	pub log: Log,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			host: "localhost".to_string(),
			port: 4433,
			path: "/moq".to_string(),
			namespace: String::new(),
			track: String::new(),
			connect_timeout: Duration::from_secs(30),
			setup_timeout: Duration::from_secs(5),
			duration: Duration::from_secs(30),
			done_timeout: Duration::from_secs(5),
			role: None,
			log: Log::default(),
		}
	}
}

impl ClientConfig {
	/// Load the config from a TOML file.
	pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
		let path = path.as_ref();
		let contents = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
		Self::from_toml(&contents).with_context(|| format!("failed to parse {}", path.display()))
	}

	pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
		Ok(toml::from_str(contents)?)
	}

	/// The session settings derived from this config.
	pub fn session_config(&self) -> moqt::SessionConfig {
		moqt::SessionConfig {
			path: self.path.clone(),
			role: self.role.map(Into::into),
			setup_timeout: self.setup_timeout,
			..Default::default()
		}
	}
}
