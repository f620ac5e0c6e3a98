use clap::Args;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[serde_as]
#[derive(Args, Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Log {
	/// The level of log output, overridden by RUST_LOG.
	#[arg(id = "log-level", long = "log-level", default_value = "info", env = "MOQT_LOG_LEVEL")]
	#[serde_as(as = "DisplayFromStr")]
	pub level: tracing::Level,

	/// Shorthand for --log-level debug.
	#[arg(long)]
	pub debug: bool,
}

impl Default for Log {
	fn default() -> Self {
		Self {
			level: tracing::Level::INFO,
			debug: false,
		}
	}
}

impl Log {
	pub fn level(&self) -> LevelFilter {
		match self.debug {
			true => LevelFilter::DEBUG,
			false => LevelFilter::from_level(self.level),
		}
	}

	/// Install a global fmt subscriber writing to stderr.
	pub fn init(&self) -> anyhow::Result<()> {
		let filter = EnvFilter::builder()
			.with_default_directive(self.level().into())
			.from_env_lossy()
			.add_directive("h2=warn".parse()?)
			.add_directive("quinn=info".parse()?);

		tracing_subscriber::fmt()
			.with_writer(std::io::stderr)
			.with_env_filter(filter)
			.try_init()
			.map_err(|err| anyhow::anyhow!("failed to install logger: {err}"))?;

		Ok(())
	}
}
