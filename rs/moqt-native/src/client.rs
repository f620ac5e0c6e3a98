use std::collections::BTreeMap;

use anyhow::Context;
use bytes::Bytes;
use moqt::{GroupSnapshot, Session, Subscription, Transport, ietf::TrackNamespace};

use crate::ClientConfig;

/// What arrived during a [run].
#[derive(Clone, Debug)]
pub struct Report {
	/// The subscription as it was when the run ended.
	pub subscription: Subscription,

	/// True if SUBSCRIBE_DONE arrived before the deadline.
	pub done: bool,

	pub groups: BTreeMap<u64, GroupSnapshot>,
}

/// Subscribe to the configured track, stay subscribed for a while, then unsubscribe and report.
///
/// The session must already be receiving transport events, see [Session::start].
pub async fn run<T: Transport>(session: &Session<T>, config: &ClientConfig) -> anyhow::Result<Report> {
	anyhow::ensure!(!config.namespace.is_empty(), "missing namespace");
	anyhow::ensure!(!config.track.is_empty(), "missing track");

	session
		.initialize(&config.host, config.port, config.connect_timeout)
		.await
		.with_context(|| format!("failed to connect to {}:{}", config.host, config.port))?;

	let namespace = TrackNamespace::from(config.namespace.as_str());
	let track = Bytes::from(config.track.clone());

	let subscription = session.subscribe(namespace, track).context("failed to subscribe")?;
	tracing::info!(id = %subscription.id, namespace = %config.namespace, track = %config.track, "subscribed");

	tokio::time::sleep(config.duration).await;

	session.unsubscribe(subscription.id).context("failed to unsubscribe")?;

	let (subscription, done) = match session.subscribe_done(subscription.id, config.done_timeout).await {
		Ok(subscription) => (subscription, true),
		Err(moqt::Error::Timeout(_)) => {
			tracing::warn!(id = %subscription.id, timeout = ?config.done_timeout, "no SUBSCRIBE_DONE received");
			let subscription = session.subscription(subscription.id).unwrap_or(subscription);
			(subscription, false)
		}
		Err(err) => return Err(err).context("subscription failed"),
	};

	let groups = session.groups();

	tracing::info!(groups = groups.len(), status = ?subscription.status, "final statistics");
	for (group, stat) in &groups {
		tracing::info!(group, objects = stat.objects, bytes = stat.bytes, subgroups = ?stat.subgroups, "group");
	}

	Ok(Report {
		subscription,
		done,
		groups,
	})
}
