use std::collections::{hash_map, BTreeMap, HashMap, HashSet};

use bytes::Bytes;

use crate::{
	ietf::{
		self, Control, FilterType, GroupOrder, GroupReader, Location, SubscribeDoneCode, SubscribeErrorCode,
		SubscribeId, TrackNamespace, Version,
	},
	Error, GroupSnapshot, GroupStats, Stats, StreamId, Transport,
};

/// The lifecycle of a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionStatus {
	/// SUBSCRIBE sent, waiting for a reply.
	Pending,

	Active {
		expires: u64,
		largest: Option<Location>,
	},

	Error {
		code: SubscribeErrorCode,
		reason: String,
		retry_alias: Option<u64>,
	},

	Done {
		code: SubscribeDoneCode,
		reason: String,
		final_location: Option<Location>,
	},
}

impl SubscriptionStatus {
	/// Returns true once the publisher replied, either way.
	pub fn is_resolved(&self) -> bool {
		!matches!(self, Self::Pending)
	}

	/// Returns true if no more objects will arrive.
	pub fn is_closed(&self) -> bool {
		matches!(self, Self::Error { .. } | Self::Done { .. })
	}
}

/// A track subscription and its current status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
	pub id: SubscribeId,
	pub track_alias: u64,
	pub track_namespace: TrackNamespace,
	pub track_name: Bytes,
	pub priority: u8,
	pub group_order: GroupOrder,
	pub filter_type: FilterType,
	pub status: SubscriptionStatus,

	/// Set once UNSUBSCRIBE was sent.
	pub unsubscribed: bool,
}

impl From<&ietf::Subscribe> for Subscription {
	fn from(msg: &ietf::Subscribe) -> Self {
		Self {
			id: msg.id,
			track_alias: msg.track_alias,
			track_namespace: msg.track_namespace.clone(),
			track_name: msg.track_name.clone(),
			priority: msg.subscriber_priority,
			group_order: msg.group_order,
			filter_type: msg.filter_type,
			status: SubscriptionStatus::Pending,
			unsubscribed: false,
		}
	}
}

/// The subscription table and the data streams feeding it.
pub(crate) struct Subscriber {
	version: Version,
	subscribes: HashMap<SubscribeId, Subscription>,

	// Aliases of subscriptions that are not yet closed.
	aliases: HashSet<u64>,

	streams: HashMap<StreamId, GroupReader>,
	groups: GroupStats,
}

impl Subscriber {
	pub fn new(version: Version) -> Self {
		Self {
			version,
			subscribes: HashMap::new(),
			aliases: HashSet::new(),
			streams: HashMap::new(),
			groups: GroupStats::new(),
		}
	}

	pub fn get(&self, id: SubscribeId) -> Option<&Subscription> {
		self.subscribes.get(&id)
	}

	pub fn groups(&self) -> BTreeMap<u64, GroupSnapshot> {
		self.groups.snapshot()
	}

	/// Send SUBSCRIBE and register it as pending.
	pub fn subscribe<T: Transport>(
		&mut self,
		control: Control,
		transport: &mut T,
		stats: &dyn Stats,
		msg: ietf::Subscribe,
	) -> Result<Subscription, Error> {
		if self.subscribes.contains_key(&msg.id) || self.aliases.contains(&msg.track_alias) {
			return Err(Error::Duplicate);
		}

		control.send(transport, stats, &msg)?;

		let subscription = Subscription::from(&msg);
		self.aliases.insert(msg.track_alias);
		self.subscribes.insert(msg.id, subscription.clone());

		tracing::info!(id = %msg.id, namespace = %msg.track_namespace, name = %String::from_utf8_lossy(&msg.track_name), "subscribe started");

		Ok(subscription)
	}

	/// Send UNSUBSCRIBE; the status is left alone until SUBSCRIBE_DONE arrives.
	pub fn unsubscribe<T: Transport>(
		&mut self,
		control: Control,
		transport: &mut T,
		stats: &dyn Stats,
		id: SubscribeId,
	) -> Result<(), Error> {
		let subscription = self.subscribes.get_mut(&id).ok_or(Error::NotFound)?;

		control.send(transport, stats, &ietf::Unsubscribe { id })?;
		subscription.unsubscribed = true;

		Ok(())
	}

	pub fn recv_subscribe_ok(&mut self, msg: ietf::SubscribeOk) {
		let Some(subscription) = self.subscribes.get_mut(&msg.id) else {
			tracing::warn!(id = %msg.id, "SUBSCRIBE_OK for unknown subscription");
			return;
		};

		if subscription.status != SubscriptionStatus::Pending {
			tracing::warn!(id = %msg.id, status = ?subscription.status, "ignoring SUBSCRIBE_OK");
			return;
		}

		tracing::info!(id = %msg.id, largest = ?msg.largest, "subscribe ok");
		subscription.status = SubscriptionStatus::Active {
			expires: msg.expires,
			largest: msg.largest,
		};
	}

	pub fn recv_subscribe_error(&mut self, msg: ietf::SubscribeError) {
		let Some(subscription) = self.subscribes.get_mut(&msg.id) else {
			tracing::warn!(id = %msg.id, "SUBSCRIBE_ERROR for unknown subscription");
			return;
		};

		if subscription.status != SubscriptionStatus::Pending {
			tracing::warn!(id = %msg.id, status = ?subscription.status, "ignoring SUBSCRIBE_ERROR");
			return;
		}

		tracing::warn!(id = %msg.id, code = ?msg.code, reason = %msg.reason, "subscribe error");

		let retry_alias = match msg.code {
			SubscribeErrorCode::RetryTrackAlias => Some(msg.track_alias),
			_ => None,
		};

		self.aliases.remove(&subscription.track_alias);
		subscription.status = SubscriptionStatus::Error {
			code: msg.code,
			reason: msg.reason,
			retry_alias,
		};
	}

	pub fn recv_subscribe_done(&mut self, msg: ietf::SubscribeDone) {
		let Some(subscription) = self.subscribes.get_mut(&msg.id) else {
			tracing::warn!(id = %msg.id, "SUBSCRIBE_DONE for unknown subscription");
			return;
		};

		if subscription.status.is_closed() {
			tracing::warn!(id = %msg.id, status = ?subscription.status, "ignoring SUBSCRIBE_DONE");
			return;
		}

		tracing::info!(id = %msg.id, code = ?msg.code, reason = %msg.reason, final_location = ?msg.final_location, "subscribe done");

		self.aliases.remove(&subscription.track_alias);
		subscription.status = SubscriptionStatus::Done {
			code: msg.code,
			reason: msg.reason,
			final_location: msg.final_location,
		};
	}

	/// Parse a delivery on a data stream and account for any object it completes.
	pub fn recv_stream(&mut self, stream_id: StreamId, data: &[u8], fin: bool, stats: &dyn Stats) {
		if data.is_empty() && !fin {
			return;
		}

		let stream = match self.streams.entry(stream_id) {
			hash_map::Entry::Occupied(entry) => entry.into_mut(),
			hash_map::Entry::Vacant(entry) => {
				tracing::trace!(stream = %stream_id, "new data stream");
				entry.insert(GroupReader::new(self.version))
			}
		};

		let res = stream.push(data, fin);
		let header = stream.header().copied();

		match res {
			Ok(Some(object)) => {
				tracing::trace!(
					stream = %stream_id,
					group = object.header.group_id,
					subgroup = object.header.subgroup_id,
					object = object.header.object_id,
					size = object.payload.len(),
					?header,
					"received object"
				);

				stats.add_rx_bytes(object.payload.len() as u64);
				self.groups.record(
					object.header.group_id.into(),
					object.header.subgroup_id.into(),
					object.payload.len(),
				);
			}
			Ok(None) => {}
			Err(err) => {
				tracing::warn!(stream = %stream_id, %err, "dropping malformed data stream");
				self.streams.remove(&stream_id);
				return;
			}
		}

		if fin {
			self.streams.remove(&stream_id);
		}
	}

	/// Release every alias and drop any partial streams.
	pub fn close(&mut self) {
		self.aliases.clear();
		self.streams.clear();
	}
}
