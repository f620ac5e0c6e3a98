//! Object accounting.
//!
//! [GroupStats] tracks what arrived per group. The [Stats] trait is an application-level byte counter,
//! ignoring transport effects such as retransmissions.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A sink for application-level byte accounting.
///
/// Implementations should be fast and non-blocking (e.g., atomics).
pub trait Stats: Send + Sync + 'static {
	/// Record object payload bytes received.
	fn add_rx_bytes(&self, bytes: u64);

	/// Record control bytes sent.
	fn add_tx_bytes(&self, bytes: u64);
}

/// Default stats sink that does nothing.
#[derive(Default)]
pub struct NoopStats;

impl Stats for NoopStats {
	fn add_rx_bytes(&self, _bytes: u64) {}
	fn add_tx_bytes(&self, _bytes: u64) {}
}

#[derive(Default, Debug)]
struct GroupStat {
	objects: u64,
	bytes: u64,
	subgroups: BTreeSet<u64>,
}

/// A point-in-time copy of a group's counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GroupSnapshot {
	pub objects: u64,
	pub bytes: u64,

	/// Every subgroup observed, sorted.
	pub subgroups: Vec<u64>,
}

/// Per-group object counters, created lazily on the first object of each group.
#[derive(Default, Debug)]
pub struct GroupStats {
	groups: HashMap<u64, GroupStat>,
}

impl GroupStats {
	pub fn new() -> Self {
		Self::default()
	}

	/// Account for one object.
	pub fn record(&mut self, group: u64, subgroup: u64, bytes: usize) {
		let stat = self.groups.entry(group).or_default();
		stat.objects += 1;
		stat.bytes += bytes as u64;
		stat.subgroups.insert(subgroup);
	}

	pub fn len(&self) -> usize {
		self.groups.len()
	}

	pub fn is_empty(&self) -> bool {
		self.groups.is_empty()
	}

	/// The total number of objects across every group.
	pub fn objects(&self) -> u64 {
		self.groups.values().map(|stat| stat.objects).sum()
	}

	pub fn snapshot(&self) -> BTreeMap<u64, GroupSnapshot> {
		self.groups
			.iter()
			.map(|(group, stat)| {
				let snapshot = GroupSnapshot {
					objects: stat.objects,
					bytes: stat.bytes,
					subgroups: stat.subgroups.iter().copied().collect(),
				};
				(*group, snapshot)
			})
			.collect()
	}
}
