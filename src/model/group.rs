use std::ops::{Deref, DerefMut};

use crate::pod::PodInfo;

/// An active-active pair of RW pods. Slots 0 and 1 are interchangeable; the
/// peer of slot `i` is slot `i XOR 1`. `backend`/`connection` identity for
/// each slot is assigned once by the Initial Configurator and never changes
/// for the lifetime of a router connection — only the `PodInfo` occupying a
/// slot is replaced across reconciliations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreGroup {
	pub slots: [PodInfo; 2],
}

impl CoreGroup {
	pub fn new(slot0: PodInfo, slot1: PodInfo) -> Self {
		CoreGroup { slots: [slot0, slot1] }
	}

	/// The index of the slot that partners `slot`.
	pub fn peer_index(slot: usize) -> usize {
		slot ^ 1
	}

	pub fn peer(&self, slot: usize) -> &PodInfo {
		&self.slots[Self::peer_index(slot)]
	}

	pub fn peer_mut(&mut self, slot: usize) -> &mut PodInfo {
		&mut self.slots[Self::peer_index(slot)]
	}

	/// True iff the two slots do not share a node, the anti-affinity
	/// invariant every group must hold.
	pub fn satisfies_anti_affinity(&self) -> bool {
		self.slots[0].node != self.slots[1].node
	}

	/// Every distinct device id known to either slot.
	pub fn device_ids(&self) -> impl Iterator<Item = &String> {
		self.slots[0].device_ids.iter().chain(self.slots[1].device_ids.iter())
	}
}

/// The flat, 1:1 sequence of RO pods, one per router RO backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoPods(pub Vec<PodInfo>);

impl Deref for RoPods {
	type Target = Vec<PodInfo>;
	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for RoPods {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

impl From<Vec<PodInfo>> for RoPods {
	fn from(v: Vec<PodInfo>) -> Self {
		RoPods(v)
	}
}
