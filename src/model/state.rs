//! The live, in-memory router model: `groups` and `ro_pods`, scoped to one
//! router connection and discarded on reconnect (§3 "Lifecycle", §9
//! "Implicit shared state" — this is passed around explicitly rather than
//! held as a process-wide global). Reads and writes are serialized by a
//! single mutex held only around the slot access itself; callers must never
//! hold the guard across an RPC.

use std::collections::BTreeSet;

use tokio::sync::{Mutex, MutexGuard};

use crate::group::{CoreGroup, RoPods};
use crate::pod::PodInfo;

struct Inner {
	groups: Vec<CoreGroup>,
	ro_pods: RoPods,
}

pub struct RouterState {
	inner: Mutex<Inner>,
	pub rw_cluster_name: String,
	pub ro_cluster_name: String,
}

/// Assigns router coordinates to every slot, per the naming scheme in the
/// specification: `backend = cluster + (index+1)`, `connection = backend +
/// (slot+1)` for RW pairs, `connection = backend + "1"` for the single-slot
/// RO backends.
pub fn assign_coordinates(
	groups: &mut [CoreGroup],
	ro_pods: &mut RoPods,
	rw_cluster_name: &str,
	ro_cluster_name: &str,
) {
	for (g, group) in groups.iter_mut().enumerate() {
		let backend = format!("{rw_cluster_name}{}", g + 1);
		for (s, slot) in group.slots.iter_mut().enumerate() {
			slot.cluster = Some(rw_cluster_name.to_string());
			slot.backend = Some(backend.clone());
			slot.connection = Some(format!("{backend}{}", s + 1));
		}
	}

	for (k, pod) in ro_pods.iter_mut().enumerate() {
		let backend = format!("{ro_cluster_name}{}", k + 1);
		pod.cluster = Some(ro_cluster_name.to_string());
		pod.backend = Some(backend.clone());
		pod.connection = Some(format!("{backend}1"));
	}
}

/// Identifies one RW slot by group and slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef {
	pub group: usize,
	pub slot: usize,
}

impl RouterState {
	/// Builds a fresh state from a grouping result, assigning coordinates.
	/// Coordinates, once assigned here, are never recomputed for the
	/// lifetime of this `RouterState` (i.e. of one router connection).
	pub fn new(
		mut groups: Vec<CoreGroup>,
		mut ro_pods: RoPods,
		rw_cluster_name: impl Into<String>,
		ro_cluster_name: impl Into<String>,
	) -> Self {
		let rw_cluster_name = rw_cluster_name.into();
		let ro_cluster_name = ro_cluster_name.into();
		assign_coordinates(&mut groups, &mut ro_pods, &rw_cluster_name, &ro_cluster_name);
		RouterState {
			inner: Mutex::new(Inner { groups, ro_pods }),
			rw_cluster_name,
			ro_cluster_name,
		}
	}

	async fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().await
	}

	pub async fn groups_snapshot(&self) -> Vec<CoreGroup> {
		self.lock().await.groups.clone()
	}

	pub async fn ro_pods_snapshot(&self) -> RoPods {
		self.lock().await.ro_pods.clone()
	}

	pub async fn group_count(&self) -> usize {
		self.lock().await.groups.len()
	}

	pub async fn ro_pod_count(&self) -> usize {
		self.lock().await.ro_pods.len()
	}

	/// Locates the group/slot whose pod name matches `name`.
	pub async fn find_rw_slot_by_name(&self, name: &str) -> Option<SlotRef> {
		let inner = self.lock().await;
		for (g, group) in inner.groups.iter().enumerate() {
			for (s, pod) in group.slots.iter().enumerate() {
				if pod.name == name {
					return Some(SlotRef { group: g, slot: s });
				}
			}
		}
		None
	}

	/// Locates the RW slot whose pod currently owns `device_id`.
	pub async fn find_rw_slot_by_device(&self, device_id: &str) -> Option<SlotRef> {
		let inner = self.lock().await;
		for (g, group) in inner.groups.iter().enumerate() {
			for (s, pod) in group.slots.iter().enumerate() {
				if pod.device_ids.contains(device_id) {
					return Some(SlotRef { group: g, slot: s });
				}
			}
		}
		None
	}

	/// The backend name for a slot — the router identity shared by both
	/// pods in the group, per §3 ("either slot suffices").
	pub async fn backend_for_slot(&self, slot_ref: SlotRef) -> Option<String> {
		let inner = self.lock().await;
		inner
			.groups
			.get(slot_ref.group)
			.and_then(|g| g.slots[slot_ref.slot].backend.clone())
	}

	pub async fn rw_slot(&self, slot_ref: SlotRef) -> Option<PodInfo> {
		let inner = self.lock().await;
		inner.groups.get(slot_ref.group).map(|g| g.slots[slot_ref.slot].clone())
	}

	pub async fn ro_pod(&self, index: usize) -> Option<PodInfo> {
		self.lock().await.ro_pods.get(index).cloned()
	}

	/// Replaces the pod occupying `slot_ref`, carrying the slot's identity
	/// (`cluster`/`backend`/`connection`) forward onto `new_pod` — slot
	/// identity never changes, only the pod behind it.
	pub async fn replace_rw_pod(&self, slot_ref: SlotRef, mut new_pod: PodInfo) {
		let mut inner = self.lock().await;
		if let Some(group) = inner.groups.get_mut(slot_ref.group) {
			let old = &group.slots[slot_ref.slot];
			debug!(
				group = slot_ref.group,
				slot = slot_ref.slot,
				old_pod = %old.name,
				new_pod = %new_pod.name,
				backend = old.backend.as_deref().unwrap_or(""),
				"replacing rw slot occupant, carrying slot identity forward"
			);
			new_pod.cluster = old.cluster.clone();
			new_pod.backend = old.backend.clone();
			new_pod.connection = old.connection.clone();
			group.slots[slot_ref.slot] = new_pod;
		}
	}

	pub async fn replace_ro_pod(&self, index: usize, mut new_pod: PodInfo) {
		let mut inner = self.lock().await;
		if let Some(slot) = inner.ro_pods.get_mut(index) {
			new_pod.cluster = slot.cluster.clone();
			new_pod.backend = slot.backend.clone();
			new_pod.connection = slot.connection.clone();
			*slot = new_pod;
		}
	}

	pub async fn set_rw_device_ids(&self, slot_ref: SlotRef, ids: BTreeSet<String>) {
		let mut inner = self.lock().await;
		if let Some(group) = inner.groups.get_mut(slot_ref.group) {
			group.slots[slot_ref.slot].device_ids = ids;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pod::PodInfo;

	fn group(a_name: &str, a_node: &str, b_name: &str, b_node: &str) -> CoreGroup {
		CoreGroup::new(
			PodInfo::new(a_name, "1.1.1.1", a_node),
			PodInfo::new(b_name, "1.1.1.2", b_node),
		)
	}

	#[tokio::test]
	async fn coordinates_follow_the_naming_scheme() {
		let groups = vec![group("p1", "A", "p2", "B"), group("p3", "C", "p4", "D")];
		let ro = RoPods(vec![PodInfo::new("ro1", "2.2.2.1", "E")]);
		let state = RouterState::new(groups, ro, "vcore", "ro_vcore");

		let slot = state.find_rw_slot_by_name("p3").await.unwrap();
		assert_eq!(slot, SlotRef { group: 1, slot: 0 });
		assert_eq!(state.backend_for_slot(slot).await.unwrap(), "vcore2");

		let snapshot = state.groups_snapshot().await;
		assert_eq!(snapshot[0].slots[0].connection.as_deref(), Some("vcore11"));
		assert_eq!(snapshot[0].slots[1].connection.as_deref(), Some("vcore12"));
		assert_eq!(snapshot[1].slots[1].connection.as_deref(), Some("vcore22"));

		let ro_snapshot = state.ro_pods_snapshot().await;
		assert_eq!(ro_snapshot[0].backend.as_deref(), Some("ro_vcore1"));
		assert_eq!(ro_snapshot[0].connection.as_deref(), Some("ro_vcore11"));
	}

	#[tokio::test]
	async fn replacing_a_slot_preserves_its_identity() {
		let groups = vec![group("p1", "A", "p2", "B")];
		let state = RouterState::new(groups, RoPods::default(), "vcore", "ro_vcore");

		let slot = SlotRef { group: 0, slot: 1 };
		let replacement = PodInfo::new("p2-replacement", "9.9.9.9", "B");
		state.replace_rw_pod(slot, replacement).await;

		let pod = state.rw_slot(slot).await.unwrap();
		assert_eq!(pod.name, "p2-replacement");
		assert_eq!(pod.address, "9.9.9.9");
		assert_eq!(pod.backend.as_deref(), Some("vcore1"));
		assert_eq!(pod.connection.as_deref(), Some("vcore12"));
	}

	#[tokio::test]
	async fn device_lookup_resolves_either_slot_to_the_group_backend() {
		let mut groups = vec![group("p1", "A", "p2", "B")];
		groups[0].slots[1].device_ids.insert("d99".to_string());
		let state = RouterState::new(groups, RoPods::default(), "vcore", "ro_vcore");

		let slot = state.find_rw_slot_by_device("d99").await.unwrap();
		assert_eq!(slot.group, 0);
		assert_eq!(state.backend_for_slot(slot).await.unwrap(), "vcore1");
	}
}
