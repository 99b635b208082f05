//! The pairing algorithm: turns `2N` RW pods into `N` active-active groups.
//!
//! Three phases, run in order:
//!
//! - Phase A pairs pods whose device sets intersect, preferring node-distinct
//!   partners, stopping as soon as `N` groups have been started or the pool
//!   is exhausted.
//! - Phase B starts singleton groups from the pods Phase A set aside (empty
//!   device sets, or pods the early stop skipped), as long as doing so
//!   doesn't immediately violate anti-affinity against an already-started
//!   group's first slot.
//! - Phase C treats the remaining incomplete groups as a constraint
//!   satisfaction problem: repeatedly assign any group with exactly one
//!   node-valid candidate left, falling back to an arbitrary pending group
//!   only once no such forced choice exists.
//!
//! Every choice that isn't forced breaks ties by the input's iteration
//! order, so the algorithm is deterministic given a fixed input ordering
//! (the Pod Lister itself makes no ordering guarantee, so this determinism
//! is local to one call, not a property of two successive polls).

use arouter_util::error::{Error, Result};

use crate::group::CoreGroup;
use crate::pod::PodInfo;

pub fn group_rw_pods(pods: Vec<PodInfo>) -> Result<Vec<CoreGroup>> {
	let total = pods.len();
	if total == 0 || total % 2 != 0 {
		warn!(count = total, "rw pod count is zero or odd, refusing to group");
		return Err(Error::InsufficientNodeDiversity);
	}
	let n = total / 2;

	let (mut groups, remaining) = phase_a(pods, n);
	let remaining = phase_b(&mut groups, remaining, n);
	if let Err(e) = phase_c(&mut groups, remaining) {
		warn!(error = %e, "phase c could not satisfy anti-affinity with the remaining pool");
		return Err(e);
	}

	debug!(groups = n, "grouped rw pods into active-active pairs");
	Ok(groups
		.into_iter()
		.map(|mut g| {
			let slot1 = g.pop().expect("phase c leaves every group at size 2");
			let slot0 = g.pop().expect("phase c leaves every group at size 2");
			CoreGroup::new(slot0, slot1)
		})
		.collect())
}

/// Returns the partial groups started (each of size 1 or 2) and the pool of
/// pods set aside: empty-device pods encountered during the walk, plus
/// whatever the walk never reached because `n` groups were already started.
fn phase_a(pods: Vec<PodInfo>, n: usize) -> (Vec<Vec<PodInfo>>, Vec<PodInfo>) {
	let mut pool = pods;
	let mut groups: Vec<Vec<PodInfo>> = Vec::with_capacity(n);
	let mut empties: Vec<PodInfo> = Vec::new();

	while groups.len() < n && !pool.is_empty() {
		let p = pool.remove(0);
		if p.device_ids.is_empty() {
			empties.push(p);
			continue;
		}

		let partner = pool
			.iter()
			.position(|q| !q.device_ids.is_empty() && q.node != p.node && p.shares_device_with(q));

		match partner {
			Some(idx) => {
				let q = pool.remove(idx);
				groups.push(vec![p, q]);
			}
			None => groups.push(vec![p]),
		}
	}

	empties.extend(pool);
	(groups, empties)
}

/// Starts singleton groups from `pool` until `n` groups exist or the pool is
/// exhausted, skipping a pod whose node is already a first slot in an
/// existing group. Returns the pods left unconsumed for Phase C.
fn phase_b(groups: &mut Vec<Vec<PodInfo>>, pool: Vec<PodInfo>, n: usize) -> Vec<PodInfo> {
	let mut pool = pool;
	let mut idx = 0;

	while groups.len() < n && idx < pool.len() {
		let node_taken = groups.iter().any(|g| g[0].node == pool[idx].node);
		if node_taken {
			idx += 1;
		} else {
			let p = pool.remove(idx);
			groups.push(vec![p]);
		}
	}

	pool
}

/// Fills every group still at size 1 from `pool`, treating it as a small
/// constraint-satisfaction problem. Fails with
/// [`Error::InsufficientNodeDiversity`] the moment some incomplete group has
/// no node-valid candidate left in the pool.
fn phase_c(groups: &mut [Vec<PodInfo>], pool: Vec<PodInfo>) -> Result<()> {
	let mut pool = pool;
	let mut incomplete: Vec<usize> = groups
		.iter()
		.enumerate()
		.filter(|(_, g)| g.len() == 1)
		.map(|(i, _)| i)
		.collect();

	while !incomplete.is_empty() {
		let candidate_lists: Vec<(usize, Vec<usize>)> = incomplete
			.iter()
			.map(|&gi| {
				let slot0_node = &groups[gi][0].node;
				let cands = pool
					.iter()
					.enumerate()
					.filter(|(_, p)| &p.node != slot0_node)
					.map(|(pi, _)| pi)
					.collect();
				(gi, cands)
			})
			.collect();

		if candidate_lists.iter().any(|(_, c)| c.is_empty()) {
			return Err(Error::InsufficientNodeDiversity);
		}

		let forced = candidate_lists.iter().find(|(_, c)| c.len() == 1);
		let (gi, pool_idx) = match forced {
			Some((gi, cands)) => (*gi, cands[0]),
			None => {
				let (gi, cands) = &candidate_lists[0];
				(*gi, cands[0])
			}
		};

		let pod = pool.remove(pool_idx);
		groups[gi].push(pod);
		incomplete.retain(|&x| x != gi);
	}

	if !pool.is_empty() {
		return Err(Error::InsufficientNodeDiversity);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pod(name: &str, node: &str, devices: &[&str]) -> PodInfo {
		PodInfo::new(name, format!("10.0.0.{name}"), node).with_devices(devices.iter().copied())
	}

	fn assert_valid_grouping(groups: &[CoreGroup], expected_pods: usize) {
		let mut seen = std::collections::HashSet::new();
		for g in groups {
			assert!(g.satisfies_anti_affinity(), "group shares a node: {g:?}");
			for slot in &g.slots {
				assert!(seen.insert(slot.name.clone()), "pod {} appears twice", slot.name);
			}
		}
		assert_eq!(seen.len(), expected_pods);
	}

	#[test]
	fn two_pods_intersecting_devices_different_nodes() {
		let p1 = pod("p1", "A", &["d1"]);
		let p2 = pod("p2", "B", &["d1"]);
		let groups = group_rw_pods(vec![p1, p2]).unwrap();
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].slots[0].name, "p1");
		assert_eq!(groups[0].slots[1].name, "p2");
	}

	#[test]
	fn two_pods_same_node_intersecting_devices_is_insufficient_diversity() {
		let p1 = pod("p1", "A", &["d1"]);
		let p2 = pod("p2", "A", &["d1"]);
		let err = group_rw_pods(vec![p1, p2]).unwrap_err();
		assert!(matches!(err, Error::InsufficientNodeDiversity));
	}

	#[test]
	fn four_pods_one_intersecting_pair_two_empty() {
		let p1 = pod("p1", "A", &["d1"]);
		let p2 = pod("p2", "B", &["d1"]);
		let p3 = pod("p3", "C", &[]);
		let p4 = pod("p4", "D", &[]);
		let groups = group_rw_pods(vec![p1, p2, p3, p4]).unwrap();
		assert_eq!(groups.len(), 2);
		assert_valid_grouping(&groups, 4);

		let paired_names: Vec<Vec<&str>> = groups
			.iter()
			.map(|g| vec![g.slots[0].name.as_str(), g.slots[1].name.as_str()])
			.collect();
		assert!(paired_names.iter().any(|g| g.contains(&"p1") && g.contains(&"p2")));
	}

	#[test]
	fn six_pods_all_empty_device_sets_still_group_by_anti_affinity() {
		let pods = vec![
			pod("p1", "A", &[]),
			pod("p2", "B", &[]),
			pod("p3", "C", &[]),
			pod("p4", "D", &[]),
			pod("p5", "E", &[]),
			pod("p6", "F", &[]),
		];
		let groups = group_rw_pods(pods).unwrap();
		assert_eq!(groups.len(), 3);
		assert_valid_grouping(&groups, 6);
	}

	#[test]
	fn odd_pod_count_is_rejected() {
		let pods = vec![pod("p1", "A", &["d1"]), pod("p2", "B", &[]), pod("p3", "C", &[])];
		let err = group_rw_pods(pods).unwrap_err();
		assert!(matches!(err, Error::InsufficientNodeDiversity));
	}

	#[test]
	fn three_nodes_force_unique_pairing() {
		// p1/p2 share a node: neither Phase A nor Phase C may pair them
		// together, forcing p1 or p2 to pair with p3 instead.
		let p1 = pod("p1", "A", &[]);
		let p2 = pod("p2", "A", &[]);
		let p3 = pod("p3", "B", &[]);
		let p4 = pod("p4", "C", &[]);
		let groups = group_rw_pods(vec![p1, p2, p3, p4]).unwrap();
		assert_eq!(groups.len(), 2);
		assert_valid_grouping(&groups, 4);
	}
}
