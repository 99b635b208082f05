//! The Reconciler (spec §4.7): the long-running loop that re-lists pods
//! every 10s, refreshes device ids, detects + repairs address changes (pod
//! restarts, replacement pods), and re-asserts the router's full programmed
//! state every cycle so a previously-failed `setConnection`/`setAffinity`
//! call is retried (spec §4.4/§7).

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use arouter_model::state::SlotRef;
use arouter_model::{PodInfo, RouterState};
use arouter_rpc::{DeviceProbe, PodSource, RouterProgrammer};
use arouter_util::config::Config;

use crate::router_program;

const TICK_INTERVAL: Duration = Duration::from_secs(10);

/// Runs until `token` is cancelled, re-asserting router state every tick.
pub async fn run<L, P, R>(
	config: Config,
	pod_lister: L,
	prober: P,
	router: R,
	state: Arc<RouterState>,
	token: CancellationToken,
) where
	L: PodSource,
	P: DeviceProbe,
	R: RouterProgrammer,
{
	let mut ticker = interval(TICK_INTERVAL);
	ticker.tick().await; // first tick fires immediately; align to the interval instead

	loop {
		tokio::select! {
			_ = token.cancelled() => return,
			_ = ticker.tick() => {
				tick(&config, &pod_lister, &prober, &router, &state).await;
			}
		}
	}
}

async fn tick<L: PodSource, P: DeviceProbe, R: RouterProgrammer>(
	config: &Config,
	pod_lister: &L,
	prober: &P,
	router: &R,
	state: &RouterState,
) {
	let (rw_pods, ro_pods) = match pod_lister.list().await {
		Ok(v) => v,
		Err(e) => {
			warn!(error = %e, "pod listing failed this cycle, skipping reconciliation");
			return;
		}
	};

	if rw_pods.len() != config.num_rw_pods as usize {
		warn!(
			observed = rw_pods.len(),
			expected = config.num_rw_pods,
			"rw pod count mismatch, skipping this cycle"
		);
	} else {
		reconcile_rw(prober, router, state, &rw_pods, config.orchestrator.pod_grpc_port).await;
	}

	if ro_pods.len() != config.num_ro_pods as usize {
		warn!(
			observed = ro_pods.len(),
			expected = config.num_ro_pods,
			"ro pod count mismatch, skipping this cycle"
		);
	} else {
		reconcile_ro(router, state, &ro_pods, config.orchestrator.pod_grpc_port).await;
	}

	// Re-assert every slot's connection and every known device's affinity,
	// regardless of whether anything changed this cycle: a `setConnection`/
	// `setAffinity` that failed earlier (spec §7 `RouterCallFailed`) would
	// otherwise only be retried if an unrelated address change or discovery
	// event happened to re-touch that exact slot/device.
	router_program::program_full_state(state, router, config.orchestrator.pod_grpc_port).await;
}

/// Step 2–4 for RW pods: refresh device ids for pods already occupying a
/// slot, then repair any slot whose address no longer matches an observed
/// pod by pairing it with a same-node replacement.
async fn reconcile_rw<P: DeviceProbe, R: RouterProgrammer>(
	prober: &P,
	router: &R,
	state: &RouterState,
	observed: &[PodInfo],
	grpc_port: u16,
) {
	for pod in observed {
		if let Some(slot_ref) = state.find_rw_slot_by_name(&pod.name).await {
			let ids = prober.list(pod).await;
			if !ids.is_empty() {
				state.set_rw_device_ids(slot_ref, ids).await;
			}
			// Empty probe result: preserve the previous set rather than
			// overwriting it (spec §4.2).
		}
	}

	let groups = state.groups_snapshot().await;
	let known_addrs: HashSet<&str> = groups
		.iter()
		.flat_map(|g| g.slots.iter().map(|p| p.address.as_str()))
		.collect();

	let changed_slots: Vec<SlotRef> = groups
		.iter()
		.enumerate()
		.flat_map(|(g, group)| {
			group.slots.iter().enumerate().filter_map(move |(s, pod)| {
				if observed.iter().any(|p| p.address == pod.address) {
					None
				} else {
					Some(SlotRef { group: g, slot: s })
				}
			})
		})
		.collect();

	if changed_slots.is_empty() {
		return;
	}

	let mut new_pods: Vec<PodInfo> = observed
		.iter()
		.filter(|p| !known_addrs.contains(p.address.as_str()))
		.cloned()
		.collect();

	for slot_ref in changed_slots {
		let slot_pod = match state.rw_slot(slot_ref).await {
			Some(p) => p,
			None => continue,
		};

		let replacement_idx = new_pods.iter().position(|p| p.node == slot_pod.node);
		let Some(idx) = replacement_idx else {
			error!(
				slot_name = %slot_pod.name,
				node = %slot_pod.node,
				"no node-matching replacement for changed rw slot, leaving it untouched"
			);
			continue;
		};
		let replacement = new_pods.remove(idx);

		let peer_ref = SlotRef {
			group: slot_ref.group,
			slot: slot_ref.slot ^ 1,
		};
		let peer_ids = match state.rw_slot(peer_ref).await {
			Some(peer_pod) => prober.list(&peer_pod).await,
			None => BTreeSet::new(),
		};

		if !prober.reconcile(&replacement, peer_ids.clone()).await {
			warn!(pod = %replacement.name, "reconcile push to replacement pod failed, will retry next cycle");
		}

		let cluster = slot_pod.cluster.clone().unwrap_or_default();
		let backend = slot_pod.backend.clone().unwrap_or_default();
		let connection = slot_pod.connection.clone().unwrap_or_default();
		router
			.set_connection(&cluster, &backend, &connection, &replacement.address, grpc_port)
			.await;

		let mut new_slot_pod = replacement;
		new_slot_pod.device_ids = peer_ids;
		state.replace_rw_pod(slot_ref, new_slot_pod).await;
	}
}

/// The simpler RO variant of address reconciliation (spec §4.7): each RO
/// slot owns a single pod, so a mismatch is repaired with a plain
/// `setConnection`, no device-id reconciliation.
async fn reconcile_ro<R: RouterProgrammer>(router: &R, state: &RouterState, observed: &[PodInfo], grpc_port: u16) {
	let ro_snapshot = state.ro_pods_snapshot().await;
	let known_addrs: HashSet<&str> = ro_snapshot.iter().map(|p| p.address.as_str()).collect();

	let changed: Vec<usize> = ro_snapshot
		.iter()
		.enumerate()
		.filter(|(_, p)| !observed.iter().any(|o| o.address == p.address))
		.map(|(i, _)| i)
		.collect();

	if changed.is_empty() {
		return;
	}

	let mut new_pods: Vec<PodInfo> = observed
		.iter()
		.filter(|p| !known_addrs.contains(p.address.as_str()))
		.cloned()
		.collect();

	for idx in changed {
		let slot_pod = &ro_snapshot[idx];
		let replacement_idx = new_pods.iter().position(|p| p.node == slot_pod.node);
		let Some(pos) = replacement_idx else {
			error!(
				slot_name = %slot_pod.name,
				node = %slot_pod.node,
				"no node-matching replacement for changed ro slot, leaving it untouched"
			);
			continue;
		};
		let replacement = new_pods.remove(pos);

		let cluster = slot_pod.cluster.clone().unwrap_or_default();
		let backend = slot_pod.backend.clone().unwrap_or_default();
		let connection = slot_pod.connection.clone().unwrap_or_default();
		router
			.set_connection(&cluster, &backend, &connection, &replacement.address, grpc_port)
			.await;

		state.replace_ro_pod(idx, replacement).await;
	}
}
