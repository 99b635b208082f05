//! The Discovery Monitor (spec §4.6): subscribes to the event bus and
//! programs a single affinity entry per device-discovered event.
//!
//! Binding rule (spec §9 "opaque event payloads", resolved concretely in
//! `arouter-proto::events`): if the event names a pod, resolve the group
//! whose slot matches that pod's name; otherwise scan every currently-known
//! pod's device set for the id and use the owning pod's backend. An event
//! that resolves neither way is logged and dropped.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use arouter_model::RouterState;
use arouter_rpc::{EventBus, RouterProgrammer};

/// Runs until the bus returns a fatal error or `token` is cancelled.
pub async fn run<R: RouterProgrammer>(
	state: Arc<RouterState>,
	event_bus: EventBus,
	router: R,
	token: CancellationToken,
) {
	loop {
		let next = tokio::select! {
			_ = token.cancelled() => return,
			res = event_bus.next_device_discovered() => res,
		};

		let (device_id, pod_name) = match next {
			Ok(event) => event,
			Err(e) => {
				error!(error = %e, "event bus subscription failed, discovery monitor stopping");
				return;
			}
		};

		handle_event(&state, &router, &device_id, pod_name.as_deref()).await;
	}
}

/// Resolves one device-discovered event to a backend and programs its
/// affinity, per the binding rule documented above. Split out from the
/// subscription loop so it can be exercised directly against a fake router,
/// without needing a live event bus.
async fn handle_event<R: RouterProgrammer>(state: &RouterState, router: &R, device_id: &str, pod_name: Option<&str>) {
	let slot_ref = match pod_name {
		Some(name) => state.find_rw_slot_by_name(name).await,
		None => None,
	};
	let slot_ref = match slot_ref {
		Some(s) => Some(s),
		None => state.find_rw_slot_by_device(device_id).await,
	};

	let Some(slot_ref) = slot_ref else {
		warn!(device_id = %device_id, pod_name = ?pod_name, "device-discovered event did not resolve to a known pod, dropping");
		return;
	};

	let Some(backend) = state.backend_for_slot(slot_ref).await else {
		return;
	};

	router.set_affinity(&state.rw_cluster_name, &backend, device_id).await;
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::FakeRouter;
	use arouter_model::{CoreGroup, PodInfo, RoPods};

	fn state_with_one_group() -> RouterState {
		let group = CoreGroup::new(
			PodInfo::new("rw-core1-aaa", "10.0.0.1", "node-a"),
			PodInfo::new("rw-core1-bbb", "10.0.0.2", "node-b"),
		);
		RouterState::new(vec![group], RoPods::default(), "vcore", "ro_vcore")
	}

	#[tokio::test]
	async fn resolves_by_pod_name_when_present() {
		let state = state_with_one_group();
		let router = FakeRouter::new();

		handle_event(&state, &router, "d99", Some("rw-core1-bbb")).await;

		assert_eq!(router.affinities(), vec![("vcore".to_string(), "vcore1".to_string(), "d99".to_string())]);
	}

	#[tokio::test]
	async fn falls_back_to_device_id_lookup_without_pod_name() {
		let state = state_with_one_group();
		let slot = state.find_rw_slot_by_name("rw-core1-aaa").await.unwrap();
		state
			.set_rw_device_ids(slot, std::iter::once("d99".to_string()).collect())
			.await;
		let router = FakeRouter::new();

		handle_event(&state, &router, "d99", None).await;

		assert_eq!(router.affinities(), vec![("vcore".to_string(), "vcore1".to_string(), "d99".to_string())]);
	}

	#[tokio::test]
	async fn unresolvable_event_is_dropped_without_a_router_call() {
		let state = state_with_one_group();
		let router = FakeRouter::new();

		handle_event(&state, &router, "unknown-device", None).await;

		assert!(router.affinities().is_empty());
	}
}
