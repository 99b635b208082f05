//! Pushes the full contents of a [`RouterState`] to the router: every known
//! device affinity and every slot's connection. Shared by the Initial
//! Configurator (which calls this once, to seed the router) and the
//! Reconciler (which calls this every tick, to re-assert state so a
//! `setConnection`/`setAffinity` that failed on a previous cycle is retried —
//! spec §4.4/§7: "the periodic reconciler will retry on the next cycle").
//! Both families of call are idempotent at the router, so re-emitting
//! unchanged values is always safe.

use arouter_model::RouterState;
use arouter_rpc::RouterProgrammer;

/// Emits every known affinity for a slot before its connection — the two
/// families of call commute at the router, so this ordering is a choice,
/// not a requirement (spec §4.5 step 5).
pub async fn program_full_state<R: RouterProgrammer>(state: &RouterState, router: &R, grpc_port: u16) {
	for group in state.groups_snapshot().await {
		for pod in &group.slots {
			let cluster = pod.cluster.as_deref().expect("coordinates assigned by RouterState::new");
			let backend = pod.backend.as_deref().expect("coordinates assigned by RouterState::new");
			let connection = pod.connection.as_deref().expect("coordinates assigned by RouterState::new");

			for device_id in &pod.device_ids {
				router.set_affinity(cluster, backend, device_id).await;
			}
			router.set_connection(cluster, backend, connection, &pod.address, grpc_port).await;
		}
	}

	for pod in state.ro_pods_snapshot().await.iter() {
		let cluster = pod.cluster.as_deref().expect("coordinates assigned by RouterState::new");
		let backend = pod.backend.as_deref().expect("coordinates assigned by RouterState::new");
		let connection = pod.connection.as_deref().expect("coordinates assigned by RouterState::new");
		router.set_connection(cluster, backend, connection, &pod.address, grpc_port).await;
	}
}
