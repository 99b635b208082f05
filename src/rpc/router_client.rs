//! The Router Programmer (§4.4): wraps the two idempotent Affinity Router
//! RPCs, and tracks consecutive call failures so the supervisor's watchdog
//! (§5, §9) can detect a dead control channel without a dedicated
//! heartbeat RPC — the two RPCs the router exposes are the only signal
//! available, so they double as the liveness probe.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::Channel;
use tracing::{error, warn};

use arouter_proto::affinity_router::affinity_router_client::AffinityRouterClient;
use arouter_proto::affinity_router::{Affinity, Conn};
use arouter_util::error::{Error, Result};

use crate::traits::RouterProgrammer;

/// The `route` scope used for all device-affinity bindings. Not
/// configurable: the specification's environment table has no corresponding
/// key, and every scenario in §8 uses this fixed value.
const DEVICE_MANAGER_ROUTE: &str = "dev_manager";

/// The `server` field on every `Conn` the agent issues — a router-side
/// constant identifying the command channel, not a per-call value.
const GRPC_COMMAND_SERVER: &str = "grpc_command";

/// Consecutive RPC failures before the channel is considered down and the
/// supervisor should cancel and reconnect.
const FAILURE_THRESHOLD: u32 = 3;

#[derive(Clone)]
pub struct RouterClient {
	client: AffinityRouterClient<Channel>,
	router_name: String,
	consecutive_failures: Arc<AtomicU32>,
}

impl RouterClient {
	pub fn connect_lazy(api_address: &str, router_name: impl Into<String>) -> Result<Self> {
		let endpoint = format!("http://{api_address}");
		let channel = Channel::from_shared(endpoint)
			.map_err(|e| Error::RouterCallFailed(e.to_string()))?
			.timeout(Duration::from_secs(5))
			.connect_lazy();

		Ok(RouterClient {
			client: AffinityRouterClient::new(channel),
			router_name: router_name.into(),
			consecutive_failures: Arc::new(AtomicU32::new(0)),
		})
	}

	/// True once enough consecutive calls have failed that the control
	/// channel should be treated as down (§4.7 `RouterChannelDown`).
	pub fn is_down(&self) -> bool {
		self.consecutive_failures.load(Ordering::Relaxed) >= FAILURE_THRESHOLD
	}

	pub fn router_name(&self) -> &str {
		&self.router_name
	}

	pub async fn set_connection(&self, cluster: &str, backend: &str, connection: &str, addr: &str, port: u16) {
		let req = Conn {
			server: GRPC_COMMAND_SERVER.to_string(),
			cluster: cluster.to_string(),
			backend: backend.to_string(),
			connection: connection.to_string(),
			addr: addr.to_string(),
			port: port as u32,
		};

		let mut client = self.client.clone();
		match client.set_connection(req).await {
			Ok(_) => self.consecutive_failures.store(0, Ordering::Relaxed),
			Err(e) => {
				self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
				warn!(cluster, backend, connection, error = %e, "setConnection failed, will retry next cycle");
			}
		}
	}

	pub async fn set_affinity(&self, cluster: &str, backend: &str, device_id: &str) {
		let req = Affinity {
			router: self.router_name.clone(),
			route: DEVICE_MANAGER_ROUTE.to_string(),
			cluster: cluster.to_string(),
			backend: backend.to_string(),
			id: device_id.to_string(),
		};

		let mut client = self.client.clone();
		match client.set_affinity(req).await {
			Ok(_) => self.consecutive_failures.store(0, Ordering::Relaxed),
			Err(e) => {
				self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
				warn!(cluster, backend, device_id, error = %e, "setAffinity failed, will retry next cycle");
			}
		}
	}
}

/// Logs a hard router-channel-down condition; called by the supervisor
/// right before it cancels the per-connection token.
pub fn log_channel_down(router_name: &str) {
	error!(router = router_name, "router control channel considered down, reconnecting");
}

#[async_trait]
impl RouterProgrammer for RouterClient {
	async fn set_connection(&self, cluster: &str, backend: &str, connection: &str, addr: &str, port: u16) {
		RouterClient::set_connection(self, cluster, backend, connection, addr, port).await
	}

	async fn set_affinity(&self, cluster: &str, backend: &str, device_id: &str) {
		RouterClient::set_affinity(self, cluster, backend, device_id).await
	}

	fn is_down(&self) -> bool {
		RouterClient::is_down(self)
	}
}
