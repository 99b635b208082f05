//! The Device-ID Prober (§4.2): opens a short-lived gRPC channel per pod per
//! call and either lists or reconciles device ids. Every call is bounded by
//! a 5s dial timeout and a 5s call timeout so that a wedged pod can never
//! hold up the containing loop for more than ~5s.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::Channel;
use tracing::warn;

use arouter_model::PodInfo;
use arouter_proto::core_adapter::core_adapter_client::CoreAdapterClient;
use arouter_proto::core_adapter::{Empty, IDs, ID};
use arouter_util::error::Error;

use crate::traits::DeviceProbe;

const DIAL_TIMEOUT: Duration = Duration::from_secs(5);
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct DeviceProber {
	grpc_port: u16,
}

impl DeviceProber {
	pub fn new(grpc_port: u16) -> Self {
		DeviceProber { grpc_port }
	}

	async fn connect(&self, pod: &PodInfo) -> anyhow::Result<CoreAdapterClient<Channel>> {
		let endpoint = format!("http://{}:{}", pod.address, self.grpc_port);
		let channel = Channel::from_shared(endpoint)?
			.connect_timeout(DIAL_TIMEOUT)
			.timeout(CALL_TIMEOUT)
			.connect()
			.await?;
		Ok(CoreAdapterClient::new(channel))
	}

	/// The device ids currently owned by `pod`. On any failure (dial
	/// timeout, transport error, RPC error) returns an empty set — the
	/// caller is responsible for preserving the previous set rather than
	/// overwriting it with this empty result, per §4.2.
	pub async fn list(&self, pod: &PodInfo) -> BTreeSet<String> {
		match self.try_list(pod).await {
			Ok(ids) => ids,
			Err(e) => {
				let err = Error::PodUnreachable { pod: pod.name.clone(), source: e };
				warn!(error = %err, "device id probe failed, preserving previous set");
				BTreeSet::new()
			}
		}
	}

	async fn try_list(&self, pod: &PodInfo) -> anyhow::Result<BTreeSet<String>> {
		let mut client = self.connect(pod).await?;
		let resp = client.list_device_ids(Empty {}).await?;
		Ok(resp.into_inner().items.into_iter().map(|id| id.id).collect())
	}

	/// Pushes `ids` onto `pod`, used to seed a replacement pod with its
	/// peer's device set after a restart. Returns `false` on any failure;
	/// the caller logs and retries on the next reconciliation tick.
	pub async fn reconcile(&self, pod: &PodInfo, ids: BTreeSet<String>) -> bool {
		match self.try_reconcile(pod, ids).await {
			Ok(()) => true,
			Err(e) => {
				let err = Error::PodUnreachable { pod: pod.name.clone(), source: e };
				warn!(error = %err, "device id reconcile failed, will retry next cycle");
				false
			}
		}
	}

	async fn try_reconcile(&self, pod: &PodInfo, ids: BTreeSet<String>) -> anyhow::Result<()> {
		let mut client = self.connect(pod).await?;
		let items = ids.into_iter().map(|id| ID { id }).collect();
		client.reconcile_devices(IDs { items }).await?;
		Ok(())
	}
}

#[async_trait]
impl DeviceProbe for DeviceProber {
	async fn list(&self, pod: &PodInfo) -> BTreeSet<String> {
		DeviceProber::list(self, pod).await
	}

	async fn reconcile(&self, pod: &PodInfo, ids: BTreeSet<String>) -> bool {
		DeviceProber::reconcile(self, pod, ids).await
	}
}
