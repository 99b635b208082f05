//! Trait seams over the external collaborators, so the reconciliation logic
//! in `arouter-agent` can be exercised against in-memory fakes instead of a
//! live cluster/router/pod fleet (spec §9 test-tooling guidance).

use std::collections::BTreeSet;

use async_trait::async_trait;

use arouter_model::PodInfo;
use arouter_util::error::Result;

#[async_trait]
pub trait PodSource: Send + Sync {
	async fn list(&self) -> Result<(Vec<PodInfo>, Vec<PodInfo>)>;
}

#[async_trait]
pub trait DeviceProbe: Send + Sync {
	async fn list(&self, pod: &PodInfo) -> BTreeSet<String>;
	async fn reconcile(&self, pod: &PodInfo, ids: BTreeSet<String>) -> bool;
}

#[async_trait]
pub trait RouterProgrammer: Send + Sync {
	async fn set_connection(&self, cluster: &str, backend: &str, connection: &str, addr: &str, port: u16);
	async fn set_affinity(&self, cluster: &str, backend: &str, device_id: &str);

	/// True once the control channel should be treated as down (§4.7
	/// `RouterChannelDown`).
	fn is_down(&self) -> bool;
}
