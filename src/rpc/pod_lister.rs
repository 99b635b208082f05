//! The Pod Lister (§4.1): polls the orchestrator and splits the result into
//! RW and RO buckets by name pattern, after filtering to pods that are
//! actually up.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::config::{Config as KubeConfig, KubeConfigOptions, Kubeconfig};
use kube::Client;
use once_cell::sync::Lazy;
use regex::Regex;

use arouter_model::PodInfo;
use arouter_util::error::{Error, Result};

use crate::traits::PodSource;

static RW_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"rw-core\d+-").unwrap());
static RO_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"ro-core-").unwrap());

#[derive(Clone)]
pub struct PodLister {
	client: Client,
	namespace: String,
}

impl PodLister {
	/// Builds an orchestrator client from the `K8S_API_SERVER` /
	/// `K8S_KUBE_CONFIG_PATH` configuration: an explicit kubeconfig path
	/// wins, then an explicit API server override, then in-cluster
	/// discovery (empty values on both keys, per the configuration table).
	pub async fn connect(api_server: &str, kube_config_path: &str, namespace: impl Into<String>) -> Result<Self> {
		let config = if !kube_config_path.is_empty() {
			let kubeconfig = Kubeconfig::read_from(kube_config_path)
				.map_err(|e| Error::OrchestratorUnavailable(e.to_string()))?;
			KubeConfig::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
				.await
				.map_err(|e| Error::OrchestratorUnavailable(e.to_string()))?
		} else if !api_server.is_empty() {
			let mut config = KubeConfig::infer()
				.await
				.map_err(|e| Error::OrchestratorUnavailable(e.to_string()))?;
			config.cluster_url = api_server
				.parse()
				.map_err(|e: http::uri::InvalidUri| Error::OrchestratorUnavailable(e.to_string()))?;
			config
		} else {
			KubeConfig::infer()
				.await
				.map_err(|e| Error::OrchestratorUnavailable(e.to_string()))?
		};

		let client = Client::try_from(config).map_err(|e| Error::OrchestratorUnavailable(e.to_string()))?;
		Ok(PodLister { client, namespace: namespace.into() })
	}

	pub fn from_client(client: Client, namespace: impl Into<String>) -> Self {
		PodLister { client, namespace: namespace.into() }
	}

	/// Lists pods, filters to running/ready ones, and splits by name into
	/// RW and RO buckets. The orchestrator makes no ordering guarantee and
	/// neither does this call; downstream code must not depend on it.
	pub async fn list(&self) -> Result<(Vec<PodInfo>, Vec<PodInfo>)> {
		let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
		let pods = api
			.list(&ListParams::default())
			.await
			.map_err(|e| Error::OrchestratorUnavailable(e.to_string()))?;

		let mut rw = Vec::new();
		let mut ro = Vec::new();

		for pod in pods.items {
			if !is_running_and_ready(&pod) {
				continue;
			}
			let Some(name) = pod.metadata.name.clone() else {
				continue;
			};
			let Some(info) = pod_info_from(&pod, name.clone()) else {
				continue;
			};

			// RW first, else RO, else discard (§4.1 matching order).
			if RW_NAME.is_match(&name) {
				rw.push(info);
			} else if RO_NAME.is_match(&name) {
				ro.push(info);
			}
		}

		Ok((rw, ro))
	}
}

#[async_trait]
impl PodSource for PodLister {
	async fn list(&self) -> Result<(Vec<PodInfo>, Vec<PodInfo>)> {
		PodLister::list(self).await
	}
}

fn is_running_and_ready(pod: &Pod) -> bool {
	let Some(status) = &pod.status else {
		return false;
	};
	if status.phase.as_deref() != Some("Running") {
		return false;
	}
	match &status.conditions {
		Some(conditions) => conditions.iter().all(|c| c.status == "True"),
		None => false,
	}
}

fn pod_info_from(pod: &Pod, name: String) -> Option<PodInfo> {
	let status = pod.status.as_ref()?;
	let address = status.pod_ip.clone()?;
	let node = pod.spec.as_ref()?.node_name.clone()?;
	Some(PodInfo::new(name, address, node))
}
