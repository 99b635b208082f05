//! In-memory fakes of the external collaborators, used to exercise the
//! reconciliation logic without a live cluster, router, or pod fleet
//! (spec §9 test-tooling guidance). Test-only.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use arouter_model::PodInfo;
use arouter_rpc::{DeviceProbe, PodSource, RouterProgrammer};
use arouter_util::error::{Error, Result};

/// Replays a fixed sequence of `(rw, ro)` poll results, holding on the last
/// entry once exhausted — mirrors how a real orchestrator keeps answering
/// `list` calls with its current state.
pub struct FakePodSource {
	polls: Mutex<VecDeque<(Vec<PodInfo>, Vec<PodInfo>)>>,
	last: Mutex<(Vec<PodInfo>, Vec<PodInfo>)>,
}

impl FakePodSource {
	pub fn new(rw: Vec<PodInfo>, ro: Vec<PodInfo>) -> Self {
		FakePodSource {
			polls: Mutex::new(VecDeque::new()),
			last: Mutex::new((rw, ro)),
		}
	}

	pub fn sequenced(polls: Vec<(Vec<PodInfo>, Vec<PodInfo>)>) -> Self {
		let mut polls: VecDeque<_> = polls.into();
		let first = polls.pop_front().unwrap_or_default();
		FakePodSource {
			polls: Mutex::new(polls),
			last: Mutex::new(first),
		}
	}
}

#[async_trait]
impl PodSource for FakePodSource {
	async fn list(&self) -> Result<(Vec<PodInfo>, Vec<PodInfo>)> {
		let mut polls = self.polls.lock().unwrap();
		let mut last = self.last.lock().unwrap();
		if let Some(next) = polls.pop_front() {
			*last = next.clone();
			Ok(next)
		} else {
			Ok(last.clone())
		}
	}
}

/// Always returns an error, for exercising `OrchestratorUnavailable`-style
/// failure handling.
pub struct FailingPodSource;

#[async_trait]
impl PodSource for FailingPodSource {
	async fn list(&self) -> Result<(Vec<PodInfo>, Vec<PodInfo>)> {
		Err(Error::OrchestratorUnavailable("fake orchestrator failure".into()))
	}
}

/// Answers device-id probes from a per-pod-name table; `reconcile` calls are
/// recorded for assertions and always report success unless configured not
/// to.
#[derive(Default)]
pub struct FakeDeviceProbe {
	device_ids: Mutex<std::collections::HashMap<String, BTreeSet<String>>>,
	reconciled: Mutex<Vec<(String, BTreeSet<String>)>>,
}

impl FakeDeviceProbe {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_ids(self, pod_name: impl Into<String>, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.device_ids
			.lock()
			.unwrap()
			.insert(pod_name.into(), ids.into_iter().map(Into::into).collect());
		self
	}

	pub fn reconciled_calls(&self) -> Vec<(String, BTreeSet<String>)> {
		self.reconciled.lock().unwrap().clone()
	}
}

#[async_trait]
impl DeviceProbe for FakeDeviceProbe {
	async fn list(&self, pod: &PodInfo) -> BTreeSet<String> {
		self.device_ids.lock().unwrap().get(&pod.name).cloned().unwrap_or_default()
	}

	async fn reconcile(&self, pod: &PodInfo, ids: BTreeSet<String>) -> bool {
		self.reconciled.lock().unwrap().push((pod.name.clone(), ids));
		true
	}
}

/// Records every `setConnection`/`setAffinity` call; `is_down` is settable
/// for watchdog-path tests.
#[derive(Default)]
pub struct FakeRouter {
	connections: Mutex<Vec<(String, String, String, String)>>,
	affinities: Mutex<Vec<(String, String, String)>>,
	down: std::sync::atomic::AtomicBool,
}

impl FakeRouter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn connections(&self) -> Vec<(String, String, String, String)> {
		self.connections.lock().unwrap().clone()
	}

	pub fn affinities(&self) -> Vec<(String, String, String)> {
		self.affinities.lock().unwrap().clone()
	}
}

#[async_trait]
impl RouterProgrammer for FakeRouter {
	async fn set_connection(&self, cluster: &str, backend: &str, connection: &str, addr: &str, _port: u16) {
		self.connections.lock().unwrap().push((
			cluster.to_string(),
			backend.to_string(),
			connection.to_string(),
			addr.to_string(),
		));
	}

	async fn set_affinity(&self, cluster: &str, backend: &str, device_id: &str) {
		self.affinities
			.lock()
			.unwrap()
			.push((cluster.to_string(), backend.to_string(), device_id.to_string()));
	}

	fn is_down(&self) -> bool {
		self.down.load(std::sync::atomic::Ordering::Relaxed)
	}
}
