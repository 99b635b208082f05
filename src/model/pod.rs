use std::collections::BTreeSet;

/// One RW or RO pod, as observed by the Pod Lister and enriched by the
/// Device-ID Prober. `cluster`/`backend`/`connection` are only populated
/// once the Initial Configurator has assigned router coordinates to the
/// slot this pod occupies; they are carried forward by copying into the
/// surviving slot across reconciliations rather than being recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodInfo {
	pub name: String,
	pub address: String,
	pub node: String,
	pub device_ids: BTreeSet<String>,
	pub cluster: Option<String>,
	pub backend: Option<String>,
	pub connection: Option<String>,
}

impl PodInfo {
	/// A freshly-listed pod, with no router coordinates assigned yet and no
	/// device ids probed yet.
	pub fn new(name: impl Into<String>, address: impl Into<String>, node: impl Into<String>) -> Self {
		PodInfo {
			name: name.into(),
			address: address.into(),
			node: node.into(),
			device_ids: BTreeSet::new(),
			cluster: None,
			backend: None,
			connection: None,
		}
	}

	pub fn with_devices<I, S>(mut self, devices: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.device_ids = devices.into_iter().map(Into::into).collect();
		self
	}

	/// True if this pod's device set intersects `other`'s.
	pub fn shares_device_with(&self, other: &PodInfo) -> bool {
		!self.device_ids.is_disjoint(&other.device_ids)
	}
}
