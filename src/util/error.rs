//! Error kinds shared across the agent, mirroring the error-handling design
//! in the specification: each variant names a recoverable failure mode the
//! caller is expected to log and retry, except [`Error::ConfigurationInvalid`]
//! which is fatal at startup.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// Listing pods from the orchestrator failed outright.
	#[error("orchestrator unavailable: {0}")]
	OrchestratorUnavailable(String),

	/// A per-pod RPC (list or reconcile device ids) failed.
	#[error("pod {pod} unreachable: {source}")]
	PodUnreachable {
		pod: String,
		#[source]
		source: anyhow::Error,
	},

	/// `SetConnection`/`SetAffinity` against the router failed.
	#[error("router call failed: {0}")]
	RouterCallFailed(String),

	/// The grouper could not satisfy anti-affinity with the remaining pool.
	#[error("insufficient node diversity to complete grouping")]
	InsufficientNodeDiversity,

	/// The router's control channel dropped; the caller must tear down and
	/// reconnect.
	#[error("router channel is down")]
	RouterChannelDown,

	/// A recognized environment variable held an out-of-range value.
	#[error("invalid configuration: {0}")]
	ConfigurationInvalid(String),
}
