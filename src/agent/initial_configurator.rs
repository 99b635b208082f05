//! The Initial Configurator (spec §4.5): the one-shot sequence that runs on
//! each (re)connection to the router, building a fresh [`RouterState`] and
//! pushing every known affinity/connection before the long-running tasks
//! start.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use arouter_model::{group_rw_pods, PodInfo, RoPods, RouterState};
use arouter_rpc::{DeviceProbe, PodSource, RouterProgrammer};
use arouter_util::config::Config;
use arouter_util::error::{Error, Result};

/// Poll interval while waiting for the expected pod counts to appear.
const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Runs the full initial-configuration sequence and returns the
/// freshly-built, coordinate-assigned state. Cancelling `token` unblocks the
/// indefinite wait in step 1 and returns [`Error::RouterChannelDown`].
pub async fn run<L, P, R>(
	config: &Config,
	pod_lister: &L,
	prober: &P,
	router: &R,
	token: &CancellationToken,
) -> Result<Arc<RouterState>>
where
	L: PodSource,
	P: DeviceProbe,
	R: RouterProgrammer,
{
	let (mut rw_pods, ro_pods) = wait_for_expected_pod_counts(config, pod_lister, token).await?;

	info!(
		rw_pods = rw_pods.len(),
		ro_pods = ro_pods.len(),
		"observed expected pod counts, probing device ids"
	);
	for pod in rw_pods.iter_mut() {
		pod.device_ids = prober.list(pod).await;
	}

	let groups = group_rw_pods(rw_pods)?;
	let state = Arc::new(RouterState::new(
		groups,
		RoPods::from(ro_pods),
		config.router.rw_cluster_name.clone(),
		config.router.ro_cluster_name.clone(),
	));

	crate::router_program::program_full_state(&state, router, config.orchestrator.pod_grpc_port).await;

	Ok(state)
}

/// Step 1: poll every 5s until exactly `numRWPods`/`numROPods` are
/// observed, waiting indefinitely subject to cancellation.
async fn wait_for_expected_pod_counts<L: PodSource>(
	config: &Config,
	pod_lister: &L,
	token: &CancellationToken,
) -> Result<(Vec<PodInfo>, Vec<PodInfo>)> {
	let expected_rw = config.num_rw_pods as usize;
	let expected_ro = config.num_ro_pods as usize;

	loop {
		if token.is_cancelled() {
			return Err(Error::RouterChannelDown);
		}

		match pod_lister.list().await {
			Ok((rw, ro)) if rw.len() == expected_rw && ro.len() == expected_ro => {
				return Ok((rw, ro));
			}
			Ok((rw, ro)) => {
				debug!(
					observed_rw = rw.len(),
					expected_rw,
					observed_ro = ro.len(),
					expected_ro,
					"pod counts not yet as expected, waiting"
				);
			}
			Err(e) => {
				warn!(error = %e, "pod listing failed during initial wait, retrying");
			}
		}

		tokio::select! {
			_ = sleep(WAIT_POLL_INTERVAL) => {},
			_ = token.cancelled() => return Err(Error::RouterChannelDown),
		}
	}
}
