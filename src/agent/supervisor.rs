//! The outer supervisor loop: owns the per-router-connection state machine
//! from spec §4.7 (`CONNECTING → CONFIGURING → STEADY → DISCONNECTED →
//! CONNECTING`). Each iteration builds a fresh [`RouterClient`] and
//! [`CancellationToken`], runs the Initial Configurator to completion, then
//! spawns the Discovery Monitor and Reconciler as concurrent tasks scoped to
//! that token. A watchdog polls [`RouterClient::is_down`] and also issues its
//! own periodic keep-alive round-trip against the router (spec §7), since in
//! a quiescent steady state nothing else calls the router and a dropped
//! channel would otherwise go unnoticed. It cancels the token once the
//! router's control RPCs have failed consecutively enough to call the
//! channel down, and the loop reconnects with entirely fresh state — nothing
//! survives the transition, per the non-goal on restart persistence.

use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use arouter_model::RouterState;
use arouter_rpc::{DeviceProber, EventBus, PodLister, RouterClient};
use arouter_util::config::Config;
use arouter_util::error::Result;

use crate::{discovery_monitor, initial_configurator, reconciler, router_program};

/// How often the watchdog polls [`RouterClient::is_down`].
const WATCHDOG_POLL: Duration = Duration::from_secs(1);

/// How often the watchdog re-asserts the router's full state as a keep-alive
/// — the agent's only heartbeat signal against a router it would otherwise
/// never call during a quiescent steady state (spec §7).
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Delay before retrying a connection after initial configuration or
/// event-bus setup fails outright.
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub async fn run(config: Config) -> Result<()> {
	let pod_lister = PodLister::connect(
		&config.orchestrator.api_server,
		&config.orchestrator.kube_config_path,
		config.orchestrator.namespace.clone(),
	)
	.await?;
	let prober = DeviceProber::new(config.orchestrator.pod_grpc_port);

	loop {
		if let Err(e) = run_one_connection(&config, &pod_lister, &prober).await {
			warn!(error = %e, "router connection cycle ended, retrying");
			tokio::time::sleep(RETRY_DELAY).await;
		}
	}
}

/// Runs exactly one pass through `CONNECTING → CONFIGURING → STEADY →
/// DISCONNECTED`. Returns once the connection has been torn down, whether
/// cleanly (watchdog fired) or due to a setup failure.
async fn run_one_connection(config: &Config, pod_lister: &PodLister, prober: &DeviceProber) -> Result<()> {
	let router = RouterClient::connect_lazy(&config.router.api_address, config.router.router_name.clone())?;
	let token = CancellationToken::new();

	info!(router_address = %config.router.api_address, "connecting to affinity router");
	let state = initial_configurator::run(config, pod_lister, prober, &router, &token).await?;
	info!("initial configuration complete, entering steady state");

	let event_bus = EventBus::connect(
		&config.kafka.bootstrap_servers(),
		&config.kafka.topic,
		&config.kafka.instance_id,
	)?;

	let discovery_task = tokio::spawn(discovery_monitor::run(
		state.clone(),
		event_bus,
		router.clone(),
		token.clone(),
	));
	let reconciler_task = tokio::spawn(reconciler::run(
		config.clone(),
		pod_lister.clone(),
		prober.clone(),
		router.clone(),
		state.clone(),
		token.clone(),
	));

	watch_for_channel_failure(&router, &state, config.orchestrator.pod_grpc_port, &token).await;

	token.cancel();
	let _ = discovery_task.await;
	let _ = reconciler_task.await;

	Ok(())
}

/// Polls [`RouterClient::is_down`] until it trips or the token is cancelled
/// by some other path (there is none today, but this keeps the watchdog a
/// well-behaved cooperative task rather than a bare sleep loop). On its own,
/// slower cadence it also re-asserts the router's full state as a keep-alive,
/// so a channel drop during an otherwise quiescent steady state still
/// produces the RPC failures `is_down` needs to trip on (spec §7).
async fn watch_for_channel_failure(router: &RouterClient, state: &RouterState, grpc_port: u16, token: &CancellationToken) {
	let mut heartbeat_ticker = interval(HEARTBEAT_INTERVAL);
	heartbeat_ticker.tick().await; // first tick fires immediately; align to the interval instead

	loop {
		if router.is_down() {
			arouter_rpc::router_client::log_channel_down(router.router_name());
			return;
		}

		tokio::select! {
			_ = tokio::time::sleep(WATCHDOG_POLL) => {},
			_ = heartbeat_ticker.tick() => {
				router_program::program_full_state(state, router, grpc_port).await;
			}
			_ = token.cancelled() => return,
		}
	}
}
