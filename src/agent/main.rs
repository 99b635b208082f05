//! `arouterd`: the Affinity Router control-plane agent. Discovers RW/RO core
//! pods, pairs RW pods into active-active groups, and continuously
//! reconciles the Affinity Router's backend/connection and affinity tables
//! against observed pod state. See spec §1–§9 for the full design.

#[macro_use]
extern crate tracing;

use clap::Parser;

mod discovery_monitor;
mod initial_configurator;
mod reconciler;
mod router_program;
mod supervisor;

#[cfg(test)]
mod test_support;

#[derive(Parser, Debug)]
#[command(name = "arouterd", version, about = "Affinity Router control-plane agent")]
struct Cli {}

#[tokio::main]
async fn main() {
	// `--version` is handled internally by clap's built-in flag (exit 0);
	// any other unparseable argument exits 1 per the specification's CLI
	// section, not clap's own default usage-error code of 2.
	let _cli = Cli::try_parse().unwrap_or_else(|e| {
		e.print().ok();
		std::process::exit(if e.exit_code() == 0 { 0 } else { 1 });
	});

	arouter_util::logging::init();

	let config = match arouter_util::Config::load() {
		Ok(config) => config,
		Err(e) => panic!("invalid configuration: {e}"),
	};

	info!(
		num_rw_pods = config.num_rw_pods,
		num_ro_pods = config.num_ro_pods,
		namespace = %config.orchestrator.namespace,
		router_address = %config.router.api_address,
		"starting arouterd"
	);

	if let Err(e) = supervisor::run(config).await {
		error!(error = %e, "fatal error during startup, exiting");
		std::process::exit(1);
	}
}
