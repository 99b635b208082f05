//! Tracing subscriber setup. Call once from `main` before any task starts.

use tracing_subscriber::EnvFilter;

pub fn init() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(true)
		.init();
}
