//! Process environment configuration. Keys and defaults match the
//! specification's configuration table exactly; validation happens once at
//! startup so that an out-of-range value fails fast rather than surfacing as
//! a confusing runtime error three layers down.

use envconfig::Envconfig;

use crate::error::{Error, Result};

#[derive(Envconfig, Debug, Clone)]
pub struct OrchestratorConfig {
	#[envconfig(from = "K8S_API_SERVER", default = "")]
	pub api_server: String,

	#[envconfig(from = "K8S_KUBE_CONFIG_PATH", default = "")]
	pub kube_config_path: String,

	#[envconfig(from = "POD_NAMESPACE", default = "voltha")]
	pub namespace: String,

	#[envconfig(from = "POD_GRPC_PORT", default = "50057")]
	pub pod_grpc_port: u16,
}

#[derive(Envconfig, Debug, Clone)]
pub struct RouterConfig {
	#[envconfig(from = "AFROUTER_API_ADDRESS", default = "localhost:55554")]
	pub api_address: String,

	#[envconfig(from = "AFROUTER_ROUTER_NAME", default = "vcore")]
	pub router_name: String,

	#[envconfig(from = "AFROUTER_RW_CLUSTER_NAME", default = "vcore")]
	pub rw_cluster_name: String,

	#[envconfig(from = "AFROUTER_RO_CLUSTER_NAME", default = "ro_vcore")]
	pub ro_cluster_name: String,
}

#[derive(Envconfig, Debug, Clone)]
pub struct KafkaConfig {
	#[envconfig(from = "KAFKA_TOPIC", default = "AffinityRouter")]
	pub topic: String,

	#[envconfig(from = "KAFKA_HOST", default = "kafka")]
	pub host: String,

	#[envconfig(from = "KAFKA_PORT", default = "9092")]
	pub port: u16,

	#[envconfig(from = "KAFKA_INSTANCE_ID", default = "arouterd")]
	pub instance_id: String,
}

impl KafkaConfig {
	pub fn bootstrap_servers(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}
}

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
	#[envconfig(from = "NUM_RW_PODS", default = "6")]
	pub num_rw_pods: u32,

	#[envconfig(from = "NUM_RO_PODS", default = "3")]
	pub num_ro_pods: u32,

	#[envconfig(nested = true)]
	pub orchestrator: OrchestratorConfig,

	#[envconfig(nested = true)]
	pub router: RouterConfig,

	#[envconfig(nested = true)]
	pub kafka: KafkaConfig,
}

impl Config {
	/// Loads configuration from the process environment and validates it.
	/// A recognized key holding an out-of-range value is
	/// [`Error::ConfigurationInvalid`]; the caller is expected to panic on
	/// this at startup, per the specification's fail-fast policy.
	pub fn load() -> Result<Self> {
		let cfg = Self::init_from_env()
			.map_err(|e| Error::ConfigurationInvalid(e.to_string()))?;
		cfg.validate()?;
		Ok(cfg)
	}

	fn validate(&self) -> Result<()> {
		if self.num_rw_pods == 0 {
			return Err(Error::ConfigurationInvalid(
				"NUM_RW_PODS must be at least 1".into(),
			));
		}
		if self.num_rw_pods % 2 != 0 {
			return Err(Error::ConfigurationInvalid(
				"NUM_RW_PODS must be even".into(),
			));
		}
		if self.num_ro_pods == 0 {
			return Err(Error::ConfigurationInvalid(
				"NUM_RO_PODS must be at least 1".into(),
			));
		}
		if self.orchestrator.pod_grpc_port == 0 {
			return Err(Error::ConfigurationInvalid(
				"POD_GRPC_PORT must be in 1..65535".into(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serial_test::serial;

	fn clear_env() {
		for key in [
			"NUM_RW_PODS",
			"NUM_RO_PODS",
			"POD_GRPC_PORT",
			"K8S_API_SERVER",
			"K8S_KUBE_CONFIG_PATH",
			"POD_NAMESPACE",
			"AFROUTER_API_ADDRESS",
			"AFROUTER_ROUTER_NAME",
			"AFROUTER_RW_CLUSTER_NAME",
			"AFROUTER_RO_CLUSTER_NAME",
			"KAFKA_TOPIC",
			"KAFKA_HOST",
			"KAFKA_PORT",
			"KAFKA_INSTANCE_ID",
		] {
			std::env::remove_var(key);
		}
	}

	#[test]
	#[serial]
	fn defaults_match_specification() {
		clear_env();
		let cfg = Config::load().expect("defaults must validate");
		assert_eq!(cfg.num_rw_pods, 6);
		assert_eq!(cfg.num_ro_pods, 3);
		assert_eq!(cfg.orchestrator.namespace, "voltha");
		assert_eq!(cfg.orchestrator.pod_grpc_port, 50057);
		assert_eq!(cfg.router.api_address, "localhost:55554");
		assert_eq!(cfg.router.router_name, "vcore");
		assert_eq!(cfg.router.rw_cluster_name, "vcore");
		assert_eq!(cfg.router.ro_cluster_name, "ro_vcore");
		assert_eq!(cfg.kafka.topic, "AffinityRouter");
		assert_eq!(cfg.kafka.bootstrap_servers(), "kafka:9092");
		assert_eq!(cfg.kafka.instance_id, "arouterd");
	}

	#[test]
	#[serial]
	fn odd_rw_pod_count_is_rejected() {
		clear_env();
		std::env::set_var("NUM_RW_PODS", "7");
		let err = Config::load().unwrap_err();
		assert!(matches!(err, Error::ConfigurationInvalid(_)));
		std::env::remove_var("NUM_RW_PODS");
	}

	#[test]
	#[serial]
	fn zero_ro_pod_count_is_rejected() {
		clear_env();
		std::env::set_var("NUM_RO_PODS", "0");
		let err = Config::load().unwrap_err();
		assert!(matches!(err, Error::ConfigurationInvalid(_)));
		std::env::remove_var("NUM_RO_PODS");
	}
}
