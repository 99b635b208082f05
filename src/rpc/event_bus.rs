//! The Discovery Monitor's event-bus subscriber (§4.6): a Kafka consumer
//! that decodes each message as an [`arouter_proto::events::Envelope`] and
//! hands back the ones this agent understands. Malformed payloads are
//! logged and skipped rather than treated as a fatal stream error — a bad
//! message from a misbehaving producer must not take the consumer down.

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use tracing::warn;

use arouter_proto::events::{Envelope, EventBody};
use arouter_util::error::{Error, Result};

pub struct EventBus {
	consumer: StreamConsumer,
}

impl EventBus {
	pub fn connect(bootstrap_servers: &str, topic: &str, group_id: &str) -> Result<Self> {
		let consumer: StreamConsumer = ClientConfig::new()
			.set("bootstrap.servers", bootstrap_servers)
			.set("group.id", group_id)
			.set("enable.auto.commit", "true")
			.set("auto.offset.reset", "latest")
			.create()
			.map_err(|e| Error::RouterCallFailed(format!("kafka consumer create failed: {e}")))?;

		consumer
			.subscribe(&[topic])
			.map_err(|e| Error::RouterCallFailed(format!("kafka subscribe failed: {e}")))?;

		Ok(EventBus { consumer })
	}

	/// Blocks until the next event this agent recognizes arrives, skipping
	/// anything that fails to parse or carries an unrecognized `kind`.
	pub async fn next_device_discovered(&self) -> Result<(String, Option<String>)> {
		loop {
			let msg = self
				.consumer
				.recv()
				.await
				.map_err(|e| Error::RouterCallFailed(format!("kafka recv failed: {e}")))?;

			let Some(payload) = msg.payload() else {
				continue;
			};

			let envelope: Envelope = match serde_json::from_slice(payload) {
				Ok(env) => env,
				Err(e) => {
					warn!(error = %e, "dropping unparseable event-bus message");
					continue;
				}
			};

			if let EventBody::DeviceDiscovered { device_id, pod_name } = envelope.body {
				return Ok((device_id, pod_name));
			}
		}
	}
}
