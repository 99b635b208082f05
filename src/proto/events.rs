//! Event-bus envelope and payload types.
//!
//! The specification leaves the exact device-to-pod binding schema
//! unspecified (§9, "opaque event payloads"). We resolve it concretely: the
//! envelope is tagged JSON, `DeviceDiscovered` carries the device id and an
//! optional `pod_name` when the producer knows which pod owns the device.
//! Any other `kind` deserializes to [`EventBody::Unknown`] instead of
//! failing, so a forward-compatible producer never breaks this consumer.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
	#[serde(flatten)]
	pub body: EventBody,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventBody {
	DeviceDiscovered {
		device_id: String,
		#[serde(default)]
		pod_name: Option<String>,
	},
	#[serde(other)]
	Unknown,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_device_discovered_without_pod_name() {
		let raw = r#"{"kind": "device_discovered", "device_id": "d99"}"#;
		let env: Envelope = serde_json::from_str(raw).unwrap();
		match env.body {
			EventBody::DeviceDiscovered { device_id, pod_name } => {
				assert_eq!(device_id, "d99");
				assert_eq!(pod_name, None);
			}
			EventBody::Unknown => panic!("expected DeviceDiscovered"),
		}
	}

	#[test]
	fn parses_device_discovered_with_pod_name() {
		let raw = r#"{"kind": "device_discovered", "device_id": "d1", "pod_name": "rw-core1-abc"}"#;
		let env: Envelope = serde_json::from_str(raw).unwrap();
		match env.body {
			EventBody::DeviceDiscovered { device_id, pod_name } => {
				assert_eq!(device_id, "d1");
				assert_eq!(pod_name.as_deref(), Some("rw-core1-abc"));
			}
			EventBody::Unknown => panic!("expected DeviceDiscovered"),
		}
	}

	#[test]
	fn unrecognized_kind_is_dropped_not_errored() {
		let raw = r#"{"kind": "something_else", "extra": 1}"#;
		let env: Envelope = serde_json::from_str(raw).unwrap();
		assert!(matches!(env.body, EventBody::Unknown));
	}

	#[test]
	fn malformed_payload_is_a_parse_error() {
		let raw = r#"{ not json "#;
		let res: Result<Envelope, _> = serde_json::from_str(raw);
		assert!(res.is_err());
	}
}
