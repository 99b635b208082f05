//! External collaborators of the affinity router agent: the orchestrator
//! (pod lister), the per-pod device RPC (prober), the router control
//! channel (programmer), and the event bus (discovery monitor source).

pub mod device_prober;
pub mod event_bus;
pub mod pod_lister;
pub mod router_client;
pub mod traits;

pub use device_prober::DeviceProber;
pub use event_bus::EventBus;
pub use pod_lister::PodLister;
pub use router_client::RouterClient;
pub use traits::{DeviceProbe, PodSource, RouterProgrammer};
