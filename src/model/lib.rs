#[macro_use]
extern crate tracing;

pub mod group;
pub mod grouper;
pub mod pod;
pub mod state;

pub use group::{CoreGroup, RoPods};
pub use grouper::group_rw_pods;
pub use pod::PodInfo;
pub use state::RouterState;
