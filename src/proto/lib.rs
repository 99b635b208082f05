//! Generated gRPC clients for the two RPC surfaces named in the
//! specification's external-interfaces section, plus the event-bus payload
//! types consumed by the Discovery Monitor.

pub mod affinity_router {
	tonic::include_proto!("arouter.affinity_router.v1");
}

pub mod core_adapter {
	tonic::include_proto!("arouter.core_adapter.v1");
}

pub mod events;
