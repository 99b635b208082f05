fn main() -> Result<(), Box<dyn std::error::Error>> {
	tonic_build::configure().build_server(false).compile(
		&["proto/affinity_router.proto", "proto/core_adapter.proto"],
		&["proto"],
	)?;
	Ok(())
}
