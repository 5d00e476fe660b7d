fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile proto files for the runtime services freezer-daemon talks to:
    // - cri.proto: Kubernetes CRI RuntimeService (pod sandbox and container listing)
    // - tasks.proto: containerd Tasks service (pause/resume)
    // Servers are generated too; the integration tests run fakes of both.
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/cri.proto", "proto/tasks.proto"], &["proto"])?;
    Ok(())
}
