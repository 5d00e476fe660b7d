//! Generated protobuf types for the container runtime APIs.

#![allow(clippy::enum_variant_names)]

/// Kubernetes CRI runtime service (containerd, CRI-O)
pub mod cri {
    tonic::include_proto!("runtime.v1");
}

/// containerd tasks service
pub mod tasks {
    tonic::include_proto!("containerd.services.tasks.v1");
}
