pub mod container_ext;
pub mod workload_spec;

pub use container_ext::ContainerExt;
pub use workload_spec::{WorkloadKind, WorkloadSpec};
