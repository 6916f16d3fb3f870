pub mod gate;
pub mod hooks;
pub mod mirror;
pub mod observer;
pub mod storage_class;
pub mod topology;
pub mod workload;
