pub mod cluster_state;
pub mod cluster_state_source;
