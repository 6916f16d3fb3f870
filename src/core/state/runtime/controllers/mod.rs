pub mod controller_status_manager;
pub mod controller_status_repository;
pub mod controller_status_repository_trait;
pub mod controller_status_state;
