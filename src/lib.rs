pub mod api;
pub mod app_state;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod routes;
pub mod scheduler;
pub mod wiring;

#[cfg(test)]
mod test_support;
